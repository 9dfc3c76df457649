//! Credential administration commands.

use anyhow::{bail, Context as _, Result};
use std::time::Duration;
use tracing::info;
use trading_broker::BrokerSettings;
use trading_core::error::CredentialError;
use trading_core::types::{Credential, ServiceKind};

use crate::cli::context::Context;
use crate::cli::{CredentialRef, CredentialsCommand, SetArgs};

pub async fn run(command: CredentialsCommand, ctx: &Context) -> Result<()> {
    match command {
        CredentialsCommand::Set(args) => set(args, ctx).await,
        CredentialsCommand::List { service } => list(service, ctx).await,
        CredentialsCommand::Show(target) => show(target, ctx).await,
        CredentialsCommand::Test(target) => test(target, ctx).await,
        CredentialsCommand::Delete(target) => delete(target, ctx).await,
        CredentialsCommand::SetSession { target, session } => set_session(target, session, ctx).await,
        CredentialsCommand::Logout(target) => logout(target, ctx).await,
    }
}

async fn set(args: SetArgs, ctx: &Context) -> Result<()> {
    let service = args.target.service;
    let name = args.target.name.clone();
    let existing = match ctx.store.get(service, &name).await {
        // Keep the current session when only the secrets change.
        Ok(existing) => existing,
        Err(CredentialError::NotFound { .. }) => Credential::new(service, &name),
        Err(e) => return Err(e.into()),
    };

    ctx.store.upsert(merge(existing, args)).await?;
    println!("Saved {} credential '{}'", service, name);
    Ok(())
}

/// Apply `set` arguments to a stored credential. The API key is replaced;
/// every other field keeps its stored value unless given.
fn merge(mut credential: Credential, args: SetArgs) -> Credential {
    credential.api_key = args.api_key;
    credential.api_secret = args.api_secret.unwrap_or(credential.api_secret);
    credential.username = args.username.or(credential.username);
    credential.password = args.password.or(credential.password);
    credential.secondary_pin = args.pin.or(credential.secondary_pin);
    credential.updated_at = chrono::Utc::now();
    credential
}

async fn list(service: Option<ServiceKind>, ctx: &Context) -> Result<()> {
    let credentials = ctx.store.list(service).await?;
    if credentials.is_empty() {
        println!("No credentials stored.");
        return Ok(());
    }

    println!("{:<14} {:<12} {:<20} {:<8} Updated", "Service", "Name", "API key", "Session");
    println!("{}", "─".repeat(78));
    let now = chrono::Utc::now();
    for c in credentials {
        let session = if c.active_session(now).is_some() { "active" } else { "-" };
        println!(
            "{:<14} {:<12} {:<20} {:<8} {}",
            c.service.as_str(),
            c.name,
            c.masked_api_key(),
            session,
            c.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn show(target: CredentialRef, ctx: &Context) -> Result<()> {
    let credential = ctx.store.get(target.service, &target.name).await?;
    // Debug output is redacted.
    println!("{:#?}", credential);
    Ok(())
}

async fn test(target: CredentialRef, ctx: &Context) -> Result<()> {
    match target.service {
        ServiceKind::DataProvider => check_data_provider(&target.name, ctx).await,
        service => {
            let mut settings: BrokerSettings = ctx.config.brokers.clone();
            settings.breeze.credential = target.name.clone();
            settings.neo.credential = target.name.clone();

            let broker = ctx
                .factory_with(settings)
                .get_broker(service.as_str())
                .context("cannot create broker")?;
            broker
                .authenticate()
                .await
                .with_context(|| format!("{} login failed", service))?;
            let margin = broker
                .fetch_margin()
                .await
                .with_context(|| format!("{} margin fetch failed", service))?;

            println!("{} credential '{}' works", service, target.name);
            println!("  Available margin: ₹{}", margin.available_margin.round_dp(2));
            println!("  Used margin:      ₹{}", margin.used_margin.round_dp(2));
            Ok(())
        }
    }
}

async fn check_data_provider(name: &str, ctx: &Context) -> Result<()> {
    let provider = &ctx.config.data_provider;
    let credential = ctx.store.get(ServiceKind::DataProvider, name).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let resp = client
        .get(&provider.base_url)
        .header(provider.key_header.as_str(), credential.api_key.as_str())
        .send()
        .await
        .with_context(|| format!("{} unreachable", provider.base_url))?;

    let status = resp.status();
    info!(url = %provider.base_url, %status, "Data provider reachable check");
    if !status.is_success() {
        bail!("data provider answered {}", status);
    }
    println!("data_provider credential '{}' works ({})", name, status);
    Ok(())
}

async fn delete(target: CredentialRef, ctx: &Context) -> Result<()> {
    if ctx.store.delete(target.service, &target.name).await? {
        println!("Deleted {} credential '{}'", target.service, target.name);
    } else {
        println!("No {} credential named '{}'", target.service, target.name);
    }
    Ok(())
}

async fn set_session(target: CredentialRef, session: String, ctx: &Context) -> Result<()> {
    let session = session.trim().to_string();
    if session.is_empty() {
        bail!("session key must not be empty");
    }
    let mut credential = ctx.store.get(target.service, &target.name).await?;
    credential.clear_session();
    credential.session_id = Some(session);
    ctx.store.upsert(credential).await?;

    println!(
        "Stored session key for {} credential '{}'; it is exchanged on the next login",
        target.service, target.name
    );
    Ok(())
}

async fn logout(target: CredentialRef, ctx: &Context) -> Result<()> {
    match target.service {
        ServiceKind::DataProvider => {
            ctx.store.clear_session(target.service, &target.name).await?;
        }
        service => {
            let mut settings: BrokerSettings = ctx.config.brokers.clone();
            settings.breeze.credential = target.name.clone();
            settings.neo.credential = target.name.clone();
            let broker = ctx.factory_with(settings).get_broker(service.as_str())?;
            broker.deauthenticate().await?;
        }
    }
    println!("Logged out {} credential '{}'", target.service, target.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn set_args(argv: &[&str]) -> SetArgs {
        let cli = Cli::try_parse_from(["tradedesk", "credentials", "set"].iter().chain(argv)).unwrap();
        match cli.command {
            Commands::Credentials(CredentialsCommand::Set(args)) => args,
            _ => panic!("expected credentials set"),
        }
    }

    fn stored() -> Credential {
        let mut credential =
            Credential::new(ServiceKind::Neo, "primary").with_api_key("old-key", "old-secret");
        credential.password = Some("hunter2".into());
        credential.session_token = Some("day-token".into());
        credential
    }

    #[test]
    fn test_key_rotation_keeps_secret() {
        let args = set_args(&["neo", "--api-key", "new-key"]);
        assert!(args.api_secret.is_none());

        let merged = merge(stored(), args);
        assert_eq!(merged.api_key, "new-key");
        assert_eq!(merged.api_secret, "old-secret");
        assert_eq!(merged.password.as_deref(), Some("hunter2"));
        assert_eq!(merged.session_token.as_deref(), Some("day-token"));
    }

    #[test]
    fn test_given_fields_replace_stored_ones() {
        let args = set_args(&[
            "neo",
            "--api-key",
            "new-key",
            "--api-secret",
            "new-secret",
            "--username",
            "9876543210",
        ]);
        let merged = merge(stored(), args);
        assert_eq!(merged.api_secret, "new-secret");
        assert_eq!(merged.username.as_deref(), Some("9876543210"));
        assert_eq!(merged.password.as_deref(), Some("hunter2"));
    }
}
