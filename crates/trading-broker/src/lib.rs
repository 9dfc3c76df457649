//! Broker integrations.
//!
//! Each vendor binds the [`Broker`](trading_core::traits::Broker) capability
//! set to its own protocol. Callers obtain clients through
//! [`BrokerFactory`] and never name a vendor type.

mod breeze;
mod factory;
mod http;
mod neo;
mod paper;

pub use breeze::{BreezeBroker, BreezeConfig};
pub use factory::{BrokerFactory, BrokerSettings};
pub use neo::{NeoBroker, NeoConfig};
pub use paper::{PaperBroker, PaperConfig};

use trading_core::error::{BrokerError, CredentialError};
use trading_core::types::{Credential, ServiceKind};
use trading_credentials::CredentialStore;

/// Read the credential a client logs in with. A missing record is an
/// authentication failure for the caller.
pub(crate) async fn load_credential(
    store: &dyn CredentialStore,
    service: ServiceKind,
    name: &str,
) -> Result<Credential, BrokerError> {
    match store.get(service, name).await {
        Ok(credential) => Ok(credential),
        Err(CredentialError::NotFound { .. }) => Err(BrokerError::Authentication(format!(
            "no {} credential named '{}'",
            service, name
        ))),
        Err(e) => Err(e.into()),
    }
}
