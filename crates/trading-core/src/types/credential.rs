//! Stored vendor credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The external service a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// ICICI Direct Breeze
    Breeze,
    /// Kotak Securities Neo
    Neo,
    /// Market data provider
    DataProvider,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Breeze => "breeze",
            ServiceKind::Neo => "neo",
            ServiceKind::DataProvider => "data_provider",
        }
    }

    pub fn all() -> [ServiceKind; 3] {
        [ServiceKind::Breeze, ServiceKind::Neo, ServiceKind::DataProvider]
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breeze" | "icici" => Ok(ServiceKind::Breeze),
            "neo" | "kotak" | "kotak_neo" => Ok(ServiceKind::Neo),
            "data_provider" | "data" => Ok(ServiceKind::DataProvider),
            other => Err(format!("unknown service: {}", other)),
        }
    }
}

/// A named credential for one service. `(service, name)` is unique.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub service: ServiceKind,
    /// Label, unique per service
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// MPIN / trading PIN
    #[serde(default)]
    pub secondary_pin: Option<String>,
    /// Vendor session token issued by the last successful login
    #[serde(default)]
    pub session_token: Option<String>,
    /// Vendor session id (Breeze: the daily API session key; Neo: the sid)
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(service: ServiceKind, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
            api_key: String::new(),
            api_secret: String::new(),
            username: None,
            password: None,
            secondary_pin: None,
            session_token: None,
            session_id: None,
            session_expires_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.api_key = key.into();
        self.api_secret = secret.into();
        self
    }

    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.secondary_pin = Some(pin.into());
        self
    }

    /// Session token if present and not past its expiry.
    pub fn active_session(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.session_token.as_deref().filter(|t| !t.is_empty())?;
        match self.session_expires_at {
            Some(expiry) if expiry <= now => None,
            _ => Some(token),
        }
    }

    /// Whether a stored token exists but has expired.
    pub fn session_expired(&self, now: DateTime<Utc>) -> bool {
        self.session_token.is_some() && self.session_expires_at.is_some_and(|e| e <= now)
    }

    pub fn clear_session(&mut self) {
        self.session_token = None;
        self.session_expires_at = None;
        self.updated_at = Utc::now();
    }
}

/// Mask a secret for display, keeping the last four characters.
pub(crate) fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

impl Credential {
    /// API key with everything but the last four characters masked.
    pub fn masked_api_key(&self) -> String {
        mask(&self.api_key)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credential")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("secondary_pin", &redacted(&self.secondary_pin))
            .field("session_token", &redacted(&self.session_token))
            .field("session_id", &redacted(&self.session_id))
            .field("session_expires_at", &self.session_expires_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
