//! Broker lookup by name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use trading_core::error::BrokerError;
use trading_core::traits::Broker;
use trading_credentials::CredentialStore;

use crate::{BreezeBroker, BreezeConfig, NeoBroker, NeoConfig, PaperBroker, PaperConfig};

type Constructor = Box<dyn Fn() -> Result<Arc<dyn Broker>, BrokerError> + Send + Sync>;

/// Per-vendor settings used by [`BrokerFactory::with_defaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub breeze: BreezeConfig,
    pub neo: NeoConfig,
    pub paper: PaperConfig,
}

/// Hands out one shared client per broker name.
///
/// The first request for a name constructs the client; later requests get
/// the same instance, so a vendor session is established at most once per
/// process.
pub struct BrokerFactory {
    constructors: HashMap<String, Constructor>,
    aliases: HashMap<String, String>,
    instances: Mutex<HashMap<String, Arc<dyn Broker>>>,
}

impl BrokerFactory {
    /// Empty factory with the vendor aliases installed.
    pub fn new() -> Self {
        let aliases = [("icici", "breeze"), ("kotak", "neo"), ("kotak_neo", "neo")]
            .into_iter()
            .map(|(a, n)| (a.to_string(), n.to_string()))
            .collect();
        Self {
            constructors: HashMap::new(),
            aliases,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Factory with the Breeze, Neo and paper brokers registered.
    pub fn with_defaults(settings: BrokerSettings, store: Arc<dyn CredentialStore>) -> Self {
        let mut factory = Self::new();

        let breeze = settings.breeze;
        let breeze_store = store.clone();
        factory.register("breeze", move || {
            Ok(Arc::new(BreezeBroker::new(breeze.clone(), breeze_store.clone())?) as Arc<dyn Broker>)
        });

        let neo = settings.neo;
        factory.register("neo", move || {
            Ok(Arc::new(NeoBroker::new(neo.clone(), store.clone())?) as Arc<dyn Broker>)
        });

        let paper = settings.paper;
        factory.register("paper", move || {
            Ok(Arc::new(PaperBroker::open(paper.clone())?) as Arc<dyn Broker>)
        });

        factory
    }

    /// Register a constructor under a name. Replaces any earlier registration.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Result<Arc<dyn Broker>, BrokerError> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        debug!(broker = %name, "Registered broker");
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        self.constructors.insert(name, Box::new(constructor));
    }

    /// Registered broker names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Get the shared client for a broker name (case-insensitive; `icici`
    /// and `kotak` are accepted as aliases).
    pub fn get_broker(&self, name: &str) -> Result<Arc<dyn Broker>, BrokerError> {
        let lowered = name.trim().to_lowercase();
        let key = self.resolve(&lowered).to_string();

        let mut instances = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(broker) = instances.get(&key) {
            return Ok(broker.clone());
        }

        let constructor = self
            .constructors
            .get(&key)
            .ok_or_else(|| BrokerError::UnknownBroker(name.to_string()))?;
        let broker = constructor()?;
        info!(broker = %key, "Created broker client");
        instances.insert(key, broker.clone());
        Ok(broker)
    }
}

impl Default for BrokerFactory {
    fn default() -> Self {
        Self::new()
    }
}
