//! Registry of named loggers and mediums.

use crate::config::{ManagerConfig, MediumConfig};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::medium::{BroadcastMedium, DirectMedium, Medium};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Process-wide context holding loggers and mediums.
///
/// Construct one explicitly and pass it where it is needed. Loggers are
/// created on first use and live as long as the manager; each distinct name
/// maps to exactly one [`Logger`].
pub struct Manager {
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
    mediums: HashMap<String, Arc<dyn Medium>>,
    /// Mediums a logger is equipped with on creation.
    bindings: HashMap<String, Vec<String>>,
}

impl Manager {
    /// Build every configured medium.
    ///
    /// Fails if a transport cannot bind or a logger binding names a medium
    /// that is not configured.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let mut mediums: HashMap<String, Arc<dyn Medium>> = HashMap::new();
        for (name, medium) in config.mediums {
            let built: Arc<dyn Medium> = match medium {
                MediumConfig::Direct => Arc::new(DirectMedium::new()),
                MediumConfig::Broadcast(broadcast) => Arc::new(BroadcastMedium::bind(&broadcast)?),
            };
            debug!(medium = %name, "medium ready");
            mediums.insert(name, built);
        }
        Self::from_parts(mediums, config.loggers)
    }

    /// Use caller-built mediums, with no logger bindings.
    pub fn with_mediums<I>(mediums: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<dyn Medium>)>,
    {
        Self {
            loggers: RwLock::new(HashMap::new()),
            mediums: mediums.into_iter().collect(),
            bindings: HashMap::new(),
        }
    }

    /// Use caller-built mediums and equip loggers per `bindings`.
    pub fn from_parts(
        mediums: HashMap<String, Arc<dyn Medium>>,
        bindings: HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        for medium in bindings.values().flatten() {
            if !mediums.contains_key(medium) {
                return Err(Error::UnknownMedium(medium.clone()));
            }
        }
        Ok(Self {
            loggers: RwLock::new(HashMap::new()),
            mediums,
            bindings,
        })
    }

    /// The logger called `name`, created on first request.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if let Some(logger) = self.loggers.read().get(name) {
            return Arc::clone(logger);
        }

        let mut loggers = self.loggers.write();
        let logger = loggers.entry(name.to_string()).or_insert_with(|| {
            let logger = Logger::new(name);
            for medium in self.bindings.get(name).into_iter().flatten() {
                if let Some(medium) = self.mediums.get(medium) {
                    logger.equip(Arc::clone(medium));
                }
            }
            debug!(logger = name, "logger created");
            Arc::new(logger)
        });
        Arc::clone(logger)
    }

    pub fn medium(&self, name: &str) -> Option<Arc<dyn Medium>> {
        self.mediums.get(name).cloned()
    }

    pub fn medium_names(&self) -> Vec<String> {
        self.mediums.keys().cloned().collect()
    }

    pub fn logger_names(&self) -> Vec<String> {
        self.loggers.read().keys().cloned().collect()
    }
}
