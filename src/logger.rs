//! Named record emitters.

use crate::error::{Error, Result};
use crate::medium::Medium;
use crate::sinks::Sink;
use crate::types::{Level, Record};
use parking_lot::RwLock;
use std::sync::Arc;

/// Delivery callback registered on a logger.
pub type Callback = Arc<dyn Fn(&Record) -> Result<()> + Send + Sync>;

/// A named emitter of records.
///
/// Every record the logger emits is passed to each registered callback, in
/// registration order, on the calling thread. Equipping a medium registers
/// that medium's `publish` as one such callback.
///
/// As a [`Sink`], a logger forwards records it receives from another logger:
/// it puts its own name at the root of the record's source chain and fans the
/// record out to its own callbacks.
pub struct Logger {
    name: String,
    callbacks: RwLock<Vec<Callback>>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a callback. No deduplication.
    pub fn add_subscriber<F>(&self, callback: F)
    where
        F: Fn(&Record) -> Result<()> + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Broadcast every record this logger emits or forwards through `medium`.
    pub fn equip<M>(&self, medium: Arc<M>)
    where
        M: Medium + ?Sized + 'static,
    {
        self.add_subscriber(move |record| medium.publish(record));
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Emit a record at `level`.
    ///
    /// The first callback error stops the fan-out and is returned.
    pub fn log(&self, level: Level, message: impl Into<String>) -> Result<()> {
        if level == Level::Any {
            return Err(Error::InvalidLevel(level));
        }
        self.publish_log(&Record::now(self.name.as_str(), level, message))
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Result<()> {
        self.log(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(Level::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) -> Result<()> {
        self.log(Level::Critical, message)
    }

    /// Invoke every callback with `record`.
    pub fn publish_log(&self, record: &Record) -> Result<()> {
        // Snapshot so a callback may register further callbacks.
        let callbacks: Vec<Callback> = self.callbacks.read().clone();
        for callback in &callbacks {
            callback(record)?;
        }
        Ok(())
    }
}

impl Sink for Logger {
    fn receive(&self, record: &Record) -> Result<()> {
        let mut forwarded = record.clone();
        forwarded.prepend_source(&self.name);
        self.publish_log(&forwarded)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("callbacks", &self.subscriber_count())
            .finish()
    }
}
