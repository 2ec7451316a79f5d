//! Synchronous in-process medium.

use super::table::{deliver, SubscriptionTable};
use super::Medium;
use crate::error::Result;
use crate::sinks::{Sink, SinkKey};
use crate::types::{Level, Record};
use parking_lot::Mutex;
use std::sync::Arc;

/// Delivers records straight to subscribed sinks on the publishing thread.
///
/// No transport, no serialization and no background thread.
#[derive(Default)]
pub struct DirectMedium {
    table: Mutex<SubscriptionTable>,
}

impl DirectMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.table.lock().topics()
    }

    pub fn subscription_count(&self) -> usize {
        self.table.lock().len()
    }
}

impl Medium for DirectMedium {
    fn subscribe(&self, sink: Arc<dyn Sink>, topic: &str, min_level: Level) -> Result<()> {
        self.table.lock().insert(topic, sink, min_level);
        Ok(())
    }

    fn unsubscribe(&self, sink: &Arc<dyn Sink>, topic: &str) -> Result<()> {
        self.table.lock().remove(topic, SinkKey::of(sink));
        Ok(())
    }

    fn publish(&self, record: &Record) -> Result<()> {
        let subscribers = self.table.lock().subscribers(record.topic());
        deliver(&subscribers, record)?;
        Ok(())
    }
}
