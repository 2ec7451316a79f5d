//! Mediums connect logger publish calls to sink delivery.
//!
//! Every medium keeps a subscription table mapping a topic (a root logger
//! name) to the sinks subscribed under it, each with a minimum level. A sink
//! holds at most one subscription per topic per medium; subscribing again
//! replaces the threshold.
//!
//! Two mediums ship with the crate:
//! - [`DirectMedium`]: synchronous delivery on the publishing thread
//! - [`BroadcastMedium`]: delivery over a pub/sub [`Transport`](crate::transport::Transport)
//!   with a background thread

mod broadcast;
mod direct;
mod table;

pub use broadcast::BroadcastMedium;
pub use direct::DirectMedium;
pub use table::{Removal, Subscriber, SubscriptionTable};

use crate::error::Result;
use crate::logger::Logger;
use crate::sinks::Sink;
use crate::types::{Level, Record};
use std::sync::Arc;

/// A transport connecting loggers to sinks.
pub trait Medium: Send + Sync {
    /// Deliver `sink` every record published under `topic` at `min_level` or above.
    fn subscribe(&self, sink: Arc<dyn Sink>, topic: &str, min_level: Level) -> Result<()>;

    /// Remove `sink`'s subscription to `topic`. Not an error if there is none.
    fn unsubscribe(&self, sink: &Arc<dyn Sink>, topic: &str) -> Result<()>;

    /// Deliver, or schedule delivery of, `record` under its topic.
    fn publish(&self, record: &Record) -> Result<()>;
}

/// Equip loggers from a shared medium handle.
pub trait MediumExt {
    /// Register this medium's `publish` as a callback on `logger`.
    fn equip(&self, logger: &Logger);
}

impl<M> MediumExt for Arc<M>
where
    M: Medium + ?Sized + 'static,
{
    fn equip(&self, logger: &Logger) {
        logger.equip(Arc::clone(self));
    }
}
