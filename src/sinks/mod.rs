//! Record consumers.
//!
//! A [`Sink`] is anything that accepts records. Mediums hold sinks in their
//! subscription tables and call [`Sink::receive`] for every record that
//! passes topic and threshold filtering. A [`Logger`](crate::Logger) is also
//! a sink, which is how one logger aggregates another's records.
//!
//! Stock sinks:
//! - [`ConsoleSink`]: formatted lines on stdout, optionally coloured
//! - [`FileSink`]: formatted lines appended to a file
//! - [`ChannelSink`]: records forwarded into a channel
//! - [`Filtered`]: wraps another sink behind a list of [`Filter`]s

mod channel;
mod writer;

pub use channel::{ChannelSink, RecordReceiver};
pub use writer::{ConsoleSink, FileSink};

use crate::error::Result;
use crate::types::{Level, Record};
use parking_lot::RwLock;
use std::sync::Arc;

/// A consumer of records.
///
/// Errors returned from `receive` are not swallowed by loggers or mediums:
/// they propagate to whichever thread invoked the sink.
pub trait Sink: Send + Sync {
    fn receive(&self, record: &Record) -> Result<()>;
}

/// Identity of a sink inside a subscription table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinkKey(usize);

impl SinkKey {
    pub fn of(sink: &Arc<dyn Sink>) -> Self {
        SinkKey(Arc::as_ptr(sink) as *const () as usize)
    }
}

/// Predicate deciding whether a record is passed on.
pub trait Filter: Send + Sync {
    fn filter(&self, record: &Record) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn filter(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Accepts records at or above a minimum level.
#[derive(Clone, Copy, Debug)]
pub struct LevelFilter {
    pub min_level: Level,
}

impl LevelFilter {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Filter for LevelFilter {
    fn filter(&self, record: &Record) -> bool {
        self.min_level.admits(record.level)
    }
}

/// A sink guarded by a mutable list of filters.
///
/// A record is forwarded only if every filter accepts it.
pub struct Filtered<S> {
    inner: S,
    filters: RwLock<Vec<Arc<dyn Filter>>>,
}

impl<S: Sink> Filtered<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            filters: RwLock::new(Vec::new()),
        }
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().push(filter);
    }

    /// Remove a filter previously added (matched by identity).
    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        self.filters.write().retain(|f| !Arc::ptr_eq(f, filter));
    }

    pub fn clear_filters(&self) {
        self.filters.write().clear();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Sink> Sink for Filtered<S> {
    fn receive(&self, record: &Record) -> Result<()> {
        let accepted = self.filters.read().iter().all(|f| f.filter(record));
        if accepted {
            self.inner.receive(record)
        } else {
            Ok(())
        }
    }
}
