//! Pub/sub transports carried by a broadcast medium.
//!
//! A transport moves two-part messages (topic, body) between endpoints and
//! drops inbound messages whose topic has no exact-match filter installed.
//! There is no prefix or wildcard matching.
//!
//! Implementations are internally thread-safe, but callers that need a
//! readiness check and the following read to be one atomic step must
//! serialize those calls themselves.

mod memory;
mod udp;

pub use memory::{MemoryHub, MemoryTransport};
pub use udp::UdpTransport;

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::time::Duration;

/// A topic-tagged message as carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub body: Vec<u8>,
}

/// A pub/sub socket with exact-match topic filtering.
pub trait Transport: Send + Sync + 'static {
    /// Send one message.
    fn send(&self, topic: &str, body: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for inbound data without consuming it.
    ///
    /// `Duration::ZERO` checks without waiting.
    fn poll(&self, timeout: Duration) -> Result<bool>;

    /// Read one pending message.
    ///
    /// Returns `None` when nothing is pending or when the pending message was
    /// consumed but filtered out by topic.
    fn recv(&self) -> Result<Option<Message>>;

    /// Start accepting messages for `topic`.
    fn subscribe(&self, topic: &str) -> Result<()>;

    /// Stop accepting messages for `topic`.
    fn unsubscribe(&self, topic: &str) -> Result<()>;

    /// Consume and drop everything already pending. Returns how many
    /// messages were dropped.
    fn discard_pending(&self) -> Result<usize> {
        let mut discarded = 0;
        while self.poll(Duration::ZERO)? {
            self.recv()?;
            discarded += 1;
        }
        Ok(discarded)
    }
}

/// Set of topics an endpoint accepts.
#[derive(Debug, Default)]
pub(crate) struct TopicFilter {
    topics: RwLock<HashSet<String>>,
}

impl TopicFilter {
    pub fn add(&self, topic: &str) {
        self.topics.write().insert(topic.to_string());
    }

    pub fn remove(&self, topic: &str) {
        self.topics.write().remove(topic);
    }

    pub fn accepts(&self, topic: &str) -> bool {
        self.topics.read().contains(topic)
    }
}
