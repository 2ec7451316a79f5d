//! Topic → sink → threshold table shared by the mediums.

use crate::error::Result;
use crate::sinks::{Sink, SinkKey};
use crate::types::{Level, Record};
use std::collections::HashMap;
use std::sync::Arc;

/// A subscribed sink and its threshold.
#[derive(Clone)]
pub struct Subscriber {
    pub sink: Arc<dyn Sink>,
    pub threshold: Level,
}

/// Outcome of removing a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// No such subscription existed.
    Absent,
    /// Removed; the topic still has subscribers.
    Removed,
    /// Removed the topic's last subscriber, so the topic is gone too.
    TopicEmptied,
}

/// Subscriptions keyed by topic, then by sink identity.
///
/// A topic is present if and only if at least one sink is subscribed to it.
#[derive(Default)]
pub struct SubscriptionTable {
    topics: HashMap<String, HashMap<SinkKey, Subscriber>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `sink`'s threshold for `topic`. Returns true if the topic is new.
    pub fn insert(&mut self, topic: &str, sink: Arc<dyn Sink>, threshold: Level) -> bool {
        let key = SinkKey::of(&sink);
        let subscriber = Subscriber { sink, threshold };
        match self.topics.get_mut(topic) {
            Some(sinks) => {
                sinks.insert(key, subscriber);
                false
            }
            None => {
                self.topics
                    .insert(topic.to_string(), HashMap::from([(key, subscriber)]));
                true
            }
        }
    }

    pub fn remove(&mut self, topic: &str, key: SinkKey) -> Removal {
        let Some(sinks) = self.topics.get_mut(topic) else {
            return Removal::Absent;
        };
        if sinks.remove(&key).is_none() {
            return Removal::Absent;
        }
        if sinks.is_empty() {
            self.topics.remove(topic);
            Removal::TopicEmptied
        } else {
            Removal::Removed
        }
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn threshold(&self, topic: &str, key: SinkKey) -> Option<Level> {
        self.topics.get(topic)?.get(&key).map(|s| s.threshold)
    }

    /// Copy of a topic's subscribers, for delivery outside the lock.
    pub fn subscribers(&self, topic: &str) -> Vec<Subscriber> {
        self.topics
            .get(topic)
            .map(|sinks| sinks.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.topics.values().map(HashMap::len).sum()
    }
}

/// Hand `record` to every subscriber whose threshold admits it.
///
/// Returns how many sinks received the record. The first sink error aborts
/// delivery to the remaining sinks and is returned.
pub(crate) fn deliver(subscribers: &[Subscriber], record: &Record) -> Result<usize> {
    let mut delivered = 0;
    for subscriber in subscribers {
        if subscriber.threshold.admits(record.level) {
            subscriber.sink.receive(record)?;
            delivered += 1;
        }
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::ChannelSink;

    fn sink() -> Arc<dyn Sink> {
        let (sink, _rx) = ChannelSink::unbounded();
        Arc::new(sink)
    }

    #[test]
    fn test_topic_present_iff_subscribed() {
        let mut table = SubscriptionTable::new();
        let a = sink();
        let b = sink();

        assert!(table.insert("main", a.clone(), Level::Debug));
        assert!(!table.insert("main", b.clone(), Level::Error));
        assert_eq!(table.len(), 2);

        assert_eq!(table.remove("main", SinkKey::of(&a)), Removal::Removed);
        assert!(table.contains_topic("main"));
        assert_eq!(table.remove("main", SinkKey::of(&b)), Removal::TopicEmptied);
        assert!(!table.contains_topic("main"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_resubscribe_overwrites_threshold() {
        let mut table = SubscriptionTable::new();
        let a = sink();

        table.insert("main", a.clone(), Level::Debug);
        table.insert("main", a.clone(), Level::Critical);

        assert_eq!(table.len(), 1);
        assert_eq!(table.threshold("main", SinkKey::of(&a)), Some(Level::Critical));
    }

    #[test]
    fn test_remove_absent() {
        let mut table = SubscriptionTable::new();
        let a = sink();
        assert_eq!(table.remove("nope", SinkKey::of(&a)), Removal::Absent);

        table.insert("main", sink(), Level::Any);
        assert_eq!(table.remove("main", SinkKey::of(&a)), Removal::Absent);
        assert!(table.contains_topic("main"));
    }

    #[test]
    fn test_deliver_respects_threshold() {
        let (low, low_rx) = ChannelSink::unbounded();
        let (high, high_rx) = ChannelSink::unbounded();
        let subscribers = vec![
            Subscriber { sink: Arc::new(low), threshold: Level::Debug },
            Subscriber { sink: Arc::new(high), threshold: Level::Error },
        ];

        let delivered = deliver(&subscribers, &Record::now("main", Level::Debug, "x")).unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(low_rx.len(), 1);
        assert_eq!(high_rx.len(), 0);
    }
}
