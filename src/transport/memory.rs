//! In-process broadcast bus.

use super::{Message, TopicFilter, Transport};
use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// The hub's view of one attached endpoint.
struct Route {
    sender: Sender<Message>,
    filter: Weak<TopicFilter>,
}

/// A broadcast channel shared by [`MemoryTransport`] endpoints.
///
/// A message sent through any endpoint is enqueued on every endpoint of the
/// hub whose filter accepts its topic, the sender included. Endpoints that
/// are not listening for a topic never queue it.
#[derive(Default)]
pub struct MemoryHub {
    routes: Mutex<Vec<Route>>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a new endpoint.
    pub fn endpoint(self: &Arc<Self>) -> MemoryTransport {
        let (sender, receiver) = unbounded();
        let filter = Arc::new(TopicFilter::default());
        self.routes.lock().push(Route {
            sender,
            filter: Arc::downgrade(&filter),
        });
        MemoryTransport {
            hub: Arc::clone(self),
            receiver,
            filter,
        }
    }

    /// Endpoints currently attached.
    pub fn endpoint_count(&self) -> usize {
        self.routes.lock().len()
    }

    fn broadcast(&self, message: Message) {
        let mut routes = self.routes.lock();
        // Detached endpoints drop out here.
        routes.retain(|route| match route.filter.upgrade() {
            Some(filter) if filter.accepts(&message.topic) => {
                route.sender.send(message.clone()).is_ok()
            }
            Some(_) => true,
            None => false,
        });
    }
}

/// One endpoint of a [`MemoryHub`].
pub struct MemoryTransport {
    hub: Arc<MemoryHub>,
    receiver: Receiver<Message>,
    filter: Arc<TopicFilter>,
}

impl MemoryTransport {
    /// Messages queued on this endpoint and not yet read.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, topic: &str, body: &[u8]) -> Result<()> {
        self.hub.broadcast(Message {
            topic: topic.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> Result<bool> {
        if timeout.is_zero() {
            return Ok(!self.receiver.is_empty());
        }
        let mut select = Select::new();
        select.recv(&self.receiver);
        Ok(select.ready_timeout(timeout).is_ok())
    }

    fn recv(&self) -> Result<Option<Message>> {
        // Checked again here: the topic may have been unsubscribed after the
        // message was queued.
        match self.receiver.try_recv() {
            Ok(message) if self.filter.accepts(&message.topic) => Ok(Some(message)),
            Ok(_) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn subscribe(&self, topic: &str) -> Result<()> {
        self.filter.add(topic);
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.filter.remove(topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fanout_to_all_endpoints() {
        let hub = MemoryHub::new();
        let a = hub.endpoint();
        let b = hub.endpoint();
        a.subscribe("t").unwrap();
        b.subscribe("t").unwrap();

        a.send("t", b"hello").unwrap();

        for endpoint in [&a, &b] {
            assert!(endpoint.poll(Duration::ZERO).unwrap());
            let message = endpoint.recv().unwrap().unwrap();
            assert_eq!(message.topic, "t");
            assert_eq!(message.body, b"hello");
        }
    }

    #[test]
    fn test_unsubscribed_topic_is_never_queued() {
        let hub = MemoryHub::new();
        let endpoint = hub.endpoint();
        endpoint.subscribe("a").unwrap();

        endpoint.send("b", b"ignored").unwrap();
        assert!(!endpoint.poll(Duration::ZERO).unwrap());
        assert_eq!(endpoint.queued(), 0);
    }

    #[test]
    fn test_idle_endpoint_queue_stays_empty() {
        let hub = MemoryHub::new();
        let idle = hub.endpoint();
        let busy = hub.endpoint();
        busy.subscribe("t").unwrap();

        for i in 0..100u8 {
            busy.send("t", &[i]).unwrap();
        }
        assert_eq!(idle.queued(), 0);
        assert_eq!(busy.queued(), 100);
    }

    #[test]
    fn test_unsubscribe_after_queueing_filters_on_read() {
        let hub = MemoryHub::new();
        let endpoint = hub.endpoint();
        endpoint.subscribe("t").unwrap();
        endpoint.send("t", b"queued").unwrap();
        endpoint.unsubscribe("t").unwrap();

        assert!(endpoint.poll(Duration::ZERO).unwrap());
        assert_eq!(endpoint.recv().unwrap(), None);
        assert!(!endpoint.poll(Duration::ZERO).unwrap());
    }

    #[test]
    fn test_discard_pending() {
        let hub = MemoryHub::new();
        let endpoint = hub.endpoint();
        endpoint.subscribe("t").unwrap();
        endpoint.send("t", b"1").unwrap();
        endpoint.send("t", b"2").unwrap();

        assert_eq!(endpoint.discard_pending().unwrap(), 2);
        assert_eq!(endpoint.queued(), 0);
        assert_eq!(endpoint.discard_pending().unwrap(), 0);
    }

    #[test]
    fn test_poll_times_out() {
        let hub = MemoryHub::new();
        let endpoint = hub.endpoint();
        assert!(!endpoint.poll(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_dropped_endpoint_detaches() {
        let hub = MemoryHub::new();
        let a = hub.endpoint();
        let b = hub.endpoint();
        drop(b);

        a.send("t", b"x").unwrap();
        assert_eq!(hub.endpoint_count(), 1);
    }
}
