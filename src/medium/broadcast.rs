//! Medium backed by a pub/sub transport and a background delivery thread.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──subscribe──▶ Running ──last unsubscribe──▶ Idle ──subscribe──▶ Running ...
//! ```
//!
//! The delivery thread runs exactly while the subscription table is
//! non-empty. The `unsubscribe` call that empties the table signals the
//! thread and joins it before returning.
//!
//! # Locking
//!
//! One mutex per medium guards the subscription table, the worker state and
//! every transport send/receive. Checking for pending data and reading it
//! happen under the lock as one step, because the publish path and the
//! delivery thread both drain the same transport. Sinks are always invoked
//! after the lock is released.
//!
//! # Ordering
//!
//! Publish and delivery are decoupled by the transport, which only orders
//! messages best-effort. A record forwarded through a parent logger may be
//! observed before the child's record that caused it; there is no causal
//! ordering guarantee across topics.

use super::table::{deliver, Removal, SubscriptionTable};
use super::Medium;
use crate::config::BroadcastConfig;
use crate::error::{Error, Result};
use crate::sinks::{Sink, SinkKey};
use crate::transport::{MemoryHub, MemoryTransport, Transport, UdpTransport};
use crate::types::{Level, Record};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Handle to a running delivery thread.
struct WorkerHandle {
    stop: Sender<()>,
    thread: JoinHandle<Result<()>>,
}

impl WorkerHandle {
    /// Signal the thread and wait for it to exit.
    fn stop(self) -> Result<()> {
        let _ = self.stop.send(());
        if self.thread.thread().id() == thread::current().id() {
            // Stopped from inside a sink on the delivery thread itself; the
            // loop sees the signal once the sink returns.
            return Ok(());
        }
        self.thread.join().map_err(|_| Error::WorkerPanicked)?
    }
}

enum Worker {
    Idle,
    Running(WorkerHandle),
}

impl Worker {
    /// Whether a thread is attached, finished or not.
    fn is_attached(&self) -> bool {
        matches!(self, Worker::Running(_))
    }

    fn is_running(&self) -> bool {
        matches!(self, Worker::Running(h) if !h.thread.is_finished())
    }

    fn take(&mut self) -> Option<WorkerHandle> {
        match std::mem::replace(self, Worker::Idle) {
            Worker::Running(handle) => Some(handle),
            Worker::Idle => None,
        }
    }

    /// Collect a thread that exited on its own, surfacing its failure.
    fn reap(&mut self) -> Result<()> {
        let finished = matches!(self, Worker::Running(h) if h.thread.is_finished());
        match self.take() {
            Some(handle) if finished => handle.stop(),
            Some(handle) => {
                *self = Worker::Running(handle);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// State guarded by the medium lock.
struct State {
    table: SubscriptionTable,
    worker: Worker,
    /// Delivery threads started so far.
    starts: u64,
}

struct Shared<T> {
    transport: T,
    state: Mutex<State>,
    poll_interval: Duration,
}

impl<T: Transport> Shared<T> {
    /// Read and deliver one pending message.
    ///
    /// Returns false if nothing was pending once the lock was held.
    fn deliver_pending(&self) -> Result<bool> {
        let (message, subscribers) = {
            let state = self.state.lock();
            // Another reader may have taken the message since readiness was
            // observed, so check again under the lock before reading.
            if !self.transport.poll(Duration::ZERO)? {
                return Ok(false);
            }
            match self.transport.recv()? {
                Some(message) => {
                    let subscribers = state.table.subscribers(&message.topic);
                    (message, subscribers)
                }
                None => return Ok(true),
            }
        };

        if subscribers.is_empty() {
            return Ok(true);
        }

        let record = match Record::decode(&message.body) {
            Ok(record) => record,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "dropping malformed record");
                return Ok(true);
            }
        };

        let delivered = deliver(&subscribers, &record)?;
        trace!(topic = %message.topic, level = %record.level, delivered, "delivered record");
        Ok(true)
    }

    /// Deliver everything already pending, without waiting.
    fn drain(&self) -> Result<usize> {
        let mut handled = 0;
        while self.transport.poll(Duration::ZERO)? {
            if !self.deliver_pending()? {
                break;
            }
            handled += 1;
        }
        Ok(handled)
    }

    fn run(&self, stop: Receiver<()>) -> Result<()> {
        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return Ok(()),
                Err(TryRecvError::Empty) => {}
            }
            if self.transport.poll(self.poll_interval)? {
                self.deliver_pending()?;
            }
        }
    }
}

fn start_worker<T: Transport>(shared: &Arc<Shared<T>>, generation: u64) -> Result<WorkerHandle> {
    let (stop, stop_rx) = bounded(1);
    let shared = Arc::clone(shared);
    let thread = thread::Builder::new()
        .name(format!("logcast-delivery-{}", generation))
        .spawn(move || {
            debug!(generation, "delivery worker started");
            let result = shared.run(stop_rx);
            match &result {
                Ok(()) => debug!(generation, "delivery worker stopped"),
                Err(e) => error!(generation, error = %e, "delivery worker failed"),
            }
            result
        })?;
    Ok(WorkerHandle { stop, thread })
}

/// A medium that publishes through a [`Transport`] and delivers on a
/// background thread.
///
/// Topic filters are pushed down to the transport: it listens for a topic
/// exactly while at least one sink is subscribed to it.
pub struct BroadcastMedium<T: Transport = UdpTransport> {
    shared: Arc<Shared<T>>,
}

impl BroadcastMedium<UdpTransport> {
    /// Bind a UDP transport according to `config`.
    pub fn bind(config: &BroadcastConfig) -> Result<Self> {
        let transport = UdpTransport::bind(config)?;
        Ok(Self::with_transport(transport, config.poll_interval()))
    }
}

impl BroadcastMedium<MemoryTransport> {
    /// Attach to an in-process hub.
    pub fn in_memory(hub: &Arc<MemoryHub>) -> Self {
        Self::with_transport(hub.endpoint(), BroadcastConfig::default().poll_interval())
    }
}

impl<T: Transport> BroadcastMedium<T> {
    pub fn with_transport(transport: T, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                state: Mutex::new(State {
                    table: SubscriptionTable::new(),
                    worker: Worker::Idle,
                    starts: 0,
                }),
                poll_interval,
            }),
        }
    }

    /// Whether the delivery thread is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().worker.is_running()
    }

    /// How many delivery threads have been started over the medium's life.
    pub fn worker_starts(&self) -> u64 {
        self.shared.state.lock().starts
    }

    /// Topics with at least one subscriber.
    pub fn topics(&self) -> Vec<String> {
        self.shared.state.lock().table.topics()
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    /// Deliver every message already waiting on the transport, on the
    /// calling thread. Returns how many messages were consumed.
    pub fn drain(&self) -> Result<usize> {
        self.shared.drain()
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }
}

impl<T: Transport> Medium for BroadcastMedium<T> {
    fn subscribe(&self, sink: Arc<dyn Sink>, topic: &str, min_level: Level) -> Result<()> {
        let mut state = self.shared.state.lock();
        state.worker.reap()?;

        if state.table.is_empty() {
            // Whatever arrived while nobody was listening is stale.
            let discarded = self.shared.transport.discard_pending()?;
            if discarded > 0 {
                debug!(discarded, "discarded messages queued while idle");
            }
        }

        let new_topic = !state.table.contains_topic(topic);
        if new_topic {
            self.shared.transport.subscribe(topic)?;
        }

        if !state.worker.is_attached() {
            match start_worker(&self.shared, state.starts + 1) {
                Ok(handle) => {
                    state.starts += 1;
                    state.worker = Worker::Running(handle);
                }
                Err(e) => {
                    if new_topic {
                        if let Err(rollback) = self.shared.transport.unsubscribe(topic) {
                            warn!(topic, error = %rollback, "failed to remove topic filter");
                        }
                    }
                    return Err(e);
                }
            }
        }

        if new_topic {
            debug!(topic, "listening for topic");
        }
        state.table.insert(topic, sink, min_level);
        Ok(())
    }

    fn unsubscribe(&self, sink: &Arc<dyn Sink>, topic: &str) -> Result<()> {
        let stopping = {
            let mut state = self.shared.state.lock();
            match state.table.remove(topic, SinkKey::of(sink)) {
                Removal::Absent => return Ok(()),
                Removal::Removed => {}
                Removal::TopicEmptied => {
                    self.shared.transport.unsubscribe(topic)?;
                    debug!(topic, "stopped listening for topic");
                }
            }
            if state.table.is_empty() {
                state.worker.take()
            } else {
                None
            }
        };

        // Joined without the lock: the worker needs it to finish a read.
        match stopping {
            Some(handle) => handle.stop(),
            None => Ok(()),
        }
    }

    fn publish(&self, record: &Record) -> Result<()> {
        self.shared.drain()?;

        let _state = self.shared.state.lock();
        let body = record.encode()?;
        self.shared.transport.send(record.topic(), &body)
    }
}

impl<T: Transport> Drop for BroadcastMedium<T> {
    fn drop(&mut self) {
        let handle = self.shared.state.lock().worker.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop() {
                warn!(error = %e, "delivery worker failed during shutdown");
            }
        }
    }
}
