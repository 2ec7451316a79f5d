//! Sink that hands records to another thread through a channel.

use super::Sink;
use crate::error::{Error, Result};
use crate::types::Record;
use crossbeam_channel::{bounded, unbounded, Sender, TrySendError};

/// Receiving end of a [`ChannelSink`].
pub type RecordReceiver = crossbeam_channel::Receiver<Record>;

/// Forwards every received record into a channel.
///
/// A bounded sink fails with [`Error::Sink`] when its buffer is full; either
/// kind fails once the receiver has been dropped.
pub struct ChannelSink {
    sender: Sender<Record>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, RecordReceiver) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    pub fn bounded(capacity: usize) -> (Self, RecordReceiver) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl Sink for ChannelSink {
    fn receive(&self, record: &Record) -> Result<()> {
        match self.sender.try_send(record.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::Sink("channel buffer full".into())),
            Err(TrySendError::Disconnected(_)) => Err(Error::Sink("channel receiver dropped".into())),
        }
    }
}
