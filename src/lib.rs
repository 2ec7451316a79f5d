//! # Log Distribution
//!
//! Named loggers emit leveled records that are filtered and fanned out to
//! subscribing sinks through a pluggable medium.
//!
//! ## Core Concepts
//!
//! - **Records**: One log event with a source chain, timestamp, level and message
//! - **Loggers**: Named emitters that also forward other loggers' records
//! - **Sinks**: Anything that accepts records
//! - **Mediums**: Topic-keyed subscription tables with level thresholds; the
//!   broadcast medium carries records over a pub/sub transport and delivers
//!   them on a background thread
//! - **Manager**: Registry of loggers and mediums for one process
//!
//! ## Example
//!
//! ```ignore
//! use logcast::{Level, Manager, ManagerConfig, MediumExt, Sink, ConsoleSink};
//! use std::sync::Arc;
//!
//! let manager = Manager::new(ManagerConfig::default())?;
//! let broadcast = manager.medium("broadcast").unwrap();
//!
//! let child = manager.get_logger("child");
//! broadcast.equip(&child);
//!
//! let console: Arc<dyn Sink> = Arc::new(ConsoleSink::default());
//! broadcast.subscribe(console.clone(), "child", Level::Warning)?;
//!
//! child.info("not shown")?;
//! child.error("shown by the delivery thread")?;
//!
//! broadcast.unsubscribe(&console, "child")?;
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod manager;
pub mod medium;
pub mod sinks;
pub mod transport;
pub mod types;

// Re-exports
pub use config::{BroadcastConfig, ManagerConfig, MediumConfig};
pub use error::{Error, Result};
pub use logger::{Callback, Logger};
pub use manager::Manager;
pub use medium::{BroadcastMedium, DirectMedium, Medium, MediumExt, SubscriptionTable};
pub use sinks::{
    ChannelSink, ConsoleSink, FileSink, Filter, Filtered, LevelFilter, RecordReceiver, Sink,
    SinkKey,
};
pub use transport::{MemoryHub, MemoryTransport, Message, Transport, UdpTransport};
pub use types::{process_time, Level, Record};
