//! Storage backends for metrics and events
//!
//! This module provides a trait-based abstraction for emitting records to
//! various sinks (console, log files, and later network time-series stores).
//!
//! ## Design
//!
//! - **Trait-based**: `StorageEngine` lets the supervisor start any backend
//! - **Capability-aware**: metrics-only backends hand out an unsupported event sink
//! - **One task per backend**: records arrive over two bounded channels and are
//!   processed strictly in order, so backends own their sink without locks
//!
//! ## Backends
//!
//! - **Console**: null backend, accepts metrics only
//! - **Log**: renders records with templates and appends them to a stream or file
//!
//! ## Usage
//!
//! ```no_run
//! use pulse::storage::{StorageEngine, log::LogStorage};
//! use tokio_util::{sync::CancellationToken, task::TaskTracker};
//!
//! # async fn example(config: pulse::config::LogConfig) -> anyhow::Result<()> {
//! let token = CancellationToken::new();
//! let tracker = TaskTracker::new();
//! let (metrics, events) = LogStorage::new(&config)?.start_storage_engine(token.clone(), &tracker);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod console;
mod engine;
pub mod error;
pub mod format;
pub mod log;

pub use backend::{Capability, EventSink, INGRESS_CAPACITY, IngressError, MetricSink, StorageEngine};
pub use error::{StorageError, StorageResult};
pub use format::Formatter;
