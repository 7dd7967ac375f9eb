//! Storage engine trait definition
//!
//! This module defines the `StorageEngine` trait every backend implements,
//! together with the ingress sinks handed to producers when a backend is
//! started.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::error;

use super::engine;
use super::error::{StorageError, StorageResult};
use crate::{Event, Metric};

/// Capacity of each ingress channel.
///
/// Producers wait once a backend has this many records queued.
pub const INGRESS_CAPACITY: usize = 10;

/// Kinds of records a backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    MetricsOnly,
    MetricsAndEvents,
}

/// Trait for storage backends
///
/// A backend is constructed eagerly (files opened, zones resolved) and then
/// moved into its processing loop by [`StorageEngine::start_storage_engine`].
/// From then on the loop owns it exclusively, so implementations need no
/// interior locking.
///
/// ## Error Handling
///
/// `send_metric`/`send_event` return per-record failures. The processing loop
/// logs them and moves on to the next record.
#[async_trait]
pub trait StorageEngine: Send + 'static {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    /// Render/transmit one metric
    async fn send_metric(&mut self, metric: &Metric) -> StorageResult<()>;

    /// Render/transmit one event
    ///
    /// Metrics-only backends keep this default, which rejects the event as a
    /// contract violation.
    async fn send_event(&mut self, _event: &Event) -> StorageResult<()> {
        Err(StorageError::Unsupported {
            backend: self.name(),
        })
    }

    /// Release the sink. Called once, when the processing loop stops.
    async fn close(&mut self) -> StorageResult<()> {
        Ok(())
    }

    /// Launch the processing loop and return the producer-side sinks.
    ///
    /// The loop is spawned on `tracker` and runs until `token` is cancelled.
    /// No event channel is allocated for [`Capability::MetricsOnly`]
    /// backends; the returned [`EventSink`] is then `Unsupported`.
    fn start_storage_engine(
        self,
        token: CancellationToken,
        tracker: &TaskTracker,
    ) -> (MetricSink, EventSink)
    where
        Self: Sized,
    {
        let (metrics, metric_rx) = MetricSink::channel(INGRESS_CAPACITY);
        let (events, event_rx) = match self.capability() {
            Capability::MetricsAndEvents => {
                let (events, event_rx) = EventSink::channel(INGRESS_CAPACITY);
                (events, Some(event_rx))
            }
            Capability::MetricsOnly => (
                EventSink::Unsupported {
                    backend: self.name(),
                },
                None,
            ),
        };

        tracker.spawn(engine::process(self, token, metric_rx, event_rx));

        (metrics, events)
    }
}

/// Errors returned to producers by the ingress sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressError {
    /// The backend does not accept events at all
    Unsupported { backend: &'static str },

    /// The backend stopped and no longer receives records
    Closed,

    /// The channel is at capacity (only from `try_send`)
    Full,
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressError::Unsupported { backend } => write!(
                f,
                "contract violation: the {} backend does not accept events",
                backend
            ),
            IngressError::Closed => write!(f, "storage engine is no longer running"),
            IngressError::Full => write!(f, "ingress channel is full"),
        }
    }
}

impl std::error::Error for IngressError {}

impl<T> From<mpsc::error::TrySendError<T>> for IngressError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => IngressError::Full,
            mpsc::error::TrySendError::Closed(_) => IngressError::Closed,
        }
    }
}

/// Producer handle for a backend's metric channel
#[derive(Debug, Clone)]
pub struct MetricSink {
    sender: mpsc::Sender<Metric>,
}

impl MetricSink {
    /// Create a bounded metric channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Metric>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queue a metric, waiting while the channel is full
    pub async fn send(&self, metric: Metric) -> Result<(), IngressError> {
        self.sender
            .send(metric)
            .await
            .map_err(|_| IngressError::Closed)
    }

    /// Queue a metric without waiting
    pub fn try_send(&self, metric: Metric) -> Result<(), IngressError> {
        self.sender.try_send(metric).map_err(Into::into)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Producer handle for a backend's event channel
///
/// Backends that cannot store events hand out `Unsupported`. Sending to it
/// is an integration bug and fails loudly instead of dropping the event.
#[derive(Debug, Clone)]
pub enum EventSink {
    Supported(mpsc::Sender<Event>),
    Unsupported { backend: &'static str },
}

impl EventSink {
    /// Create a bounded event channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (EventSink::Supported(sender), receiver)
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, EventSink::Supported(_))
    }

    /// Queue an event, waiting while the channel is full
    pub async fn send(&self, event: Event) -> Result<(), IngressError> {
        match self {
            EventSink::Supported(sender) => {
                sender.send(event).await.map_err(|_| IngressError::Closed)
            }
            EventSink::Unsupported { backend } => Err(reject(*backend, &event)),
        }
    }

    /// Queue an event without waiting
    pub fn try_send(&self, event: Event) -> Result<(), IngressError> {
        match self {
            EventSink::Supported(sender) => sender.try_send(event).map_err(Into::into),
            EventSink::Unsupported { backend } => Err(reject(*backend, &event)),
        }
    }
}

fn reject(backend: &'static str, event: &Event) -> IngressError {
    error!(
        backend,
        event = %event.name,
        "contract violation: event sent to a metrics-only storage backend"
    );
    IngressError::Unsupported { backend }
}
