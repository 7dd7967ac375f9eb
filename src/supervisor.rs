//! Engine supervisor - owns the lifecycle of every started backend
//!
//! The supervisor holds the shared `CancellationToken` and a `TaskTracker`.
//! Each started backend gets a clone of the token and its processing loop is
//! spawned on the tracker, so shutdown is: cancel, close the tracker, wait.
//!
//! ```text
//! start(engine) ──→ tracker.spawn(loop) ──→ (MetricSink, EventSink) to producer
//! shutdown()    ──→ token.cancel() ──→ loops drain + close sinks ──→ tracker.wait()
//! ```

use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::storage::{
    EventSink, MetricSink, StorageEngine, console::ConsoleStorage, log::LogStorage,
};

/// Producer-side handles of one started backend
#[derive(Debug, Clone)]
pub struct EngineHandles {
    pub name: &'static str,
    pub metrics: MetricSink,
    pub events: EventSink,
}

#[derive(Debug, Default)]
pub struct EngineSupervisor {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl EngineSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a supervisor whose backends also stop when `parent` is cancelled
    pub fn with_parent(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tracker: TaskTracker::new(),
        }
    }

    /// Token observed by every started backend
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of backend loops that have not finished yet
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Start a backend's processing loop
    pub fn start<E: StorageEngine>(&self, engine: E) -> EngineHandles {
        let name = engine.name();
        debug!("starting {} storage engine", name);

        let (metrics, events) = engine.start_storage_engine(self.token.clone(), &self.tracker);

        EngineHandles {
            name,
            metrics,
            events,
        }
    }

    /// Construct and start every backend present in the configuration.
    ///
    /// All backends are constructed before any of them is started, so a
    /// configuration error leaves nothing running.
    #[instrument(skip_all)]
    pub fn start_configured(&self, config: &Config) -> anyhow::Result<Vec<EngineHandles>> {
        let console = config.storage.console.as_ref().map(ConsoleStorage::new);
        let log = config
            .storage
            .log
            .as_ref()
            .map(LogStorage::new)
            .transpose()
            .context("failed to construct log storage backend")?;

        if console.is_none() && log.is_none() {
            bail!("no storage backend configured");
        }

        let mut handles = Vec::new();
        if let Some(console) = console {
            handles.push(self.start(console));
        }
        if let Some(log) = log {
            handles.push(self.start(log));
        }

        info!("started {} storage engine(s)", handles.len());
        Ok(handles)
    }

    /// Cancel every backend and wait up to `timeout` for all of them to stop
    #[instrument(skip(self))]
    pub async fn shutdown(&self, timeout: Duration) -> anyhow::Result<()> {
        info!("shutting down {} storage engine(s)", self.tracker.len());

        self.token.cancel();
        self.tracker.close();

        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            let remaining = self.tracker.len();
            warn!("{} storage engine(s) still running after {:?}", remaining, timeout);
            return Err(anyhow!(
                "{remaining} storage engine(s) did not stop within {timeout:?}"
            ));
        }

        debug!("all storage engines stopped");
        Ok(())
    }
}
