//! Console storage backend (null backend)
//!
//! Accepts metrics only. Delivery to a real telemetry endpoint is not wired
//! up yet, so every metric is acknowledged and discarded. Events are never
//! accepted: the backend reports [`Capability::MetricsOnly`], so no event
//! channel is allocated and producers receive an unsupported event sink.

use async_trait::async_trait;
use tracing::{debug, trace};

use super::backend::{Capability, StorageEngine};
use super::error::StorageResult;
use crate::Metric;
use crate::config::ConsoleConfig;

#[derive(Debug, Default)]
pub struct ConsoleStorage {
    discarded: u64,
}

impl ConsoleStorage {
    pub fn new(_config: &ConsoleConfig) -> Self {
        debug!("creating console storage backend");
        Self::default()
    }
}

#[async_trait]
impl StorageEngine for ConsoleStorage {
    fn name(&self) -> &'static str {
        "console"
    }

    fn capability(&self) -> Capability {
        Capability::MetricsOnly
    }

    async fn send_metric(&mut self, metric: &Metric) -> StorageResult<()> {
        self.discarded += 1;
        trace!(
            job = %metric.job,
            timing = %metric.timing,
            value = metric.value,
            "console backend discarding metric"
        );
        Ok(())
    }

    async fn close(&mut self) -> StorageResult<()> {
        debug!("closing console backend ({} metrics discarded)", self.discarded);
        Ok(())
    }
}
