//! Per-backend processing loop
//!
//! ## Message Flow
//!
//! ```text
//! MetricSink ──┐
//!              ├─→ select! ─→ send_metric / send_event ─→ sink
//! EventSink ───┘      ↑
//!                     └── CancellationToken ─→ drain queued records ─→ close()
//! ```
//!
//! A failing record is logged and dropped; the loop only stops on
//! cancellation. Records already queued when cancellation arrives are still
//! written before the sink is closed.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use super::backend::StorageEngine;
use crate::{Event, Metric};

/// Run a backend until `token` is cancelled
#[instrument(skip_all, fields(backend = engine.name()))]
pub(crate) async fn process<E: StorageEngine>(
    mut engine: E,
    token: CancellationToken,
    mut metric_rx: mpsc::Receiver<Metric>,
    mut event_rx: Option<mpsc::Receiver<Event>>,
) {
    debug!("starting storage engine");

    let mut metrics_open = true;
    let mut events_open = event_rx.is_some();
    let mut stats = LoopStats::default();

    loop {
        tokio::select! {
            received = metric_rx.recv(), if metrics_open => match received {
                Some(metric) => store_metric(&mut engine, &metric, &mut stats).await,
                None => {
                    debug!("all metric producers dropped");
                    metrics_open = false;
                }
            },

            received = recv_event(&mut event_rx), if events_open => match received {
                Some(event) => store_event(&mut engine, &event, &mut stats).await,
                None => {
                    debug!("all event producers dropped");
                    events_open = false;
                }
            },

            _ = token.cancelled() => {
                info!("cancellation request received, stopping storage engine");
                break;
            }
        }
    }

    // Refuse new records, then write what is already queued.
    metric_rx.close();
    while let Ok(metric) = metric_rx.try_recv() {
        store_metric(&mut engine, &metric, &mut stats).await;
    }
    if let Some(event_rx) = event_rx.as_mut() {
        event_rx.close();
        while let Ok(event) = event_rx.try_recv() {
            store_event(&mut engine, &event, &mut stats).await;
        }
    }

    if let Err(e) = engine.close().await {
        error!("error closing storage sink: {}", e);
    }

    debug!(
        stored = stats.stored,
        failed = stats.failed,
        "storage engine stopped"
    );
}

#[derive(Debug, Default)]
struct LoopStats {
    stored: u64,
    failed: u64,
}

async fn recv_event(event_rx: &mut Option<mpsc::Receiver<Event>>) -> Option<Event> {
    match event_rx {
        Some(event_rx) => event_rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn store_metric<E: StorageEngine>(engine: &mut E, metric: &Metric, stats: &mut LoopStats) {
    trace!("storing metric {}.{}", metric.job, metric.timing);
    match engine.send_metric(metric).await {
        Ok(()) => stats.stored += 1,
        Err(e) => {
            stats.failed += 1;
            error!("failed to store metric {}.{}: {}", metric.job, metric.timing, e);
        }
    }
}

async fn store_event<E: StorageEngine>(engine: &mut E, event: &Event, stats: &mut LoopStats) {
    trace!("storing event {}", event.name);
    match engine.send_event(event).await {
        Ok(()) => stats.stored += 1,
        Err(e) => {
            stats.failed += 1;
            if e.is_contract_violation() {
                error!("contract violation while storing event {}: {}", event.name, e);
            } else {
                error!("failed to store event {}: {}", event.name, e);
            }
        }
    }
}
