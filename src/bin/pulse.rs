use std::time::Duration;

use clap::Parser;
use futures::future::join_all;
use pulse::{
    Event, Metric,
    config::read_config_file,
    supervisor::{EngineHandles, EngineSupervisor},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, env = "PULSE_CONFIG")]
    file: String,

    /// Seconds to wait for the backends to close their sinks on shutdown
    #[arg(long, default_value_t = 5)]
    shutdown_timeout: u64,

    /// Enable trace logging
    #[arg(short, long)]
    verbose: bool,
}

/// One line of input: `{"metric": {...}}` or `{"event": {...}}`
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Record {
    Metric(Metric),
    Event(Event),
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![("pulse", level), ("pulse_storage", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let supervisor = EngineSupervisor::new();
    let engines = supervisor.start_configured(&config)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => forward(&engines, &line).await,
                Ok(None) => {
                    debug!("end of input");
                    break;
                }
                Err(e) => {
                    error!("failed to read input: {e}");
                    break;
                }
            },

            _ = &mut interrupt => {
                info!("interrupt received");
                break;
            }
        }
    }

    supervisor
        .shutdown(Duration::from_secs(args.shutdown_timeout))
        .await
}

async fn forward(engines: &[EngineHandles], line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let record = match serde_json::from_str::<Record>(line) {
        Ok(record) => record,
        Err(e) => {
            warn!("skipping malformed record: {e}");
            return;
        }
    };

    let sends = engines.iter().map(|engine| {
        let record = record.clone();
        async move {
            let result = match record {
                Record::Metric(metric) => engine.metrics.send(metric).await,
                // metrics-only backends never see events
                Record::Event(event) if engine.events.is_supported() => {
                    engine.events.send(event).await
                }
                Record::Event(_) => Ok(()),
            };
            if let Err(e) = result {
                error!("{}: failed to forward record: {e}", engine.name);
            }
        }
    });

    join_all(sends).await;
}
