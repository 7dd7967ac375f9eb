//! Log storage backend
//!
//! Renders metrics and events with the configured templates and appends one
//! line per record to a standard stream or a file.
//!
//! ## Stream selection
//!
//! - `stdout` / `stderr`: the process streams, flushed but never closed
//! - `stdin`: accepted, but every write fails because stdin is not writable
//! - anything else: a path opened for append, created if missing
//!
//! The file handle is owned by the backend and released in `close()`; any
//! write after that fails with [`StorageError::Closed`].

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use super::backend::{Capability, StorageEngine};
use super::error::{StorageError, StorageResult};
use super::format::Formatter;
use crate::config::LogConfig;
use crate::{Event, Metric};

#[derive(Debug)]
enum Stream {
    Stdout(tokio::io::Stdout),
    Stderr(tokio::io::Stderr),
    Stdin,
    File { path: PathBuf, file: tokio::fs::File },
}

impl Stream {
    fn open(selector: &str) -> StorageResult<Self> {
        match selector {
            "stdout" => Ok(Stream::Stdout(tokio::io::stdout())),
            "stderr" => Ok(Stream::Stderr(tokio::io::stderr())),
            "stdin" => Ok(Stream::Stdin),
            path => {
                let path = PathBuf::from(path);
                let mut options = OpenOptions::new();
                options.append(true).create(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.mode(0o644);
                }

                let file = options.open(&path).map_err(|source| StorageError::Open {
                    path: path.clone(),
                    source,
                })?;

                Ok(Stream::File {
                    path,
                    file: tokio::fs::File::from_std(file),
                })
            }
        }
    }

    async fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        match self {
            Stream::Stdout(out) => {
                out.write_all(record).await?;
                out.flush().await
            }
            Stream::Stderr(err) => {
                err.write_all(record).await?;
                err.flush().await
            }
            Stream::Stdin => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not writable",
            )),
            Stream::File { file, .. } => {
                file.write_all(record).await?;
                file.flush().await
            }
        }
    }
}

/// Storage backend writing rendered records to a stream or file
///
/// Every record is written as one line: a `\n` is appended to the rendered
/// template unless it already ends with one.
#[derive(Debug)]
pub struct LogStorage {
    stream: Option<Stream>,
    formatter: Formatter,
}

impl LogStorage {
    /// Build the backend, resolving the time zone and opening the sink.
    ///
    /// Fails on empty templates, an unknown zone, an invalid time pattern or
    /// a path that cannot be opened.
    pub fn new(config: &LogConfig) -> StorageResult<Self> {
        if config.stream.is_empty() {
            return Err(StorageError::InvalidConfig(
                "log stream must not be empty".to_string(),
            ));
        }
        if config.format.metric.is_empty() {
            return Err(StorageError::InvalidConfig(
                "log metric format must not be empty".to_string(),
            ));
        }
        if config.format.event.is_empty() {
            return Err(StorageError::InvalidConfig(
                "log event format must not be empty".to_string(),
            ));
        }

        // Resolve the formatter before opening so a bad zone leaves no file behind.
        let formatter = Formatter::new(config.format.clone(), &config.time)?;
        let stream = Stream::open(&config.stream)?;

        debug!(
            "creating log storage backend (stream: {}, zone: {})",
            config.stream,
            formatter.zone()
        );

        Ok(Self {
            stream: Some(stream),
            formatter,
        })
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    async fn write_line(&mut self, mut line: String) -> StorageResult<()> {
        let stream = self.stream.as_mut().ok_or(StorageError::Closed)?;
        if !line.ends_with('\n') {
            line.push('\n');
        }
        stream.write_record(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageEngine for LogStorage {
    fn name(&self) -> &'static str {
        "log"
    }

    fn capability(&self) -> Capability {
        Capability::MetricsAndEvents
    }

    async fn send_metric(&mut self, metric: &Metric) -> StorageResult<()> {
        let line = self.formatter.render_metric(metric);
        self.write_line(line).await
    }

    async fn send_event(&mut self, event: &Event) -> StorageResult<()> {
        let line = self.formatter.render_event(event);
        self.write_line(line).await
    }

    async fn close(&mut self) -> StorageResult<()> {
        match self.stream.take() {
            Some(Stream::File { path, mut file }) => {
                file.flush().await?;
                debug!("closed log file {}", path.display());
            }
            Some(Stream::Stdout(mut out)) => out.flush().await?,
            Some(Stream::Stderr(mut err)) => err.flush().await?,
            Some(Stream::Stdin) => {}
            None => trace!("log backend already closed"),
        }
        Ok(())
    }
}
