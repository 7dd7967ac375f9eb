use std::path::Path;

use anyhow::Context;
use tracing::trace;

/// Top-level configuration handed to the storage layer
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Per-backend configuration subtrees. A backend is started only if its
/// subtree is present.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StorageConfig {
    pub console: Option<ConsoleConfig>,
    pub log: Option<LogConfig>,
}

/// The console backend currently has nothing to configure
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ConsoleConfig {}

/// Configuration of the log/file backend
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LogConfig {
    /// `stdout`, `stderr`, `stdin` or a filesystem path opened for append
    pub stream: String,
    pub format: FormatConfig,
    #[serde(default)]
    pub time: TimeConfig,
}

/// Templates used to render records
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct FormatConfig {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub event: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(
        rename = "tag-separator",
        alias = "tag-seperator",
        default = "default_tag_separator"
    )]
    pub tag_separator: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TimeConfig {
    /// IANA zone name; empty means UTC
    #[serde(default)]
    pub location: String,
    /// strftime pattern
    #[serde(default = "default_time_format")]
    pub format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            location: String::new(),
            format: default_time_format(),
        }
    }
}

fn default_tag() -> String {
    String::from("%name=%value")
}

fn default_tag_separator() -> String {
    String::from(",")
}

fn default_time_format() -> String {
    String::from("%Y-%m-%dT%H:%M:%S%:z")
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
