//! Helper functions for integration tests

use chrono::{TimeZone, Utc};
use pulse::{
    Event, Metric, Tags,
    config::{FormatConfig, LogConfig, TimeConfig},
};

pub fn create_metric(job: &str, value: f64) -> Metric {
    Metric {
        job: job.to_string(),
        timing: "total".to_string(),
        value,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        url: format!("https://{job}.example.com"),
        tags: Tags::new(),
    }
}

pub fn create_event(name: &str, status: i64) -> Event {
    Event {
        name: name.to_string(),
        server_status: status,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        tags: Tags::from([("source".to_string(), "test".to_string())]),
    }
}

/// Log config writing `<job> <value>` / `<name> <status>` lines to `stream`
pub fn create_log_config(stream: &str) -> LogConfig {
    LogConfig {
        stream: stream.to_string(),
        format: FormatConfig {
            metric: "metric %job %value".to_string(),
            event: "event %name %status %tags".to_string(),
            tag: "%name=%value".to_string(),
            tag_separator: ",".to_string(),
        },
        time: TimeConfig {
            location: "UTC".to_string(),
            format: "%H:%M:%S".to_string(),
        },
    }
}
