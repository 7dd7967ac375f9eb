pub mod config;
pub mod storage;
pub mod supervisor;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tags attached to a record. Keys are unique; rendering walks them in key order.
pub type Tags = BTreeMap<String, String>;

/// A point-in-time measurement produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Identifier of the measured unit
    pub job: String,

    /// Sub-category or phase label (e.g. "dns", "total")
    pub timing: String,

    pub value: f64,

    /// Set by the producer before the record enters the pipeline
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub tags: Tags,
}

/// A discrete occurrence notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,

    #[serde(rename = "status", alias = "server_status")]
    pub server_status: i64,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub tags: Tags,
}
