use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorType {
    #[serde(rename = "T")]
    Temperature,
    #[serde(rename = "H")]
    Humidity,
    #[serde(rename = "C")]
    Counter,
}

/// A single reading as submitted by a sensor and as stored in the logs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "Serial")]
    pub serial: String,
    #[serde(rename = "Type")]
    pub kind: SensorType,
    #[serde(rename = "Temperature", default)]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// Readings submitted together, stored under one timestamp key.
pub type ReadingBatch = Vec<SensorReading>;

/// Batches keyed by their RFC3339 timestamp, in key order.
pub type ReadingLog = BTreeMap<String, ReadingBatch>;

/// Serial number to human readable name.
pub type SerialNames = BTreeMap<String, String>;
