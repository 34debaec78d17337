use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::sensor::{ReadingLog, SensorReading, SerialNames};

/// Bucket mapping serial numbers to human readable names.
pub const SERIAL_NAMES: &str = "serialNames";
/// Bucket holding every submitted batch keyed by its timestamp.
pub const READINGS: &str = "readings";
/// Name stored for a serial number when it is seen in a batch.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Earliest timestamp key; earlier instants are clamped to it.
pub const FIRST_KEY: &str = "0000-01-01T00:00:00Z";
/// Latest timestamp key; later instants are clamped to it.
pub const LAST_KEY: &str = "9999-12-31T23:59:59Z";

// Years outside 0000..=9999 gain a sign or a fifth digit and stop sorting lexically.
const MIN_KEY_SECONDS: i64 = -62_167_219_200;
const MAX_KEY_SECONDS: i64 = 253_402_300_799;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("failed to open database: {0}")]
    Open(#[from] diesel::ConnectionError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("database connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0}")]
    Query(#[from] diesel::result::Error),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("bucket name required")]
    BucketNameRequired,

    #[error("tx not writable")]
    TxNotWritable,

    #[error("failed to encode readings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("database operation was canceled")]
    Blocking,
}

/// Storage schema operations used by the HTTP handlers.
///
/// Every call runs inside its own transaction; nothing is shared between calls.
pub trait Database {
    /// Full serial number to name directory.
    fn serial_names(&self) -> Result<SerialNames, DatabaseError>;

    /// Returns the serials from `serials` without a directory entry, in input order.
    fn missing_serials(&self, serials: &[String]) -> Result<Vec<String>, DatabaseError>;

    /// Batches whose key lies in `start..=end`, compared lexically.
    ///
    /// Stored values that fail to decode are logged and left out of the result.
    fn readings_between(&self, start: &str, end: &str) -> Result<ReadingLog, DatabaseError>;

    /// Records a batch under `timestamp` in the global log, each reading in its
    /// sensor's log, and every serial in the directory. All or nothing.
    fn add_readings(&self, timestamp: &str, readings: &[SensorReading]) -> Result<(), DatabaseError>;
}

/// RFC3339 key for `at`, always in UTC with second precision.
pub fn timestamp_key(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC3339 key for a Unix timestamp. Instants without a four digit year
/// are clamped to [`FIRST_KEY`] or [`LAST_KEY`].
pub fn unix_timestamp_key(seconds: i64) -> String {
    let clamped = seconds.clamp(MIN_KEY_SECONDS, MAX_KEY_SECONDS);
    match DateTime::<Utc>::from_timestamp(clamped, 0) {
        Some(at) => timestamp_key(&at),
        None if seconds < 0 => FIRST_KEY.to_string(),
        None => LAST_KEY.to_string(),
    }
}
