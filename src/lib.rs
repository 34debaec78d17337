//! HTTP API server for temperature sensor readings.
//!
//! Readings are kept in ordered key-value buckets: a directory of serial
//! numbers, a global log of batches keyed by RFC3339 timestamp, and one log
//! per sensor.

pub mod api;
pub mod config;
pub mod database;
pub mod schema;
pub mod sensor;
pub mod sqlite_database;
pub mod store;
