use std::path::Path;

use log::{info, warn};

use crate::database::{Database, DatabaseError, READINGS, SERIAL_NAMES, UNKNOWN_NAME};
use crate::sensor::{ReadingBatch, ReadingLog, SensorReading, SerialNames};
use crate::store::Store;

/// Readings database kept in one SQLite file.
///
/// Holds three families of buckets: `serialNames` (serial to name),
/// `readings` (timestamp to batch) and one bucket per serial number
/// (timestamp to single reading).
#[derive(Clone)]
pub struct SqliteDatabase {
    store: Store,
}

impl SqliteDatabase {
    /// Opens or creates the database at `path` and makes sure the
    /// directory and global log buckets exist.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let store = Store::open(path)?;
        store.update(|tx| {
            tx.create_bucket_if_not_exists(SERIAL_NAMES)?;
            tx.create_bucket_if_not_exists(READINGS)
        })?;

        info!("Database {} ready", path.display());
        Ok(SqliteDatabase { store })
    }
}

impl Database for SqliteDatabase {
    fn serial_names(&self) -> Result<SerialNames, DatabaseError> {
        let found = self.store.view(|tx| tx.scan(SERIAL_NAMES))?;
        Ok(found
            .into_iter()
            .map(|entry| (entry.key, String::from_utf8_lossy(&entry.value).into_owned()))
            .collect())
    }

    fn missing_serials(&self, serials: &[String]) -> Result<Vec<String>, DatabaseError> {
        self.store.view(|tx| {
            let mut missing = Vec::new();
            for serial in serials {
                if tx.get(SERIAL_NAMES, serial)?.is_none() {
                    missing.push(serial.clone());
                }
            }
            Ok(missing)
        })
    }

    fn readings_between(&self, start: &str, end: &str) -> Result<ReadingLog, DatabaseError> {
        let found = self.store.view(|tx| tx.range(READINGS, start, end))?;

        let mut readings = ReadingLog::new();
        for entry in found {
            match serde_json::from_slice::<ReadingBatch>(&entry.value) {
                Ok(batch) => {
                    readings.insert(entry.key, batch);
                }
                Err(err) => warn!(
                    "Problem decoding {}: {}",
                    String::from_utf8_lossy(&entry.value),
                    err
                ),
            }
        }
        Ok(readings)
    }

    fn add_readings(&self, timestamp: &str, readings: &[SensorReading]) -> Result<(), DatabaseError> {
        self.store.update(|tx| {
            for reading in readings {
                info!("{} {:.2}", reading.serial, reading.temperature);

                // TODO: look names up from a configured source instead of resetting them
                tx.put(SERIAL_NAMES, &reading.serial, UNKNOWN_NAME.as_bytes())?;

                tx.create_bucket_if_not_exists(&reading.serial)?;
                let encoded = serde_json::to_vec(reading)?;
                tx.put(&reading.serial, timestamp, &encoded)?;
            }

            let encoded = serde_json::to_vec(readings)?;
            tx.put(READINGS, timestamp, &encoded)
        })
    }
}
