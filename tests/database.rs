//! Storage schema behaviour: directory, global log and per-sensor logs.

use std::thread;

use tempfile::{tempdir, TempDir};

use wort::database::{Database, DatabaseError, FIRST_KEY, LAST_KEY};
use wort::sensor::{ReadingBatch, SensorReading, SensorType};
use wort::sqlite_database::SqliteDatabase;

fn open_database() -> (TempDir, SqliteDatabase) {
    let dir = tempdir().unwrap();
    let db = SqliteDatabase::open(&dir.path().join("temperatures.db")).unwrap();
    (dir, db)
}

fn temperature(serial: &str, value: f64) -> SensorReading {
    SensorReading {
        serial: serial.to_string(),
        kind: SensorType::Temperature,
        temperature: value,
        humidity: None,
        count: None,
    }
}

fn humidity(serial: &str, value: f64, percent: i64) -> SensorReading {
    SensorReading {
        serial: serial.to_string(),
        kind: SensorType::Humidity,
        temperature: value,
        humidity: Some(percent),
        count: None,
    }
}

#[test]
fn batch_is_stored_in_every_log() {
    let (_dir, db) = open_database();
    let batch = vec![temperature("s1", 21.5), humidity("s2", 19.0, 40)];

    db.add_readings("2018-03-01T12:00:00Z", &batch).unwrap();

    let log = db.readings_between(FIRST_KEY, LAST_KEY).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log["2018-03-01T12:00:00Z"], batch);

    let names = db.serial_names().unwrap();
    assert_eq!(names.get("s1").map(String::as_str), Some("Unknown"));
    assert_eq!(names.get("s2").map(String::as_str), Some("Unknown"));
}

#[test]
fn range_bounds_are_inclusive() {
    let (_dir, db) = open_database();
    for (key, value) in [
        ("2018-03-01T11:59:59Z", 1.0),
        ("2018-03-01T12:00:00Z", 2.0),
        ("2018-03-01T12:00:30Z", 3.0),
        ("2018-03-01T12:01:00Z", 4.0),
        ("2018-03-01T12:01:01Z", 5.0),
    ] {
        db.add_readings(key, &[temperature("s1", value)]).unwrap();
    }

    let log = db
        .readings_between("2018-03-01T12:00:00Z", "2018-03-01T12:01:00Z")
        .unwrap();
    let keys: Vec<&str> = log.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["2018-03-01T12:00:00Z", "2018-03-01T12:00:30Z", "2018-03-01T12:01:00Z"]
    );

    let reversed = db
        .readings_between("2018-03-01T12:01:00Z", "2018-03-01T12:00:00Z")
        .unwrap();
    assert!(reversed.is_empty());
}

#[test]
fn same_timestamp_overwrites_earlier_batch() {
    let (_dir, db) = open_database();
    let first = vec![temperature("s1", 20.0)];
    let second = vec![temperature("s2", 25.0)];

    db.add_readings("2018-03-01T12:00:00Z", &first).unwrap();
    db.add_readings("2018-03-01T12:00:00Z", &second).unwrap();

    let log = db.readings_between(FIRST_KEY, LAST_KEY).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log["2018-03-01T12:00:00Z"], second);

    // The earlier batch is gone from the global log but its per-sensor entry stays.
    let names = db.serial_names().unwrap();
    assert!(names.contains_key("s1"));
    assert!(names.contains_key("s2"));
}

#[test]
fn empty_serial_aborts_whole_batch() {
    let (_dir, db) = open_database();
    let batch = vec![temperature("s1", 20.0), temperature("", 21.0)];

    let result = db.add_readings("2018-03-01T12:00:00Z", &batch);
    assert!(matches!(result, Err(DatabaseError::BucketNameRequired)));

    assert!(db.serial_names().unwrap().is_empty());
    assert!(db.readings_between(FIRST_KEY, LAST_KEY).unwrap().is_empty());
}

#[test]
fn empty_batch_is_recorded() {
    let (_dir, db) = open_database();
    db.add_readings("2018-03-01T12:00:00Z", &[]).unwrap();

    let log = db.readings_between(FIRST_KEY, LAST_KEY).unwrap();
    assert_eq!(log["2018-03-01T12:00:00Z"], ReadingBatch::new());
}

#[test]
fn missing_serials_keep_input_order() {
    let (_dir, db) = open_database();
    db.add_readings("2018-03-01T12:00:00Z", &[temperature("s1", 20.0)]).unwrap();

    let requested = vec!["x".to_string(), "s1".to_string(), "".to_string()];
    assert_eq!(db.missing_serials(&requested).unwrap(), vec!["x", ""]);
}

#[test]
fn concurrent_writers_are_serialized() {
    let (_dir, db) = open_database();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = db.clone();
            thread::spawn(move || {
                let key = format!("2018-03-01T12:00:0{}Z", i);
                db.add_readings(&key, &[temperature(&format!("s{}", i), f64::from(i))])
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(db.readings_between(FIRST_KEY, LAST_KEY).unwrap().len(), 4);
    assert_eq!(db.serial_names().unwrap().len(), 4);
}

#[test]
fn reopen_keeps_readings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("temperatures.db");
    {
        let db = SqliteDatabase::open(&path).unwrap();
        db.add_readings("2018-03-01T12:00:00Z", &[temperature("s1", 20.0)]).unwrap();
    }

    let db = SqliteDatabase::open(&path).unwrap();
    assert_eq!(db.readings_between(FIRST_KEY, LAST_KEY).unwrap().len(), 1);
    assert!(db.serial_names().unwrap().contains_key("s1"));
}
