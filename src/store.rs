//! Ordered key-value buckets kept in a single SQLite file.
//!
//! Each bucket is an independently ordered collection of string keys and byte
//! values. Keys use the BINARY collation, so every scan walks keys in bytewise
//! (lexical) order.

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use crate::database::DatabaseError;
use crate::schema::{buckets, entries, AddBucketDTO, AddEntryDTO, EntryDTO};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/");

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// How long a writer waits for the current writer to commit.
const BUSY_TIMEOUT_MS: u32 = 30_000;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            BUSY_TIMEOUT_MS
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Opens the file at `path`, creating it and its tables when missing.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let url = path.to_string_lossy().into_owned();
        {
            let mut conn = SqliteConnection::establish(&url)?;
            conn.batch_execute("PRAGMA journal_mode = WAL;")?;
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|err| DatabaseError::Migration(err.to_string()))?;
            if !applied.is_empty() {
                info!("Applied {} migration(s) to {}", applied.len(), url);
            }
        }

        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionOptions))
            .build(ConnectionManager::<SqliteConnection>::new(url))?;

        Ok(Store { pool })
    }

    /// Runs `op` in a read-only transaction over a consistent snapshot.
    pub fn view<R, F>(&self, op: F) -> Result<R, DatabaseError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, DatabaseError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction(|conn| op(&mut Transaction { conn, writable: false }))
    }

    /// Runs `op` in an exclusive read-write transaction.
    ///
    /// The transaction commits when `op` returns `Ok` and rolls back when it
    /// returns `Err`. If `op` unwinds, the connection is dropped from the pool
    /// with the transaction still open, which rolls it back.
    pub fn update<R, F>(&self, op: F) -> Result<R, DatabaseError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, DatabaseError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.immediate_transaction(|conn| op(&mut Transaction { conn, writable: true }))
    }
}

/// Handle passed to the operation of [`Store::view`] or [`Store::update`].
pub struct Transaction<'a> {
    conn: &'a mut SqliteConnection,
    writable: bool,
}

impl<'a> Transaction<'a> {
    pub fn bucket_exists(&mut self, name: &str) -> Result<bool, DatabaseError> {
        let found = buckets::table
            .find(name)
            .select(buckets::name)
            .first::<String>(self.conn())
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_bucket_if_not_exists(&mut self, name: &str) -> Result<(), DatabaseError> {
        self.ensure_writable()?;
        if name.is_empty() {
            return Err(DatabaseError::BucketNameRequired);
        }

        diesel::insert_or_ignore_into(buckets::table)
            .values(AddBucketDTO { name })
            .execute(self.conn())?;
        Ok(())
    }

    pub fn get(&mut self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.require_bucket(bucket)?;
        let value = entries::table
            .find((bucket, key))
            .select(entries::value)
            .first::<Vec<u8>>(self.conn())
            .optional()?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&mut self, bucket: &str, key: &str, value: &[u8]) -> Result<(), DatabaseError> {
        self.ensure_writable()?;
        self.require_bucket(bucket)?;

        diesel::replace_into(entries::table)
            .values(AddEntryDTO { bucket, key, value })
            .execute(self.conn())?;
        Ok(())
    }

    /// Every pair in `bucket`, in key order.
    pub fn scan(&mut self, bucket: &str) -> Result<Vec<EntryDTO>, DatabaseError> {
        self.require_bucket(bucket)?;
        let found = entries::table
            .filter(entries::bucket.eq(bucket))
            .order(entries::key.asc())
            .select((entries::key, entries::value))
            .load::<EntryDTO>(self.conn())?;
        Ok(found)
    }

    /// Pairs with `start <= key <= end`, in key order. Empty when `start > end`.
    pub fn range(&mut self, bucket: &str, start: &str, end: &str) -> Result<Vec<EntryDTO>, DatabaseError> {
        self.require_bucket(bucket)?;
        let found = entries::table
            .filter(entries::bucket.eq(bucket))
            .filter(entries::key.ge(start))
            .filter(entries::key.le(end))
            .order(entries::key.asc())
            .select((entries::key, entries::value))
            .load::<EntryDTO>(self.conn())?;
        Ok(found)
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        self.conn
    }

    fn ensure_writable(&self) -> Result<(), DatabaseError> {
        if self.writable {
            Ok(())
        } else {
            Err(DatabaseError::TxNotWritable)
        }
    }

    fn require_bucket(&mut self, name: &str) -> Result<(), DatabaseError> {
        if self.bucket_exists(name)? {
            Ok(())
        } else {
            Err(DatabaseError::BucketNotFound(name.to_string()))
        }
    }
}
