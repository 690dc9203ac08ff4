//! Rapport Storage Layer
//!
//! Implements the FriendshipStore trait on top of SQLite.
//!
//! # Architecture
//!
//! - One `friendships` table holding directed records
//! - Indexed lookup by (owner, peer) and by (owner, status)
//! - `BEGIN IMMEDIATE` transactions, so concurrent writers queue on the
//!   write lock instead of deadlocking on a read-to-write upgrade
//!
//! # Examples
//!
//! ```no_run
//! use rapport_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for friendship operations
//! ```

#![warn(missing_docs)]

use rapport_domain::{
    ActorId, Friendship, FriendshipId, FriendshipStatus, FriendshipStore, FriendshipUpdate,
    NewFriendship, StatusFilter,
};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Friendship not found: {0}")]
    NotFound(FriendshipId),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

const COLUMNS: &str =
    "id, owner_id, peer_id, status, blocker_id, suggester_id, created_at, updated_at";

/// Current timestamp in seconds since Unix epoch
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// SQLite-based implementation of FriendshipStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should open its own
/// SqliteStore on the same database file; the write lock taken by
/// [`FriendshipStore::transaction`] serializes them.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a database shared with other connections
    ///
    /// The busy timeout is installed before the schema is created, so
    /// connections opened concurrently on one file wait for each other.
    pub fn open_shared<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create a store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Set how long a writer waits for the database lock before failing
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self, StoreError> {
        self.conn.busy_timeout(timeout)?;
        Ok(self)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Total number of records, in any state
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM friendships", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Convert ActorId to bytes for storage
    fn actor_id_to_bytes(id: ActorId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to ActorId
    fn bytes_to_actor_id(bytes: &[u8]) -> Result<ActorId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for ActorId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(ActorId::from_value(u128::from_be_bytes(arr)))
    }

    fn actor_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ActorId> {
        let bytes: Vec<u8> = row.get(idx)?;
        Self::bytes_to_actor_id(&bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
        })
    }

    fn optional_actor_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<ActorId>> {
        let bytes: Option<Vec<u8>> = row.get(idx)?;
        bytes
            .map(|b| {
                Self::bytes_to_actor_id(&b).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        idx,
                        rusqlite::types::Type::Blob,
                        Box::new(e),
                    )
                })
            })
            .transpose()
    }

    /// Map a row selected with [`COLUMNS`] into a Friendship
    fn row_to_friendship(row: &Row<'_>) -> rusqlite::Result<Friendship> {
        let status_str: String = row.get(3)?;
        let status = FriendshipStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidData(format!(
                    "Unknown friendship status: {}",
                    status_str
                ))),
            )
        })?;

        Ok(Friendship {
            id: FriendshipId::from_value(row.get(0)?),
            owner: Self::actor_column(row, 1)?,
            peer: Self::actor_column(row, 2)?,
            status,
            blocker: Self::optional_actor_column(row, 4)?,
            suggester: Self::optional_actor_column(row, 5)?,
            created_at: row.get::<_, i64>(6)? as u64,
            updated_at: row.get::<_, i64>(7)? as u64,
        })
    }

    /// Append a status predicate for `filter`, returning false when nothing can match
    fn push_status_filter(
        sql: &mut String,
        params: &mut Vec<Box<dyn ToSql>>,
        filter: &StatusFilter,
    ) -> bool {
        if *filter == StatusFilter::Any {
            return true;
        }
        let statuses = filter.statuses();
        if statuses.is_empty() {
            return false;
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        sql.push_str(&format!(" AND status IN ({})", placeholders));
        for status in statuses {
            params.push(Box::new(status.as_str()));
        }
        true
    }

    fn query_friendships(
        &self,
        sql: &str,
        params: &[Box<dyn ToSql>],
    ) -> Result<Vec<Friendship>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let friendships = stmt
            .query_map(&param_refs[..], Self::row_to_friendship)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(friendships)
    }
}

impl FriendshipStore for SqliteStore {
    type Error = StoreError;

    fn create(&mut self, friendship: NewFriendship) -> Result<FriendshipId, Self::Error> {
        let now = current_timestamp() as i64;
        self.conn.execute(
            "INSERT INTO friendships (owner_id, peer_id, status, blocker_id, suggester_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                Self::actor_id_to_bytes(friendship.owner),
                Self::actor_id_to_bytes(friendship.peer),
                friendship.status.as_str(),
                friendship.blocker.map(Self::actor_id_to_bytes),
                friendship.suggester.map(Self::actor_id_to_bytes),
                now,
            ],
        )?;

        Ok(FriendshipId::from_value(self.conn.last_insert_rowid()))
    }

    fn find(
        &self,
        owner: ActorId,
        peer: ActorId,
        filter: &StatusFilter,
    ) -> Result<Option<Friendship>, Self::Error> {
        let mut sql = format!(
            "SELECT {} FROM friendships WHERE owner_id = ? AND peer_id = ?",
            COLUMNS
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![
            Box::new(Self::actor_id_to_bytes(owner)),
            Box::new(Self::actor_id_to_bytes(peer)),
        ];
        if !Self::push_status_filter(&mut sql, &mut params, filter) {
            return Ok(None);
        }
        sql.push_str(" ORDER BY id LIMIT 1");

        Ok(self.query_friendships(&sql, &params)?.into_iter().next())
    }

    fn find_any(&self, a: ActorId, b: ActorId) -> Result<Option<Friendship>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM friendships
             WHERE (owner_id = ?1 AND peer_id = ?2) OR (owner_id = ?2 AND peer_id = ?1)
             ORDER BY id LIMIT 1",
            COLUMNS
        );
        let friendship = self
            .conn
            .query_row(
                &sql,
                params![Self::actor_id_to_bytes(a), Self::actor_id_to_bytes(b)],
                Self::row_to_friendship,
            )
            .optional()?;
        Ok(friendship)
    }

    fn update(&mut self, id: FriendshipId, update: FriendshipUpdate) -> Result<(), Self::Error> {
        let mut sql = String::from("UPDATE friendships SET updated_at = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(current_timestamp() as i64)];

        if let Some(status) = update.status {
            sql.push_str(", status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(blocker) = update.blocker {
            sql.push_str(", blocker_id = ?");
            params.push(Box::new(blocker.map(Self::actor_id_to_bytes)));
        }
        sql.push_str(" WHERE id = ?");
        params.push(Box::new(id.value()));

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let changed = self.conn.execute(&sql, &param_refs[..])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&mut self, id: FriendshipId) -> Result<(), Self::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM friendships WHERE id = ?1", params![id.value()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn list(&self, owner: ActorId, filter: &StatusFilter) -> Result<Vec<Friendship>, Self::Error> {
        let mut sql = format!("SELECT {} FROM friendships WHERE owner_id = ?", COLUMNS);
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(Self::actor_id_to_bytes(owner))];
        if !Self::push_status_filter(&mut sql, &mut params, filter) {
            return Ok(Vec::new());
        }
        sql.push_str(" ORDER BY id");

        self.query_friendships(&sql, &params)
    }

    fn list_involving(&self, actor: ActorId) -> Result<Vec<Friendship>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM friendships WHERE owner_id = ?1 OR peer_id = ?1 ORDER BY id",
            COLUMNS
        );
        let params: Vec<Box<dyn ToSql>> = vec![Box::new(Self::actor_id_to_bytes(actor))];
        self.query_friendships(&sql, &params)
    }

    fn transaction<T, F>(&mut self, body: F) -> Result<T, Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Self::Error>,
    {
        // Already inside a transaction: join it
        if !self.conn.is_autocommit() {
            return body(self);
        }

        self.conn.execute_batch("BEGIN IMMEDIATE")?;

        // A panicking body must not leave the connection inside the
        // transaction, or every later call would join it and never commit
        let outcome = match catch_unwind(AssertUnwindSafe(|| body(&mut *self))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                self.rollback();
                resume_unwind(panic);
            }
        };

        match outcome {
            Ok(value) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.rollback();
                    Err(e.into())
                }
            },
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
}

impl SqliteStore {
    fn rollback(&self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!("Rollback failed: {}", e);
        }
    }
}
