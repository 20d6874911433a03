use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use wisdomgraph_api::{ApiError, MapRecord};

mod row_mapping;
mod schema;

const SCHEMA_VERSION: u32 = 1;
/// Upper bound on maps returned by one listing.
pub const LIST_LIMIT: usize = 100;
const MAP_SELECT_BASE: &str =
    "SELECT id, owner, payload, created_at, updated_at FROM learning_map";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid stored record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Learning map not found: {0}")]
    NotFound(String),
    #[error("An owner identity is required")]
    MissingOwner,
    #[error("Other error: {0}")]
    Other(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::NotFound(_) => ApiError::not_found(message),
            StorageError::MissingOwner => ApiError::invalid_argument(message),
            _ => ApiError::internal(message),
        }
    }
}

/// A learning map saved under an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMap {
    pub id: String,
    pub owner: String,
    pub record: MapRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/read/list/delete of named maps scoped to an owner. Callers are
/// expected to have authenticated `owner` already.
pub trait MapStore: Send + Sync {
    fn create(&self, owner: &str, record: &MapRecord) -> Result<String, StorageError>;
    /// Newest first, at most [`LIST_LIMIT`] entries.
    fn list(&self, owner: &str) -> Result<Vec<StoredMap>, StorageError>;
    fn get(&self, owner: &str, id: &str) -> Result<Option<StoredMap>, StorageError>;
    /// Total maps held for `owner`, including those past the listing cap.
    fn count(&self, owner: &str) -> Result<usize, StorageError>;
    /// Fails with `NotFound` when the map does not exist or belongs to someone else.
    fn delete(&self, owner: &str, id: &str) -> Result<(), StorageError>;
}

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let _ = conn.busy_timeout(Duration::from_millis(2_500));
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init()?;
        Ok(storage)
    }

    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init()?;
        Ok(storage)
    }

    fn init(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        schema::create_tables(&conn)?;
        schema::create_indexes(&conn)?;
        schema::apply_schema_migrations(&conn)
    }

    fn require_owner(owner: &str) -> Result<&str, StorageError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(StorageError::MissingOwner);
        }
        Ok(owner)
    }

    fn timestamp(value: DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn map_from_row(row: &Row) -> Result<StoredMap, StorageError> {
        row_mapping::map_from_row(row)
    }
}

impl MapStore for Storage {
    fn create(&self, owner: &str, record: &MapRecord) -> Result<String, StorageError> {
        let owner = Self::require_owner(owner)?;
        let id = Uuid::new_v4().to_string();
        let now = Self::timestamp(Utc::now());
        let payload = serde_json::to_string(record)?;

        self.conn.lock().execute(
            "INSERT INTO learning_map (id, owner, topic, level, payload, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                id,
                owner,
                record.topic,
                row_mapping::level_db_value(record.level),
                payload,
                now
            ],
        )?;

        tracing::info!(
            map_id = %id,
            owner = %owner,
            topic = %record.topic,
            node_count = record.nodes.len(),
            "learning map saved"
        );
        Ok(id)
    }

    fn list(&self, owner: &str) -> Result<Vec<StoredMap>, StorageError> {
        let owner = Self::require_owner(owner)?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{MAP_SELECT_BASE} WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let mut rows = stmt.query(params![owner, LIST_LIMIT as i64])?;
        let mut maps = Vec::new();
        while let Some(row) = rows.next()? {
            maps.push(Self::map_from_row(row)?);
        }
        Ok(maps)
    }

    fn get(&self, owner: &str, id: &str) -> Result<Option<StoredMap>, StorageError> {
        let owner = Self::require_owner(owner)?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{MAP_SELECT_BASE} WHERE id = ?1 AND owner = ?2"))?;
        let raw = stmt
            .query_row(params![id, owner], row_mapping::raw_map_from_row)
            .optional()?;
        raw.map(row_mapping::RawMapRow::into_stored).transpose()
    }

    fn count(&self, owner: &str) -> Result<usize, StorageError> {
        let owner = Self::require_owner(owner)?;
        let count: i64 = self.conn.lock().query_row(
            "SELECT count(*) FROM learning_map WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn delete(&self, owner: &str, id: &str) -> Result<(), StorageError> {
        let owner = Self::require_owner(owner)?;
        let deleted = self.conn.lock().execute(
            "DELETE FROM learning_map WHERE id = ?1 AND owner = ?2",
            params![id, owner],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        tracing::info!(map_id = %id, owner = %owner, "learning map deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
