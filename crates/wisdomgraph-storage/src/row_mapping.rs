use super::*;
use wisdomgraph_api::LevelDto;

/// Columns of one `learning_map` row before the payload is decoded.
pub(super) struct RawMapRow {
    id: String,
    owner: String,
    payload: String,
    created_at: String,
    updated_at: String,
}

impl RawMapRow {
    pub(super) fn into_stored(self) -> Result<StoredMap, StorageError> {
        Ok(StoredMap {
            id: self.id,
            owner: self.owner,
            record: serde_json::from_str(&self.payload)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub(super) fn raw_map_from_row(row: &Row) -> rusqlite::Result<RawMapRow> {
    Ok(RawMapRow {
        id: row.get(0)?,
        owner: row.get(1)?,
        payload: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub(super) fn map_from_row(row: &Row) -> Result<StoredMap, StorageError> {
    raw_map_from_row(row)?.into_stored()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

pub(super) fn level_db_value(level: LevelDto) -> &'static str {
    match level {
        LevelDto::Beginner => "Beginner",
        LevelDto::Intermediate => "Intermediate",
        LevelDto::Advanced => "Advanced",
    }
}
