use super::*;
use wisdomgraph_api::{EdgeRecord, LevelDto, NodeRecord, PositionDto};

fn record(topic: &str) -> MapRecord {
    MapRecord {
        topic: topic.to_string(),
        level: LevelDto::Beginner,
        nodes: vec![
            NodeRecord {
                id: "root".to_string(),
                label: topic.to_string(),
                description: Some("Where it all starts".to_string()),
                resources: vec![],
                position: Some(PositionDto { x: 0.0, y: 0.0 }),
            },
            NodeRecord {
                id: "child".to_string(),
                label: "Child".to_string(),
                description: None,
                resources: vec!["https://example.org".to_string()],
                position: Some(PositionDto { x: 0.0, y: 116.0 }),
            },
        ],
        edges: vec![EdgeRecord {
            id: "e-root-child".to_string(),
            source: "root".to_string(),
            target: "child".to_string(),
        }],
        exported_at: None,
    }
}

#[test]
fn test_create_and_get_round_trip() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let id = storage.create("alice", &record("Gardening"))?;

    let stored = storage.get("alice", &id)?.expect("map should exist");
    assert_eq!(stored.id, id);
    assert_eq!(stored.owner, "alice");
    assert_eq!(stored.record, record("Gardening"));
    assert_eq!(stored.created_at, stored.updated_at);
    Ok(())
}

#[test]
fn test_maps_are_scoped_to_owner() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let id = storage.create("alice", &record("Gardening"))?;

    assert!(storage.get("bob", &id)?.is_none());
    assert!(storage.list("bob")?.is_empty());
    assert!(matches!(
        storage.delete("bob", &id),
        Err(StorageError::NotFound(_))
    ));
    assert_eq!(storage.count("alice")?, 1);
    Ok(())
}

#[test]
fn test_list_is_newest_first() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    storage.create("alice", &record("First"))?;
    storage.create("alice", &record("Second"))?;
    storage.create("alice", &record("Third"))?;

    let topics: Vec<String> = storage
        .list("alice")?
        .into_iter()
        .map(|m| m.record.topic)
        .collect();
    assert_eq!(topics, vec!["Third", "Second", "First"]);
    Ok(())
}

#[test]
fn test_list_is_capped() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    for i in 0..(LIST_LIMIT + 5) {
        storage.create("alice", &record(&format!("Topic {i}")))?;
    }
    assert_eq!(storage.list("alice")?.len(), LIST_LIMIT);
    assert_eq!(storage.count("alice")?, LIST_LIMIT + 5);
    Ok(())
}

#[test]
fn test_delete_removes_map() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let id = storage.create("alice", &record("Gardening"))?;
    storage.delete("alice", &id)?;
    assert!(storage.get("alice", &id)?.is_none());
    assert!(matches!(
        storage.delete("alice", &id),
        Err(StorageError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_blank_owner_is_rejected() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    assert!(matches!(
        storage.create("  ", &record("Gardening")),
        Err(StorageError::MissingOwner)
    ));
    assert!(matches!(storage.list(""), Err(StorageError::MissingOwner)));
    Ok(())
}

#[test]
fn test_schema_version_is_recorded() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let version: i64 = storage
        .conn
        .lock()
        .query_row("PRAGMA user_version", [], |row| row.get(0))?;
    assert_eq!(version, SCHEMA_VERSION as i64);
    Ok(())
}

#[test]
fn test_file_backed_store_persists_across_reopen() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("maps.db");

    let id = Storage::open(&path)?.create("alice", &record("Gardening"))?;
    let reopened = Storage::open(&path)?;
    let stored = reopened.get("alice", &id)?.expect("map should persist");
    assert_eq!(stored.record.topic, "Gardening");
    Ok(())
}

#[test]
fn test_count_trims_owner_like_other_operations() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    storage.create(" alice ", &record("Gardening"))?;
    storage.create("alice", &record("Botany"))?;

    assert_eq!(storage.count("alice")?, 2);
    assert_eq!(storage.count("  alice\t")?, 2);
    assert!(matches!(storage.count(" "), Err(StorageError::MissingOwner)));
    Ok(())
}

#[test]
fn test_storage_errors_map_to_api_codes() {
    let not_found = ApiError::from(StorageError::NotFound("abc".into()));
    assert_eq!(not_found.code, "not_found");
    assert!(not_found.message.contains("abc"));
    assert_eq!(
        ApiError::from(StorageError::MissingOwner).code,
        "invalid_argument"
    );
    assert_eq!(
        ApiError::from(StorageError::Other("disk full".into())).code,
        "internal"
    );
}
