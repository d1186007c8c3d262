use chrono::{TimeZone, Utc};

use super::*;

fn record(title: &str) -> FavoriteRecord {
    FavoriteRecord {
        title: title.to_string(),
        release_year: "1984".to_string(),
        image_url: format!("https://img.example/{title}.jpg"),
        page_url: format!("https://letterboxd.com/film/{title}/"),
        observed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn read_before_any_write_is_not_found() {
    let store = InMemorySnapshotStore::new();
    assert!(matches!(store.read().await, Err(DbError::NotFound)));
}

#[tokio::test]
async fn write_replaces_previous_snapshot_wholesale() {
    let store = InMemorySnapshotStore::new();
    let first = Snapshot::latest(vec![record("a"), record("b")], Utc::now());
    let second = Snapshot::latest(vec![record("c")], Utc::now());

    store.write(&first).await.expect("first write");
    store.write(&second).await.expect("second write");

    let stored = store.read().await.expect("read");
    assert_eq!(stored, second);
    assert_eq!(stored.record_count(), 1);
}

#[tokio::test]
async fn with_snapshot_seeds_the_store() {
    let seeded = Snapshot::latest(vec![record("a")], Utc::now());
    let store = InMemorySnapshotStore::with_snapshot(seeded.clone());
    assert_eq!(store.read().await.expect("read"), seeded);
}

#[test]
fn row_converts_into_snapshot() {
    let updated_at = Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap();
    let row = SnapshotRow {
        id: "latest".to_string(),
        records: Json(vec![record("a")]),
        updated_at,
    };

    let snapshot = Snapshot::from(row);
    assert_eq!(snapshot.id, "latest");
    assert_eq!(snapshot.records[0].title, "a");
    assert_eq!(snapshot.updated_at, updated_at);
}
