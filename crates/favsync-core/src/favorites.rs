use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical key of the one snapshot document a deployment maintains.
pub const SNAPSHOT_ID: &str = "latest";

/// One favourited title as rendered on the profile page.
///
/// Missing source attributes become empty strings; a record is never dropped
/// because one of its fields is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub title: String,
    /// Kept as text; the site renders placeholders for unreleased titles.
    #[serde(rename = "releaseYear")]
    pub release_year: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Site origin concatenated with the poster's relative link, unvalidated.
    #[serde(rename = "pageURL")]
    pub page_url: String,
    #[serde(rename = "observedAt")]
    pub observed_at: DateTime<Utc>,
}

/// The persisted aggregate: every record from the last successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    /// Extraction order, top to bottom as rendered.
    pub records: Vec<FavoriteRecord>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Builds the snapshot stored under [`SNAPSHOT_ID`].
    #[must_use]
    pub fn latest(records: Vec<FavoriteRecord>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: SNAPSHOT_ID.to_string(),
            records,
            updated_at,
        }
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
#[path = "favorites_test.rs"]
mod tests;
