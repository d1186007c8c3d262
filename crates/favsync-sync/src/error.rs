use std::fmt;

use favsync_db::DbError;
use favsync_scraper::ScraperError;
use thiserror::Error;

/// Position of a run in `Idle -> Fetching -> Extracting -> Normalizing ->
/// Persisting -> Done`. `Failed` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    Fetching,
    Extracting,
    Normalizing,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Idle => "idle",
            SyncStage::Fetching => "fetching",
            SyncStage::Extracting => "extracting",
            SyncStage::Normalizing => "normalizing",
            SyncStage::Persisting => "persisting",
            SyncStage::Done => "done",
            SyncStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] ScraperError),

    #[error("extraction failed: {0}")]
    Extract(#[source] ScraperError),

    #[error("persisting snapshot failed: {0}")]
    Persist(#[source] DbError),

    #[error("sync cancelled while {stage}")]
    Cancelled { stage: SyncStage },
}

impl SyncError {
    /// Stage the run was in when it failed.
    #[must_use]
    pub fn stage(&self) -> SyncStage {
        match self {
            SyncError::Fetch(_) => SyncStage::Fetching,
            SyncError::Extract(_) => SyncStage::Extracting,
            SyncError::Persist(_) => SyncStage::Persisting,
            SyncError::Cancelled { stage } => *stage,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled { .. })
    }
}
