//! Fetch, extract, normalize, persist: one favourites sync run.

mod error;
mod pipeline;

pub use error::{SyncError, SyncStage};
pub use pipeline::{SyncPipeline, SyncReport};
