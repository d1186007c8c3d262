use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use favsync_core::{AppConfig, FavoriteRecord, Snapshot};
use favsync_db::SnapshotStore;
use favsync_scraper::{
    normalize, FavoriteExtractor, FetchSettings, ImageNormalizer, PageFetcher, Renderer,
    ScraperError,
};
use tokio_util::sync::CancellationToken;

use crate::{SyncError, SyncStage};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Orchestrates one sync per call. Runs are independent; nothing is retried.
pub struct SyncPipeline {
    fetcher: PageFetcher,
    extractor: FavoriteExtractor,
    normalizer: ImageNormalizer,
    store: Arc<dyn SnapshotStore>,
    username: String,
}

impl SyncPipeline {
    #[must_use]
    pub fn new(
        fetcher: PageFetcher,
        extractor: FavoriteExtractor,
        normalizer: ImageNormalizer,
        store: Arc<dyn SnapshotStore>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            normalizer,
            store,
            username: username.into(),
        }
    }

    #[must_use]
    pub fn from_app_config(
        config: &AppConfig,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self::new(
            PageFetcher::new(renderer, FetchSettings::from_app_config(config)),
            FavoriteExtractor::new(config.site_origin.clone()),
            ImageNormalizer::new(config.image_width, config.image_height),
            store,
            config.username.clone(),
        )
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Fetches, extracts, and normalizes without touching the store.
    ///
    /// # Errors
    ///
    /// [`SyncError::Fetch`], [`SyncError::Extract`], or
    /// [`SyncError::Cancelled`] if `cancel` fires first.
    pub async fn extract(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<FavoriteRecord>, SyncError> {
        tracing::debug!(username = %self.username, stage = %SyncStage::Fetching, "sync stage");
        let html = self
            .fetcher
            .fetch(&self.username, cancel)
            .await
            .map_err(|e| match e {
                ScraperError::Cancelled => SyncError::Cancelled {
                    stage: SyncStage::Fetching,
                },
                other => SyncError::Fetch(other),
            })?;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled {
                stage: SyncStage::Extracting,
            });
        }
        tracing::debug!(stage = %SyncStage::Extracting, bytes = html.len(), "sync stage");
        let mut records = self
            .extractor
            .extract(&html, Utc::now())
            .map_err(SyncError::Extract)?;

        tracing::debug!(stage = %SyncStage::Normalizing, records = records.len(), "sync stage");
        self.normalizer.normalize_records(&mut records);
        let unsized_images = records
            .iter()
            .filter(|r| !r.image_url.is_empty() && normalize::dimensions(&r.image_url).is_none())
            .count();
        if unsized_images > 0 {
            tracing::warn!(
                unsized_images,
                "poster urls without a size segment were left at their original size"
            );
        }

        Ok(records)
    }

    /// Runs the full pipeline and replaces the stored snapshot.
    ///
    /// On any error the previously stored snapshot is left as it was.
    ///
    /// # Errors
    ///
    /// Any error from [`SyncPipeline::extract`], [`SyncError::Persist`] if the
    /// write fails, or [`SyncError::Cancelled`] if `cancel` fires before the
    /// write is issued. A write already in flight is not abandoned.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        tracing::info!(username = %self.username, "sync started");
        let result = self.run_stages(cancel).await;
        match &result {
            Ok(report) => tracing::info!(
                stage = %SyncStage::Done,
                count = report.count,
                updated_at = %report.updated_at,
                "sync finished"
            ),
            Err(e) => tracing::error!(
                stage = %SyncStage::Failed,
                failed_in = %e.stage(),
                error = %e,
                "sync failed"
            ),
        }
        result
    }

    async fn run_stages(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let records = self.extract(cancel).await?;

        tracing::debug!(stage = %SyncStage::Persisting, records = records.len(), "sync stage");
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled {
                stage: SyncStage::Persisting,
            });
        }
        // The write is one atomic statement; once issued it runs to completion
        // so the reported outcome matches what the store holds.
        let snapshot = Snapshot::latest(records, Utc::now());
        self.store
            .write(&snapshot)
            .await
            .map_err(SyncError::Persist)?;

        Ok(SyncReport {
            count: snapshot.record_count(),
            updated_at: snapshot.updated_at,
        })
    }

    /// [`SyncPipeline::run`] bounded by `deadline`; also stops when `parent`
    /// is cancelled.
    ///
    /// # Errors
    ///
    /// As [`SyncPipeline::run`]; a missed deadline surfaces as
    /// [`SyncError::Cancelled`].
    pub async fn run_with_deadline(
        &self,
        parent: &CancellationToken,
        deadline: Duration,
    ) -> Result<SyncReport, SyncError> {
        within_deadline(parent, deadline, |cancel| async move { self.run(&cancel).await }).await
    }

    /// [`SyncPipeline::extract`] bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// As [`SyncPipeline::extract`].
    pub async fn extract_with_deadline(
        &self,
        parent: &CancellationToken,
        deadline: Duration,
    ) -> Result<Vec<FavoriteRecord>, SyncError> {
        within_deadline(parent, deadline, |cancel| async move {
            self.extract(&cancel).await
        })
        .await
    }
}

/// Runs `op` with a child of `parent` that is cancelled once `deadline`
/// elapses, then waits for `op` to unwind so its resources are released.
async fn within_deadline<T, F, Fut>(
    parent: &CancellationToken,
    deadline: Duration,
    op: F,
) -> Result<T, SyncError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let cancel = parent.child_token();
    let fut = op(cancel.clone());
    tokio::pin!(fut);

    tokio::select! {
        result = &mut fut => result,
        () = tokio::time::sleep(deadline) => {
            tracing::warn!(?deadline, "sync deadline elapsed; cancelling");
            cancel.cancel();
            fut.await
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
