use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use favsync_core::FavoriteRecord;
use favsync_db::DbError;
use favsync_scraper::ScraperError;
use favsync_sync::SyncError;
use serde::Serialize;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct StoredFavourites {
    records: Vec<FavoriteRecord>,
    count: usize,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct LiveFavourites {
    records: Vec<FavoriteRecord>,
    count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncResult {
    message: &'static str,
    count: usize,
    updated_at: DateTime<Utc>,
}

/// `GET /favourites`: the last persisted snapshot, or an empty result if no
/// sync has succeeded yet.
pub(super) async fn list_favourites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let data = match state.pipeline.store().read().await {
        Ok(snapshot) => StoredFavourites {
            count: snapshot.record_count(),
            updated_at: Some(snapshot.updated_at),
            records: snapshot.records,
        },
        Err(DbError::NotFound) => StoredFavourites {
            records: Vec::new(),
            count: 0,
            updated_at: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to read snapshot");
            return Err(ApiError::new(
                req_id.0,
                "store_unavailable",
                "snapshot store unavailable",
            ));
        }
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /favourites/live`: fetch and extract now, without persisting.
pub(super) async fn live_favourites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .pipeline
        .extract_with_deadline(&state.shutdown, state.sync_deadline)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: LiveFavourites {
            count: records.len(),
            records,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /favourites`: run the full sync and replace the stored snapshot.
pub(super) async fn sync_favourites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .pipeline
        .run_with_deadline(&state.shutdown, state.sync_deadline)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SyncResult {
                message: "favourites synced",
                count: report.count,
                updated_at: report.updated_at,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    let (code, message) = match error {
        SyncError::Cancelled { .. } => ("sync_cancelled", "sync did not finish in time"),
        SyncError::Fetch(e) | SyncError::Extract(e) => scraper_code(e),
        SyncError::Persist(DbError::Connect(_)) => {
            ("store_unavailable", "snapshot store unavailable")
        }
        SyncError::Persist(DbError::Write(_)) => {
            ("store_write_failed", "failed to persist snapshot")
        }
        SyncError::Persist(_) => ("internal_error", "failed to persist snapshot"),
    };
    tracing::warn!(error = %error, stage = %error.stage(), code, "sync request failed");
    ApiError::new(request_id, code, message)
}

fn scraper_code(error: &ScraperError) -> (&'static str, &'static str) {
    match error {
        ScraperError::PageLoadTimeout { .. } => {
            ("page_load_timeout", "profile page did not render in time")
        }
        ScraperError::Navigation { .. } => ("fetch_failed", "failed to load profile page"),
        ScraperError::RenderEnvironment { .. } => {
            ("render_unavailable", "rendering environment unavailable")
        }
        ScraperError::Parse { .. } => ("parse_failed", "unexpected profile page structure"),
        ScraperError::NoFavoritesExtracted => ("no_favourites", "no favourites found on page"),
        ScraperError::Cancelled => ("sync_cancelled", "sync did not finish in time"),
    }
}
