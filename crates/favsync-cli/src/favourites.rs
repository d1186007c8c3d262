use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::ValueEnum;
use favsync_core::{AppConfig, FavoriteRecord};
use favsync_db::{DbError, InMemorySnapshotStore, PgSnapshotStore, SnapshotStore};
use favsync_scraper::{ChromiumRenderer, FavoriteExtractor, ImageNormalizer, Renderer};
use favsync_sync::SyncPipeline;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Text,
}

/// Extract favourites and print them. Nothing is written to the store.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    format: OutputFormat,
    html_file: Option<&Path>,
) -> anyhow::Result<()> {
    let records = match html_file {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            extract_from_html(config, &html)?
        }
        None => {
            let store: Arc<dyn SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
            let pipeline = SyncPipeline::from_app_config(config, chromium(config), store);
            let cancel = cancel_on_ctrl_c();
            pipeline
                .extract_with_deadline(&cancel, Duration::from_secs(config.sync_deadline_secs))
                .await?
        }
    };

    println!("{}", render_records(&records, format)?);
    Ok(())
}

/// Run a full sync against the configured database.
pub(crate) async fn run_sync(config: &AppConfig) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    favsync_db::run_migrations(&pool).await?;

    let store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(pool));
    let pipeline = SyncPipeline::from_app_config(config, chromium(config), store);
    let cancel = cancel_on_ctrl_c();
    let report = pipeline
        .run_with_deadline(&cancel, Duration::from_secs(config.sync_deadline_secs))
        .await?;

    println!(
        "synced {} favourite(s) for {} at {}",
        report.count,
        pipeline.username(),
        report.updated_at.to_rfc3339()
    );
    Ok(())
}

/// Print the stored snapshot.
pub(crate) async fn run_show(config: &AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let store = PgSnapshotStore::new(pool);

    match store.read().await {
        Ok(snapshot) => {
            if format == OutputFormat::Text {
                println!(
                    "{} favourite(s), updated {}",
                    snapshot.record_count(),
                    snapshot.updated_at.to_rfc3339()
                );
            }
            println!("{}", render_records(&snapshot.records, format)?);
        }
        Err(DbError::NotFound) => println!("no snapshot stored yet; run `favsync-cli sync`"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) fn extract_from_html(
    config: &AppConfig,
    html: &str,
) -> anyhow::Result<Vec<FavoriteRecord>> {
    let mut records = FavoriteExtractor::new(config.site_origin.clone()).extract(html, Utc::now())?;
    ImageNormalizer::new(config.image_width, config.image_height).normalize_records(&mut records);
    Ok(records)
}

pub(crate) fn render_records(
    records: &[FavoriteRecord],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for (idx, record) in records.iter().enumerate() {
                let year = if record.release_year.is_empty() {
                    "?"
                } else {
                    record.release_year.as_str()
                };
                writeln!(out, "{:>3}. {} ({year})", idx + 1, record.title)?;
                writeln!(out, "     page:  {}", record.page_url)?;
                writeln!(out, "     image: {}", record.image_url)?;
            }
            Ok(out.trim_end().to_string())
        }
    }
}

fn chromium(config: &AppConfig) -> Arc<dyn Renderer> {
    Arc::new(ChromiumRenderer::new(config.chrome_path.clone()))
}

/// Token cancelled on ctrl-c so an interrupted run still closes its browser.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling sync");
            on_signal.cancel();
        }
    });
    cancel
}
