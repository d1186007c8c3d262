mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use favsync_auth::TokenAuthenticator;
use favsync_db::{PgSnapshotStore, SnapshotStore};
use favsync_scraper::{ChromiumRenderer, Renderer};
use favsync_sync::SyncPipeline;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(favsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, username = %config.username, "starting favsync server");

    let pool_config = favsync_db::PoolConfig::from_app_config(&config);
    let pool = favsync_db::connect_pool(config.require_database_url()?, pool_config).await?;
    favsync_db::run_migrations(&pool).await?;

    let authenticator = TokenAuthenticator::new(config.require_jwt_secret()?, &config.username);

    let renderer: Arc<dyn Renderer> = Arc::new(ChromiumRenderer::new(config.chrome_path.clone()));
    let store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(pool));
    let pipeline = Arc::new(SyncPipeline::from_app_config(&config, renderer, store));

    let shutdown = CancellationToken::new();
    let sync_deadline = Duration::from_secs(config.sync_deadline_secs);

    let _scheduler = match &config.sync_schedule {
        Some(schedule) => Some(
            scheduler::build_scheduler(
                Arc::clone(&pipeline),
                schedule,
                sync_deadline,
                shutdown.clone(),
            )
            .await?,
        ),
        None => {
            tracing::info!("scheduled sync disabled");
            None
        }
    };

    let app = build_app(
        AppState {
            pipeline,
            sync_deadline,
            shutdown: shutdown.clone(),
        },
        AuthState::new(authenticator),
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Resolves on SIGINT/SIGTERM after cancelling `shutdown`, which aborts
/// in-flight syncs so their browsers are released before exit.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
    shutdown.cancel();
}
