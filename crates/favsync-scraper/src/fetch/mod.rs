//! Rendered-page retrieval.
//!
//! The favourites section of a profile is populated by client-side script, so
//! a plain HTTP GET returns an empty shell. [`PageFetcher`] drives a
//! [`Renderer`] that runs the page in an isolated, disposable environment and
//! captures the DOM once the favourites container is visible.

mod chromium;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;

pub use chromium::ChromiumRenderer;

/// CSS selector of the element that holds the favourite posters.
pub const FAVOURITES_SELECTOR: &str = "#favourites";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source of rendering environments. One environment is acquired per fetch
/// and never reused.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquires a fresh rendering environment.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::RenderEnvironment`] if the environment cannot
    /// be started.
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, ScraperError>;
}

/// A live rendering environment holding a single page.
///
/// Implementations must release their resources on drop as well, since a
/// cancelled fetch never reaches [`RenderSession::release`].
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    /// Reports whether the first element matching `selector` is rendered and visible.
    async fn is_visible(&mut self, selector: &str) -> Result<bool, ScraperError>;

    /// Serializes the current DOM.
    async fn capture_html(&mut self) -> Result<String, ScraperError>;

    /// Tears the environment down. Calling it twice is a no-op.
    async fn release(&mut self) -> Result<(), ScraperError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Origin the profile path is appended to, without a trailing slash.
    pub site_origin: String,
    /// Upper bound on navigation plus the visibility wait.
    pub timeout: Duration,
    /// Pause after the container turns visible, for lazy image scripts.
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl FetchSettings {
    #[must_use]
    pub fn new(site_origin: impl Into<String>) -> Self {
        Self {
            site_origin: site_origin.into(),
            timeout: DEFAULT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &favsync_core::AppConfig) -> Self {
        Self {
            site_origin: config.site_origin.clone(),
            timeout: Duration::from_secs(config.page_timeout_secs),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Retrieves the fully rendered HTML of a profile page.
pub struct PageFetcher {
    renderer: Arc<dyn Renderer>,
    settings: FetchSettings,
}

impl PageFetcher {
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, settings: FetchSettings) -> Self {
        Self { renderer, settings }
    }

    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/{}/", self.settings.site_origin, username)
    }

    /// Renders `username`'s profile page and returns its HTML once the
    /// favourites container is visible.
    ///
    /// The rendering environment is released on every exit path. A failure to
    /// release it fails the call even when the capture itself succeeded.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RenderEnvironment`] if the environment could not be acquired or released.
    /// - [`ScraperError::Navigation`] on a network, DNS, or navigation failure.
    /// - [`ScraperError::PageLoadTimeout`] if the container stayed hidden past the timeout.
    /// - [`ScraperError::Cancelled`] if `cancel` fired before the capture finished.
    pub async fn fetch(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ScraperError> {
        let url = self.profile_url(username);

        let mut session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ScraperError::Cancelled),
            acquired = self.renderer.acquire() => acquired?,
        };
        tracing::debug!(%url, "rendering environment acquired");

        let captured = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ScraperError::Cancelled),
            result = self.render(session.as_mut(), &url) => result,
        };

        let released = session.release().await;
        tracing::debug!(%url, released = released.is_ok(), "rendering environment released");

        match (captured, released) {
            (Ok(html), Ok(())) => Ok(html),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                tracing::error!(%url, error = %release_err, "failed to release rendering environment");
                Err(err)
            }
        }
    }

    async fn render(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
    ) -> Result<String, ScraperError> {
        let timeout = self.settings.timeout;
        let poll_interval = self.settings.poll_interval;

        tokio::time::timeout(timeout, async {
            session.navigate(url).await?;
            while !session.is_visible(FAVOURITES_SELECTOR).await? {
                tokio::time::sleep(poll_interval).await;
            }
            Ok::<(), ScraperError>(())
        })
        .await
        .map_err(|_| ScraperError::PageLoadTimeout {
            url: url.to_string(),
            timeout,
        })??;

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        session.capture_html().await
    }
}

#[cfg(test)]
#[path = "../fetch_test.rs"]
mod tests;
