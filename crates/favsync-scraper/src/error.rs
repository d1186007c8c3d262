use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("favourites did not become visible on {url} within {timeout:?}")]
    PageLoadTimeout { url: String, timeout: Duration },

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("rendering environment failure: {reason}")]
    RenderEnvironment { reason: String },

    #[error("failed to parse rendered page: {reason}")]
    Parse { reason: String },

    #[error("no favourites extracted; the page probably did not finish rendering")]
    NoFavoritesExtracted,

    #[error("page fetch cancelled")]
    Cancelled,
}

impl ScraperError {
    pub(crate) fn render(reason: impl Into<String>) -> Self {
        Self::RenderEnvironment {
            reason: reason.into(),
        }
    }
}
