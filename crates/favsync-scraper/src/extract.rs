//! Favourite-record extraction from rendered profile HTML.
//!
//! Attribute values are taken verbatim; missing attributes become empty
//! strings. Only a page with no records at all is treated as a failure.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use favsync_core::FavoriteRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;

static FAVOURITES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#favourites").expect("valid selector"));
static POSTER_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".poster-container").expect("valid selector"));
static FILM_POSTER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".film-poster").expect("valid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static FRAME_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".frame-title").expect("valid selector"));

/// Trailing `(YYYY)` in a frame title such as `"Paris, Texas (1984)"`.
static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)\s*$").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct FavoriteExtractor {
    site_origin: String,
}

impl FavoriteExtractor {
    /// `site_origin` is prefixed verbatim to each poster's relative link.
    #[must_use]
    pub fn new(site_origin: impl Into<String>) -> Self {
        Self {
            site_origin: site_origin.into(),
        }
    }

    /// Extracts one record per poster inside the favourites container, in
    /// document order, stamping each with `observed_at`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Parse`] if the document has no favourites container.
    /// - [`ScraperError::NoFavoritesExtracted`] if the container holds no posters.
    pub fn extract(
        &self,
        html: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<FavoriteRecord>, ScraperError> {
        let document = Html::parse_document(html);

        let container = document
            .select(&FAVOURITES)
            .next()
            .ok_or_else(|| ScraperError::Parse {
                reason: "favourites container not found".to_string(),
            })?;

        let records: Vec<FavoriteRecord> = container
            .select(&POSTER_CONTAINER)
            .map(|poster_container| self.record_from(poster_container, observed_at))
            .collect();

        if records.is_empty() {
            return Err(ScraperError::NoFavoritesExtracted);
        }

        let partial = records
            .iter()
            .filter(|r| r.title.is_empty() || r.release_year.is_empty() || r.image_url.is_empty())
            .count();
        if partial > 0 {
            tracing::warn!(partial, total = records.len(), "extracted records with missing fields");
        }

        Ok(records)
    }

    fn record_from(
        &self,
        poster_container: ElementRef<'_>,
        observed_at: DateTime<Utc>,
    ) -> FavoriteRecord {
        let poster = poster_container.select(&FILM_POSTER).next();

        let attr = |name: &str| -> String {
            poster
                .and_then(|p| p.value().attr(name))
                .map(str::to_string)
                .unwrap_or_default()
        };

        let mut release_year = attr("data-film-release-year");
        if release_year.is_empty() {
            release_year = frame_title_year(poster_container).unwrap_or_default();
        }

        let image_url = poster
            .and_then(|p| p.select(&IMG).next())
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string)
            .unwrap_or_default();

        let link = poster
            .and_then(|p| p.value().attr("data-film-link"))
            .unwrap_or_default();

        FavoriteRecord {
            title: attr("data-film-name"),
            release_year,
            image_url,
            page_url: format!("{}{}", self.site_origin, link),
            observed_at,
        }
    }
}

fn frame_title_year(poster_container: ElementRef<'_>) -> Option<String> {
    let frame_title = poster_container.select(&FRAME_TITLE).next()?;
    let text = frame_title.text().collect::<String>();
    TRAILING_YEAR
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
