//! Poster URL normalization to a canonical image size.
//!
//! Poster assets encode their crop size in the path as
//! `-0-<width>-0-<height>-crop`. Rewriting those two numbers requests a
//! different rendition of the same image.

use std::sync::LazyLock;

use favsync_core::FavoriteRecord;
use regex::{NoExpand, Regex};

static SIZE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-0-(\d+)-0-(\d+)-crop").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageNormalizer {
    width: u32,
    height: u32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

impl ImageNormalizer {
    pub const DEFAULT_WIDTH: u32 = 2000;
    pub const DEFAULT_HEIGHT: u32 = 3000;

    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Drops the query string and rewrites every size segment to the
    /// configured dimensions. URLs without a size segment only lose their
    /// query string.
    ///
    /// A zero width or height disables rewriting and the input is returned
    /// unchanged.
    #[must_use]
    pub fn normalize(&self, url: &str) -> String {
        resize(url, self.width, self.height)
    }

    /// Normalizes `image_url` on every record in place.
    pub fn normalize_records(&self, records: &mut [FavoriteRecord]) {
        for record in records {
            record.image_url = self.normalize(&record.image_url);
        }
    }

    /// Returns `true` if `url` already carries the configured dimensions.
    #[must_use]
    pub fn is_canonical(&self, url: &str) -> bool {
        dimensions(url) == Some((self.width, self.height))
    }
}

/// Rewrites `url` to an explicit `width` x `height`, ignoring any configured
/// canonical size.
#[must_use]
pub fn resize(url: &str, width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return url.to_string();
    }

    let without_query = url.split_once('?').map_or(url, |(head, _)| head);
    let replacement = format!("-0-{width}-0-{height}-crop");
    SIZE_SEGMENT
        .replace_all(without_query, NoExpand(&replacement))
        .into_owned()
}

/// Width and height encoded in the first size segment of `url`, if any.
#[must_use]
pub fn dimensions(url: &str) -> Option<(u32, u32)> {
    let caps = SIZE_SEGMENT.captures(url)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
