use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::*;

const PAGE: &str = "<html><body><section id=\"favourites\"></section></body></html>";

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    dropped: AtomicUsize,
    polls: AtomicUsize,
}

/// Scripted renderer: the container turns visible after `visible_after`
/// polls (`None` = never).
#[derive(Clone)]
struct FakeRenderer {
    counters: Arc<Counters>,
    visible_after: Option<usize>,
    fail_acquire: bool,
    fail_navigation: bool,
    fail_release: bool,
}

impl FakeRenderer {
    fn visible_after(polls: usize) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            visible_after: Some(polls),
            fail_acquire: false,
            fail_navigation: false,
            fail_release: false,
        }
    }

    fn never_visible() -> Self {
        Self {
            visible_after: None,
            ..Self::visible_after(0)
        }
    }
}

struct FakeSession {
    renderer: FakeRenderer,
    navigated_to: Option<String>,
    released: bool,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, ScraperError> {
        if self.fail_acquire {
            return Err(ScraperError::render("no browser available"));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            renderer: self.clone(),
            navigated_to: None,
            released: false,
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        if self.renderer.fail_navigation {
            return Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.navigated_to = Some(url.to_string());
        Ok(())
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, ScraperError> {
        assert_eq!(selector, FAVOURITES_SELECTOR);
        let seen = self.renderer.counters.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.renderer.visible_after.is_some_and(|n| seen >= n))
    }

    async fn capture_html(&mut self) -> Result<String, ScraperError> {
        assert!(self.navigated_to.is_some(), "capture before navigation");
        Ok(PAGE.to_string())
    }

    async fn release(&mut self) -> Result<(), ScraperError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.renderer.counters.released.fetch_add(1, Ordering::SeqCst);
        if self.renderer.fail_release {
            return Err(ScraperError::render("browser refused to exit"));
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.renderer.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

fn fast_settings(timeout: Duration) -> FetchSettings {
    FetchSettings {
        site_origin: "https://films.example".to_string(),
        timeout,
        settle_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
    }
}

fn fetcher(renderer: &FakeRenderer, timeout: Duration) -> PageFetcher {
    PageFetcher::new(Arc::new(renderer.clone()), fast_settings(timeout))
}

#[test]
fn profile_url_appends_username_to_origin() {
    let renderer = FakeRenderer::visible_after(0);
    let fetcher = fetcher(&renderer, Duration::from_secs(1));
    assert_eq!(
        fetcher.profile_url("cinephile"),
        "https://films.example/cinephile/"
    );
}

#[test]
fn default_settings_use_thirty_second_timeout() {
    let settings = FetchSettings::new("https://films.example");
    assert_eq!(settings.timeout, Duration::from_secs(30));
    assert_eq!(settings.settle_delay, Duration::from_secs(2));
}

#[tokio::test]
async fn fetch_returns_html_once_container_is_visible() {
    let renderer = FakeRenderer::visible_after(3);
    let fetcher = fetcher(&renderer, Duration::from_secs(2));

    let html = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect("fetch should succeed");

    assert_eq!(html, PAGE);
    assert!(renderer.counters.polls.load(Ordering::SeqCst) >= 4);
    assert_eq!(renderer.counters.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.counters.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_times_out_within_bound_when_container_never_appears() {
    let renderer = FakeRenderer::never_visible();
    let timeout = Duration::from_millis(100);
    let fetcher = fetcher(&renderer, timeout);

    let started = Instant::now();
    let err = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect_err("fetch should time out");
    let elapsed = started.elapsed();

    assert!(
        matches!(err, ScraperError::PageLoadTimeout { ref url, timeout: t } if url == "https://films.example/cinephile/" && t == timeout),
        "unexpected error: {err:?}"
    );
    assert!(elapsed >= timeout);
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    assert_eq!(renderer.counters.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn acquisition_failure_is_a_render_environment_error() {
    let renderer = FakeRenderer {
        fail_acquire: true,
        ..FakeRenderer::visible_after(0)
    };
    let fetcher = fetcher(&renderer, Duration::from_secs(1));

    let err = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect_err("acquire should fail");

    assert!(matches!(err, ScraperError::RenderEnvironment { .. }));
    assert_eq!(renderer.counters.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn navigation_failure_surfaces_and_still_releases() {
    let renderer = FakeRenderer {
        fail_navigation: true,
        ..FakeRenderer::visible_after(0)
    };
    let fetcher = fetcher(&renderer, Duration::from_secs(1));

    let err = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect_err("navigation should fail");

    assert!(matches!(err, ScraperError::Navigation { .. }));
    assert_eq!(renderer.counters.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn release_failure_fails_an_otherwise_successful_fetch() {
    let renderer = FakeRenderer {
        fail_release: true,
        ..FakeRenderer::visible_after(0)
    };
    let fetcher = fetcher(&renderer, Duration::from_secs(1));

    let err = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect_err("teardown failure should be fatal");

    assert!(matches!(err, ScraperError::RenderEnvironment { ref reason } if reason.contains("refused")));
}

#[tokio::test]
async fn release_failure_does_not_mask_the_original_error() {
    let renderer = FakeRenderer {
        fail_release: true,
        ..FakeRenderer::never_visible()
    };
    let fetcher = fetcher(&renderer, Duration::from_millis(30));

    let err = fetcher
        .fetch("cinephile", &CancellationToken::new())
        .await
        .expect_err("fetch should fail");

    assert!(matches!(err, ScraperError::PageLoadTimeout { .. }));
}

#[tokio::test]
async fn cancellation_aborts_the_wait_and_releases() {
    let renderer = FakeRenderer::never_visible();
    let fetcher = fetcher(&renderer, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = fetcher
        .fetch("cinephile", &cancel)
        .await
        .expect_err("fetch should be cancelled");

    assert!(matches!(err, ScraperError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(renderer.counters.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_token_skips_acquisition() {
    let renderer = FakeRenderer::visible_after(0);
    let fetcher = fetcher(&renderer, Duration::from_secs(1));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fetcher.fetch("cinephile", &cancel).await.expect_err("cancelled");

    assert!(matches!(err, ScraperError::Cancelled));
    assert_eq!(renderer.counters.acquired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropping_the_fetch_future_drops_the_session() {
    let renderer = FakeRenderer::never_visible();
    let fetcher = fetcher(&renderer, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let outcome = tokio::time::timeout(
        Duration::from_millis(30),
        fetcher.fetch("cinephile", &cancel),
    )
    .await;

    assert!(outcome.is_err(), "outer timeout should win");
    assert_eq!(renderer.counters.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.counters.dropped.load(Ordering::SeqCst), 1);
}
