//! Headless Chromium renderer.
//!
//! Every [`ChromiumRenderer::acquire`] launches a separate browser process
//! with its own throwaway profile directory, so concurrent fetches share no
//! cookies, cache, or profile lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{RenderSession, Renderer};
use crate::error::ScraperError;

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns `true` once the element exists, is not hidden by CSS, and has a box.
const VISIBILITY_SCRIPT: &str = r"(selector) => {
    const el = document.querySelector(selector);
    if (!el) { return false; }
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return false;
    }
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}";

/// Throwaway browser profile directory, removed when the guard drops. Covers
/// launches that fail or are cancelled before a session owns the directory.
#[derive(Debug)]
struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("favsync-render-{}", Uuid::new_v4())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove browser profile dir");
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// `executable` overrides browser auto-detection.
    #[must_use]
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .user_data_dir(profile_dir)
            .launch_timeout(LAUNCH_TIMEOUT)
            .request_timeout(REQUEST_TIMEOUT);

        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|reason| ScraperError::render(format!("invalid browser config: {reason}")))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>, ScraperError> {
        let profile_dir = ProfileDir::new();
        let config = self.browser_config(profile_dir.path())?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::render(format!("failed to launch browser: {e}")))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "browser handler event error");
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            profile_dir,
        };

        let page = match session.open_blank_page().await {
            Ok(page) => page,
            Err(err) => {
                if let Err(release_err) = session.release().await {
                    tracing::error!(error = %release_err, "failed to release browser after page setup error");
                }
                return Err(err);
            }
        };
        session.page = Some(page);

        Ok(Box::new(session))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    profile_dir: ProfileDir,
}

impl ChromiumSession {
    async fn open_blank_page(&self) -> Result<Page, ScraperError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScraperError::render("browser already released"))?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::render(format!("failed to open page: {e}")))
    }

    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::render("page already released"))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, ScraperError> {
        let page = self.page()?;
        let selector = serde_json::to_string(selector)
            .map_err(|e| ScraperError::render(format!("invalid selector: {e}")))?;
        let expression = format!("({VISIBILITY_SCRIPT})({selector})");

        // Evaluation races with in-flight navigations; treat failures as "not yet".
        match page
            .evaluate_expression(EvaluateParams::new(expression))
            .await
        {
            Ok(result) => Ok(result.into_value::<bool>().unwrap_or(false)),
            Err(e) => {
                tracing::trace!(error = %e, "visibility check failed");
                Ok(false)
            }
        }
    }

    async fn capture_html(&mut self) -> Result<String, ScraperError> {
        self.page()?
            .content()
            .await
            .map_err(|e| ScraperError::render(format!("failed to capture page html: {e}")))
    }

    async fn release(&mut self) -> Result<(), ScraperError> {
        let mut failures: Vec<String> = Vec::new();

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "page close failed; closing browser anyway");
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                failures.push(format!("browser close: {e}"));
            }
            if let Err(e) = browser.wait().await {
                failures.push(format!("browser exit: {e}"));
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
            // An aborted task resolves to a cancellation error.
            let _ = handler.await;
        }

        match tokio::fs::remove_dir_all(self.profile_dir.path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => failures.push(format!(
                "remove profile dir {}: {e}",
                self.profile_dir.path().display()
            )),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScraperError::render(failures.join("; ")))
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.browser.is_none() && self.handler.is_none() {
            return;
        }
        tracing::warn!("rendering environment dropped without release; killing browser");
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        // Dropping the browser kills the child process; the profile dir guard
        // is dropped after this.
        self.page.take();
        self.browser.take();
    }
}
