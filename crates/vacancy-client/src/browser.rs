use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use vacancy_core::error::AppError;
use vacancy_core::traits::{Fetcher, Screenshotter};

/// Time given to client-side rendering after navigation.
const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Headless Chromium shared by every clone.
///
/// Each call opens a tab, waits for the page to settle, reads it and closes
/// the tab. Used for boards that only render their postings client-side.
#[derive(Clone)]
pub struct ChromiumBrowser {
    browser: Arc<Browser>,
    timeout: Duration,
    settle: Duration,
}

impl ChromiumBrowser {
    pub async fn launch() -> Result<Self, AppError> {
        Self::launch_with_timeout(Duration::from_secs(45)).await
    }

    pub async fn launch_with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        // Snap's chromium wrapper drops the headless flags, so prefer a real binary.
        if let Some(bin) = find_chrome_binary() {
            tracing::info!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .window_size(1366, 900)
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
            settle: SETTLE_DELAY,
        })
    }

    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Open `url` in a fresh tab, run `read` on it and always close the tab.
    async fn with_page<T, F, Fut>(&self, url: &str, read: F) -> Result<T, AppError>
    where
        F: FnOnce(Page) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let work = async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| AppError::BrowserError(format!("Navigation failed for {url}: {e}")))?;
            tokio::time::sleep(self.settle).await;

            let result = read(page.clone()).await;
            if let Err(e) = page.close().await {
                tracing::debug!(%url, error = %e, "Failed to close tab");
            }
            result
        };

        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
    }
}

impl Screenshotter for ChromiumBrowser {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.with_page(url, |page| async move {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            page.screenshot(params)
                .await
                .map_err(|e| AppError::BrowserError(format!("Screenshot failed: {e}")))
        })
        .await
    }
}

impl Fetcher for ChromiumBrowser {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.with_page(url, |page| async move {
            page.content()
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
        })
        .await
    }
}

fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
