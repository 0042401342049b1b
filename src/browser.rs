//! Browser Page Module
//!
//! `Page` is the seam between the scrapers and the browser: navigation,
//! rendered DOM source and the few form interactions login needs. The
//! production implementation drives ChromeDriver through thirtyfour.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, warn};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const SETTLE_IDLE_WINDOW: Duration = Duration::from_millis(1000);

const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "--disable-blink-features=AutomationControlled",
];

/// One browser tab, used by one task at a time.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait for the document, failing after `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Rendered DOM as HTML.
    async fn content(&self) -> Result<String>;

    /// Wait until `selector` matches; `false` if it never does within `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Replace the value of the first input matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Click the first match; `false` if nothing matched.
    async fn click(&self, selector: &str) -> Result<bool>;

    async fn press_enter(&self, selector: &str) -> Result<()>;

    /// Wait for the network to go quiet. Never fails on timeout.
    async fn settle(&self, timeout: Duration) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    /// Start a Chrome session on the given WebDriver server.
    pub async fn launch(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut args: Vec<&str> = CHROME_ARGS.to_vec();
        if headless {
            args.insert(0, "--headless=new");
        }

        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option("args", args)?;

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .with_context(|| format!("Failed to connect to ChromeDriver at {}", webdriver_url))?;

        Ok(Self { driver })
    }

    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        self.driver
            .screenshot(path)
            .await
            .with_context(|| format!("Failed to save screenshot to {:?}", path))
    }

    async fn ready_state(&self) -> Result<(String, u64)> {
        let ret = self
            .driver
            .execute(
                "return [document.readyState, performance.getEntriesByType('resource').length];",
                Vec::new(),
            )
            .await?;
        let value = ret.json();
        let state = value
            .get(0)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let resources = value.get(1).and_then(|v| v.as_u64()).unwrap_or(0);
        Ok((state, resources))
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.driver.goto(url))
            .await
            .map_err(|_| anyhow!("Timed out after {:?} navigating to {}", timeout, url))?
            .with_context(|| format!("Failed to navigate to {}", url))?;

        self.driver
            .query(By::Tag("body"))
            .wait(timeout, SETTLE_POLL_INTERVAL)
            .first()
            .await
            .with_context(|| format!("Page body never appeared at {}", url))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.driver.current_url().await.context("Failed to read current URL")?;
        Ok(url.to_string())
    }

    async fn content(&self) -> Result<String> {
        self.driver.source().await.context("Failed to get page source")
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let found = self
            .driver
            .query(By::Css(selector))
            .wait(timeout, SETTLE_POLL_INTERVAL)
            .first()
            .await;
        Ok(found.is_ok())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let found = self.driver.find_all(By::Css(selector)).await?;
        Ok(!found.is_empty())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let input = self
            .driver
            .find(By::Css(selector))
            .await
            .with_context(|| format!("No input matching {}", selector))?;
        input.clear().await?;
        input.send_keys(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let found = self.driver.find_all(By::Css(selector)).await?;
        match found.into_iter().next() {
            Some(element) => {
                element.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        let input = self
            .driver
            .find(By::Css(selector))
            .await
            .with_context(|| format!("No input matching {}", selector))?;
        input.send_keys(Key::Enter + "").await?;
        Ok(())
    }

    async fn settle(&self, timeout: Duration) -> Result<()> {
        let start = tokio::time::Instant::now();
        let mut last_count = 0u64;
        let mut stable = Duration::ZERO;

        while start.elapsed() < timeout {
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
            let (state, count) = match self.ready_state().await {
                Ok(v) => v,
                Err(e) => {
                    // Navigation in flight can briefly reject scripts.
                    debug!("readyState probe failed: {}", e);
                    stable = Duration::ZERO;
                    continue;
                }
            };

            if state == "complete" && count == last_count {
                stable += SETTLE_POLL_INTERVAL;
                if stable >= SETTLE_IDLE_WINDOW {
                    debug!("Network idle after {:?} ({} resources)", start.elapsed(), count);
                    return Ok(());
                }
            } else {
                stable = Duration::ZERO;
            }
            last_count = count;
        }

        warn!("Network-idle wait timed out after {:?}", timeout);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.driver.clone().quit().await.context("Failed to quit browser")
    }
}
