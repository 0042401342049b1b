mod families;
mod staff;
mod groups;
mod events;
mod pages;

pub use families::{parse_family, scrape_families, FAMILY_SELECTORS};
pub use staff::{parse_staff, scrape_staff, STAFF_SELECTORS};
pub use groups::{parse_group, scrape_groups, GROUP_CANDIDATE_PATHS, GROUP_SELECTORS};
pub use events::{parse_anniversary, parse_birthday, scrape_events, EventsScrape};
pub use pages::{discover_page_links, parse_page, scrape_pages, MAX_CONTENT_CHARS, MAX_PAGES};

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use crate::browser::Page;
use crate::config::Timeouts;
use crate::extract::{directory_id, select_with_fallback};

/// What every section scraper needs from the authenticated session.
pub struct SectionContext<'a> {
    pub page: &'a dyn Page,
    pub base_url: &'a str,
    /// Where the session landed after login; carries the directory identifier.
    pub landing_url: &'a str,
    pub timeouts: &'a Timeouts,
}

/// How a section finds its page.
#[derive(Debug, Clone, Copy)]
pub enum UrlStrategy {
    /// The post-login landing page itself.
    Landing,
    /// `{base}/{path}/{directory_id}`
    Directory(&'static str),
    /// First of `{base}{path}` that loads.
    Candidates(&'static [&'static str]),
}

impl<'a> SectionContext<'a> {
    pub fn directory_url(&self, path: &str) -> Result<String> {
        let id = directory_id(self.landing_url)
            .ok_or_else(|| anyhow!("Could not determine directory ID from {}", self.landing_url))?;
        Ok(format!("{}/{}/{}", self.base_url, path, id))
    }

    /// Navigate, let the page render, and return its DOM.
    pub async fn load(&self, url: &str) -> Result<String> {
        info!("  Navigating to {}", url);
        self.page.goto(url, self.timeouts.navigation).await?;
        self.page.settle(self.timeouts.settle).await?;
        if !self.timeouts.render.is_zero() {
            tokio::time::sleep(self.timeouts.render).await;
        }
        self.page.content().await
    }

    /// Resolve the section URL with `strategy` and load it.
    pub async fn load_section(&self, strategy: UrlStrategy) -> Result<String> {
        match strategy {
            UrlStrategy::Landing => self.load(self.landing_url).await,
            UrlStrategy::Directory(path) => {
                let url = self.directory_url(path)?;
                self.load(&url).await
            }
            UrlStrategy::Candidates(paths) => {
                for path in paths {
                    let url = format!("{}{}", self.base_url, path);
                    match self.load(&url).await {
                        Ok(html) => return Ok(html),
                        Err(e) => debug!("  {} did not load: {:#}", url, e),
                    }
                }
                Err(anyhow!("none of {:?} loaded", paths))
            }
        }
    }
}

/// Enumerate elements through the selector fallback chain and run
/// `extract` on each. A failing element is logged and skipped; `Ok(None)`
/// drops the element silently.
pub fn extract_records<R, F>(html: &str, selectors: &[&'static str], label: &str, mut extract: F) -> Vec<R>
where
    F: FnMut(usize, &ElementRef) -> Result<Option<R>>,
{
    let document = Html::parse_document(html);
    let (used, elements) = select_with_fallback(&document, selectors);
    match used {
        Some(selector) => info!("  Found {} potential {} elements ({})", elements.len(), label, selector),
        None => info!("  Found 0 potential {} elements", label),
    }

    let mut records = Vec::with_capacity(elements.len());
    for (idx, element) in elements.iter().enumerate() {
        match extract(idx, element) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => debug!("  Skipping {} element {}: no name", label, idx),
            Err(e) => warn!("  Error processing {} element {}: {:#}", label, idx, e),
        }
    }
    records
}

/// `family_001`, `staff_012`, ...
pub fn record_id(prefix: &str, idx: usize) -> String {
    format!("{}_{:03}", prefix, idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><body>
        <div class="item">One</div>
        <div class="item">Two</div>
        <div class="item">Three</div>
    </body></html>"#;

    #[test]
    fn test_record_id() {
        assert_eq!(record_id("family", 0), "family_001");
        assert_eq!(record_id("page", 119), "page_120");
    }

    #[test]
    fn test_failing_element_only_skips_itself() {
        let records = extract_records(HTML, &[".item"], "test", |idx, el| {
            if idx == 1 {
                return Err(anyhow!("boom"));
            }
            Ok(Some(el.text().collect::<String>()))
        });
        assert_eq!(records, vec!["One", "Three"]);
    }

    #[test]
    fn test_fallback_used_when_primary_empty() {
        let records = extract_records(HTML, &[".family", ".item"], "test", |_, el| {
            Ok(Some(el.text().collect::<String>()))
        });
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_no_match_is_empty() {
        let records: Vec<String> = extract_records(HTML, &[".family"], "test", |_, _| Ok(None));
        assert!(records.is_empty());
    }
}
