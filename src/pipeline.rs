//! Run Pipeline Module
//!
//! Drives every section over one authenticated page, downloads photos and
//! assets, and writes the exports. A failing section is recorded in the
//! summary and the run moves on; export write failures end the run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::browser::Page;
use crate::config::{Config, Timeouts};
use crate::downloader::Downloader;
use crate::scrapers::{self, EventsScrape, SectionContext};
use crate::storage::{create_export_structure, export_combined, export_to_json};
use crate::types::{HasPhoto, PageRecord, RunSummary};

/// Assets downloaded per additional page.
pub const MAX_ASSETS_PER_PAGE: usize = 10;

/// The subset of `Config` a run needs once the page is authenticated.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub base_url: String,
    pub export_root: PathBuf,
    pub timeouts: Timeouts,
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            export_root: config.export_root.clone(),
            timeouts: config.timeouts,
        }
    }
}

pub async fn run(page: &dyn Page, options: &RunOptions, downloader: &Downloader) -> Result<RunSummary> {
    let root = options.export_root.as_path();
    let source = options.base_url.as_str();
    create_export_structure(root)?;

    let landing_url = page.current_url().await.context("Failed to read landing URL")?;
    let ctx = SectionContext {
        page,
        base_url: source,
        landing_url: &landing_url,
        timeouts: &options.timeouts,
    };

    let mut summary = RunSummary::default();

    let families = scrapers::scrape_families(&ctx).await;
    summary.families = photo_section(root, source, "families", families, downloader, &mut summary.errors).await?;

    let staff = scrapers::scrape_staff(&ctx).await;
    summary.staff = photo_section(root, source, "staff", staff, downloader, &mut summary.errors).await?;

    let groups = scrapers::scrape_groups(&ctx).await;
    summary.groups = photo_section(root, source, "groups", groups, downloader, &mut summary.errors).await?;

    match scrapers::scrape_events(&ctx).await {
        Ok(EventsScrape { events, anniversaries_error }) => {
            if let Some(e) = anniversaries_error {
                record_error(&mut summary.errors, "anniversaries", e);
            }
            summary.birthdays = events.birthdays.len();
            summary.anniversaries = events.anniversaries.len();
            export_combined(root, "events", &events, source)?;
        }
        Err(e) => record_error(&mut summary.errors, "events", e),
    }

    match scrapers::scrape_pages(&ctx).await {
        Ok(pages) => {
            summary.pages = pages.len();
            if !pages.is_empty() {
                download_page_assets(&pages, &root.join("additional_pages").join("assets"), downloader).await;
                export_to_json(root, "additional_pages", &pages, source)?;
            }
        }
        Err(e) => record_error(&mut summary.errors, "pages", e),
    }

    Ok(summary)
}

/// Finish a section whose records carry a photo: download, rewrite paths,
/// export. Returns the record count, zero when the scrape failed.
async fn photo_section<R: HasPhoto + Serialize>(
    root: &Path,
    source: &str,
    category: &str,
    scraped: Result<Vec<R>>,
    downloader: &Downloader,
    errors: &mut Vec<String>,
) -> Result<usize> {
    let mut records = match scraped {
        Ok(records) => records,
        Err(e) => {
            record_error(errors, category, e);
            return Ok(0);
        }
    };
    if records.is_empty() {
        return Ok(0);
    }

    let photos_dir = root.join(category).join("photos");
    download_photos(&mut records, &photos_dir, downloader).await;
    export_to_json(root, category, &records, source)?;
    Ok(records.len())
}

/// Replace each photo URL with its local path, or with an empty string when
/// the download failed.
pub async fn download_photos<R: HasPhoto>(records: &mut [R], dest_dir: &Path, downloader: &Downloader) {
    let urls: Vec<String> = records
        .iter_mut()
        .map(|r| r.photo_mut().clone())
        .filter(|url| !url.is_empty())
        .collect();
    if urls.is_empty() {
        return;
    }

    info!("  Downloading {} photos...", urls.len());
    let downloaded = downloader.download_batch(&urls, dest_dir).await;

    for record in records.iter_mut() {
        let photo = record.photo_mut();
        if photo.is_empty() {
            continue;
        }
        *photo = downloaded.get(photo.as_str()).cloned().unwrap_or_default();
    }
    info!("  Downloaded {} photos", downloaded.len());
}

async fn download_page_assets(pages: &[PageRecord], dest_dir: &Path, downloader: &Downloader) {
    let urls: Vec<String> = pages
        .iter()
        .flat_map(|p| p.asset_urls.iter().take(MAX_ASSETS_PER_PAGE).cloned())
        .collect();
    if urls.is_empty() {
        return;
    }

    info!("  Downloading assets for {} pages...", pages.len());
    let downloaded = downloader.download_batch(&urls, dest_dir).await;
    info!("  Downloaded {} of {} assets", downloaded.len(), urls.len());
}

fn record_error(errors: &mut Vec<String>, section: &str, err: anyhow::Error) {
    let message = format!("Error scraping {}: {:#}", section, err);
    error!("  {}", message);
    errors.push(message);
}

/// Human-readable end-of-run report.
pub fn format_summary(summary: &RunSummary, duration_secs: f64, export_root: &Path) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    out.push_str(&format!("\n{}\nScraping Complete!\n{}\n", rule, rule));
    out.push_str(&format!("Duration: {:.1} seconds\n", duration_secs));
    out.push_str("\nResults:\n");
    out.push_str(&format!("  Families: {}\n", summary.families));
    out.push_str(&format!("  Staff: {}\n", summary.staff));
    out.push_str(&format!("  Groups: {}\n", summary.groups));
    out.push_str(&format!("  Birthdays: {}\n", summary.birthdays));
    out.push_str(&format!("  Anniversaries: {}\n", summary.anniversaries));
    out.push_str(&format!("  Additional Pages: {}\n", summary.pages));

    if !summary.errors.is_empty() {
        out.push_str(&format!("\nErrors: {}\n", summary.errors.len()));
        for err in &summary.errors {
            out.push_str(&format!("  - {}\n", err));
        }
    }

    out.push_str(&format!("\nExported data saved to: {}/\n{}", export_root.display(), rule));
    out
}
