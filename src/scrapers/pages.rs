use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::{record_id, SectionContext, UrlStrategy};
use crate::extract::{cap_chars, document_text, normalize_asset_url, text_lines, title_from_url, visible_text};
use crate::types::PageRecord;

/// Upper bound on pages visited per run.
pub const MAX_PAGES: usize = 20;
pub const MAX_CONTENT_CHARS: usize = 1000;

const NAV_LINK_SELECTOR: &str = r#"nav a, header a, .menu a, [role="navigation"] a"#;
const TITLE_SELECTORS: &[&str] = &["h1", "h2", "title"];
const CONTENT_SELECTOR: &str = r#"main, article, .content, [role="main"]"#;
const PDF_SELECTOR: &str = r#"a[href$=".pdf"]"#;

/// Links that would end the session.
const SESSION_ENDING_PATTERN: &str = r"(?i)log-?out|sign-?out|sign_out|log_off|logoff";

pub async fn scrape_pages(ctx: &SectionContext<'_>) -> Result<Vec<PageRecord>> {
    info!("Scraping additional pages...");
    let html = ctx.load_section(UrlStrategy::Landing).await?;

    let urls = discover_page_links(&html, ctx.base_url);
    info!("  Found {} additional pages to scrape", urls.len());

    let mut pages = Vec::new();
    for (idx, url) in urls.iter().enumerate() {
        let html = match ctx.load(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("  Error scraping page {}: {:#}", url, e);
                continue;
            }
        };
        pages.push(parse_page(idx, url, &html, ctx.base_url));
    }

    info!("  Successfully scraped {} additional pages", pages.len());
    Ok(pages)
}

/// Same-site navigation links in page order, deduplicated, capped at `MAX_PAGES`.
pub fn discover_page_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(NAV_LINK_SELECTOR) else {
        return Vec::new();
    };
    let session_ending = Regex::new(SESSION_ENDING_PATTERN).ok();
    let site = site_domain(base_url);

    let mut urls: Vec<String> = Vec::new();
    for link in document.select(&selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = normalize_asset_url(href, base_url) else {
            continue;
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            continue;
        }
        if site.is_some() && site_domain(&url) != site {
            continue;
        }
        if session_ending.as_ref().is_some_and(|re| re.is_match(&url)) {
            continue;
        }
        let url = url.split('#').next().unwrap_or(&url).to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
        if urls.len() >= MAX_PAGES {
            break;
        }
    }
    urls
}

/// Last two labels of the URL's host: `members.example.com` -> `example.com`.
fn site_domain(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return Some(host);
    }
    Some(labels[labels.len() - 2..].join("."))
}

pub fn parse_page(idx: usize, url: &str, html: &str, base_url: &str) -> PageRecord {
    let document = Html::parse_document(html);

    let title = TITLE_SELECTORS
        .iter()
        .find_map(|sel| document_text(&document, sel))
        .unwrap_or_else(|| title_from_url(url));

    let content_root = Selector::parse(CONTENT_SELECTOR)
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|sel| document.select(&sel).next())
        });
    let content = content_root
        .map(|el| text_lines(&visible_text(&el)).join("\n"))
        .unwrap_or_default();

    PageRecord {
        id: record_id("page", idx),
        title,
        url: url.to_string(),
        content: cap_chars(&content, MAX_CONTENT_CHARS),
        asset_urls: collect_assets(&document, base_url),
    }
}

/// Every image source and PDF link on the page, absolute and deduplicated.
fn collect_assets(document: &Html, base_url: &str) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    let sources = [("img", "src"), (PDF_SELECTOR, "href")];

    for (selector, attr) in sources {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            let normalized = element
                .value()
                .attr(attr)
                .and_then(|raw| normalize_asset_url(raw, base_url));
            if let Some(url) = normalized {
                if !assets.contains(&url) {
                    assets.push(url);
                }
            }
        }
    }
    assets
}
