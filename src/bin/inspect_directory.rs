//! Directory Inspection Binary
//!
//! Developer aid for working out the site's markup:
//! - saves the post-login page as debug_page.html and debug_screenshot.png
//! - prints the landing URL and the first 20 links
//! - reports how many elements each candidate member selector matches

use anyhow::{Context, Result};
use directory_export::auth::get_authenticated_page;
use directory_export::browser::Page;
use directory_export::config::Config;
use directory_export::scrapers::{FAMILY_SELECTORS, GROUP_SELECTORS, STAFF_SELECTORS};
use scraper::{Html, Selector};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const PROBE_SELECTORS: &[&str] = &[
    ".member",
    ".family",
    ".person",
    "[class*='member']",
    "[class*='family']",
    "article",
    ".card",
    "main, [role='main'], .container, .content, #content",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Directory Page Inspector ===");

    let config = Config::from_env()?;
    let page = get_authenticated_page(&config).await?;

    let result = inspect(&page).await;

    if let Err(e) = page.close().await {
        eprintln!("Warning: Failed to quit browser: {}", e);
    }
    result?;

    println!("\nDone! Check debug_screenshot.png and debug_page.html for details.");
    Ok(())
}

async fn inspect(page: &directory_export::browser::WebDriverPage) -> Result<()> {
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    page.screenshot(Path::new("debug_screenshot.png")).await?;
    println!("Saved screenshot to debug_screenshot.png");

    let html = page.content().await?;
    std::fs::write("debug_page.html", &html).context("Failed to write debug_page.html")?;
    println!("Saved HTML to debug_page.html");

    println!("Current URL: {}", page.current_url().await?);

    for line in report(&html) {
        println!("{}", line);
    }
    Ok(())
}

fn report(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    if let Ok(selector) = Selector::parse("a") {
        let links: Vec<_> = document.select(&selector).collect();
        lines.push(format!("\nFound {} links on the page", links.len()));
        lines.push("\nFirst 20 links:".to_string());
        for (i, link) in links.iter().take(20).enumerate() {
            let text = link.text().collect::<String>();
            let text: String = text.trim().chars().take(50).collect();
            let href = link.value().attr("href").unwrap_or("");
            lines.push(format!("  {}. {} -> {}", i + 1, text, href));
        }
    }

    lines.push("\nSelector hit counts:".to_string());
    let configured = FAMILY_SELECTORS
        .iter()
        .chain(STAFF_SELECTORS)
        .chain(GROUP_SELECTORS)
        .chain(PROBE_SELECTORS);
    for selector_str in configured {
        match Selector::parse(selector_str) {
            Ok(selector) => {
                let count = document.select(&selector).count();
                if count > 0 {
                    lines.push(format!("  {}: found {} elements", selector_str, count));
                }
            }
            Err(_) => lines.push(format!("  {}: invalid selector", selector_str)),
        }
    }
    lines
}
