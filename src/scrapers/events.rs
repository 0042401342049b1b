use anyhow::Result;
use scraper::ElementRef;
use tracing::{info, warn};

use super::{extract_records, SectionContext, UrlStrategy};
use crate::extract::read_element;
use crate::types::{AnniversaryRecord, BirthdayRecord, EventsExport};

const BIRTHDAY_SELECTORS: &[&str] = &[
    ".js-icd-members-family-list-item",
    r#"[class*="birthday"]"#,
];

const ANNIVERSARY_SELECTORS: &[&str] = &[
    ".js-icd-members-family-list-item",
    r#"[class*="anniversar"]"#,
];

/// Events gathered so far, plus the anniversaries failure if that page
/// could not be scraped after birthdays succeeded.
pub struct EventsScrape {
    pub events: EventsExport,
    pub anniversaries_error: Option<anyhow::Error>,
}

/// Birthdays, then anniversaries: two pages, same line heuristic. A failed
/// birthdays page fails the section; a failed anniversaries page keeps the
/// birthdays.
pub async fn scrape_events(ctx: &SectionContext<'_>) -> Result<EventsScrape> {
    info!("Scraping events (birthdays & anniversaries)...");

    let html = ctx.load_section(UrlStrategy::Directory("birthdays")).await?;
    let birthdays = extract_records(&html, BIRTHDAY_SELECTORS, "birthday", |_, element| {
        Ok(parse_birthday(element, ctx.base_url))
    });

    let (anniversaries, anniversaries_error) = match ctx.load_section(UrlStrategy::Directory("anniversaries")).await {
        Ok(html) => {
            let records = extract_records(&html, ANNIVERSARY_SELECTORS, "anniversary", |_, element| {
                Ok(parse_anniversary(element, ctx.base_url))
            });
            (records, None)
        }
        Err(e) => {
            warn!("  Anniversaries page failed, keeping {} birthdays", birthdays.len());
            (Vec::new(), Some(e))
        }
    };

    info!(
        "  Total: {} birthdays and {} anniversaries",
        birthdays.len(),
        anniversaries.len()
    );
    Ok(EventsScrape {
        events: EventsExport { birthdays, anniversaries },
        anniversaries_error,
    })
}

pub fn parse_birthday(element: &ElementRef, base_url: &str) -> Option<BirthdayRecord> {
    let fields = read_element(element, base_url);
    let name = fields.first_line();
    if name.is_empty() {
        return None;
    }
    Some(BirthdayRecord {
        name,
        date: fields.second_line(),
    })
}

pub fn parse_anniversary(element: &ElementRef, base_url: &str) -> Option<AnniversaryRecord> {
    let fields = read_element(element, base_url);
    let family = fields.first_line();
    if family.is_empty() {
        return None;
    }
    Some(AnniversaryRecord {
        family,
        date: fields.second_line(),
    })
}
