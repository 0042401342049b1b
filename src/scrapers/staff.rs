use anyhow::Result;
use scraper::ElementRef;
use tracing::info;

use super::{extract_records, record_id, SectionContext, UrlStrategy};
use crate::extract::{is_contact_line, read_element, sub_text};
use crate::types::StaffRecord;

pub const STAFF_SELECTORS: &[&str] = &[
    ".js-icd-members-family-list-item",
    r#".staff-item, [class*="staff"]"#,
];

const BIO_SELECTOR: &str = ".bio, [class*=\"bio\"]";

pub async fn scrape_staff(ctx: &SectionContext<'_>) -> Result<Vec<StaffRecord>> {
    info!("Scraping staff...");
    let html = ctx.load_section(UrlStrategy::Directory("staff")).await?;

    let staff = extract_records(&html, STAFF_SELECTORS, "staff", |idx, element| {
        Ok(Some(parse_staff(idx, element, ctx.base_url)))
    });

    info!("  Successfully scraped {} staff members", staff.len());
    Ok(staff)
}

/// Staff entries are never dropped; a card without text gets `Staff {n}`.
pub fn parse_staff(idx: usize, element: &ElementRef, base_url: &str) -> StaffRecord {
    let fields = read_element(element, base_url);

    let mut name = fields.name();
    if name.is_empty() {
        name = format!("Staff {}", idx + 1);
    }

    let mut title = fields.second_line();
    if is_contact_line(&title) {
        title.clear();
    }

    StaffRecord {
        id: record_id("staff", idx),
        name,
        title,
        email: fields.email().unwrap_or_default(),
        phone: fields.phone().unwrap_or_default(),
        bio: sub_text(element, BIO_SELECTOR),
        photo: fields.photo.clone().unwrap_or_default(),
    }
}
