use anyhow::Result;
use regex::Regex;
use scraper::ElementRef;
use tracing::info;

use super::{extract_records, record_id, SectionContext, UrlStrategy};
use crate::extract::{read_element, sub_text};
use crate::types::GroupRecord;

/// Groups live at one of these paths depending on how the directory is set up.
pub const GROUP_CANDIDATE_PATHS: &[&str] = &["/groups", "/ministries", "/smallgroups"];

pub const GROUP_SELECTORS: &[&str] = &[
    r#".group, .ministry, [class*="group"], [class*="ministry"]"#,
    r#"article, .card, [role="article"]"#,
];

const DESCRIPTION_SELECTOR: &str = r#".description, [class*="description"], p"#;
const LEADERS_PATTERN: &str = r"(?i)(?:leaders?|led by)\s*:\s*([^\n]+)";

pub async fn scrape_groups(ctx: &SectionContext<'_>) -> Result<Vec<GroupRecord>> {
    info!("Scraping groups...");
    let html = ctx.load_section(UrlStrategy::Candidates(GROUP_CANDIDATE_PATHS)).await?;

    let leaders_re = Regex::new(LEADERS_PATTERN)?;
    let groups = extract_records(&html, GROUP_SELECTORS, "group", |idx, element| {
        Ok(parse_group(idx, element, ctx.base_url, &leaders_re))
    });

    info!("  Successfully scraped {} groups", groups.len());
    Ok(groups)
}

pub fn parse_group(idx: usize, element: &ElementRef, base_url: &str, leaders_re: &Regex) -> Option<GroupRecord> {
    let fields = read_element(element, base_url);
    let name = fields.name();
    if name.is_empty() {
        return None;
    }

    let leaders = leaders_re
        .captures(&fields.text)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(GroupRecord {
        id: record_id("group", idx),
        name,
        description: sub_text(element, DESCRIPTION_SELECTOR).unwrap_or_default(),
        leaders,
        photo: fields.photo.clone().unwrap_or_default(),
    })
}
