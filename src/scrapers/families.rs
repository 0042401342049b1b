use anyhow::Result;
use regex::Regex;
use scraper::ElementRef;
use std::sync::OnceLock;
use tracing::info;

use super::{extract_records, record_id, SectionContext, UrlStrategy};
use crate::extract::{is_contact_line, read_element};
use crate::types::{Contact, FamilyMember, FamilyRecord};

pub const FAMILY_SELECTORS: &[&str] = &[
    ".js-icd-members-family-list-item",
    r#".member, .family, .person-card, [class*="member"], [class*="family"]"#,
    r#"article, .card, [role="article"]"#,
];

/// Lines that label the member above them rather than name someone.
const ROLE_WORDS: &[&str] = &[
    "head of household",
    "husband",
    "wife",
    "spouse",
    "father",
    "mother",
    "son",
    "daughter",
    "child",
    "grandfather",
    "grandmother",
];

const MEMBER_PATTERN: &str = r"^([A-Z][a-z'’-]+(?:\s+[A-Z][a-z'’-]+){0,3})(?:\s*\((\d{1,3})\)|,?\s+[Aa]ge\s+(\d{1,3}))?$";

fn member_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(MEMBER_PATTERN).ok()).as_ref()
}

/// The family list is the page the session lands on after login.
pub async fn scrape_families(ctx: &SectionContext<'_>) -> Result<Vec<FamilyRecord>> {
    info!("Scraping families...");
    let html = ctx.load_section(UrlStrategy::Landing).await?;

    let families = extract_records(&html, FAMILY_SELECTORS, "family", |idx, element| {
        Ok(parse_family(idx, element, ctx.base_url))
    });

    info!("  Successfully scraped {} families", families.len());
    Ok(families)
}

/// One family card. `None` when no name could be found.
pub fn parse_family(idx: usize, element: &ElementRef, base_url: &str) -> Option<FamilyRecord> {
    let fields = read_element(element, base_url);
    let name = fields.name();
    if name.is_empty() {
        return None;
    }

    let rest: Vec<&String> = fields
        .lines
        .iter()
        .skip(1)
        .filter(|line| **line != name && !is_contact_line(line))
        .collect();

    let members = parse_members(rest.iter().map(|s| s.as_str()));
    let members_text = rest.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("\n");

    Some(FamilyRecord {
        id: record_id("family", idx),
        name,
        members,
        members_text,
        photo: fields.photo.clone().unwrap_or_default(),
        detail_url: fields.link.clone().unwrap_or_default(),
        contact: Contact {
            email: fields.email(),
            phone: fields.phone(),
            address: fields.address(),
        },
    })
}

/// Name-looking lines become members; a relationship word right after a
/// member becomes that member's role.
pub fn parse_members<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<FamilyMember> {
    let Some(re) = member_regex() else {
        return Vec::new();
    };

    let mut members: Vec<FamilyMember> = Vec::new();
    for line in lines {
        if ROLE_WORDS.contains(&line.to_lowercase().as_str()) {
            if let Some(last) = members.last_mut() {
                if last.role.is_empty() {
                    last.role = line.to_string();
                }
            }
            continue;
        }

        if let Some(caps) = re.captures(line) {
            let age = caps
                .get(2)
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            members.push(FamilyMember {
                name: caps[1].to_string(),
                role: String::new(),
                age,
            });
        }
    }
    members
}
