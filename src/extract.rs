//! Element Extraction Module
//!
//! Pure helpers shared by every section scraper:
//! - visible text of an element, split into trimmed lines
//! - heading / image / link sub-queries
//! - email, phone and street address patterns
//! - URL normalization against the site origin
//! - ordered selector fallback

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::warn;

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"(?:\+?1[-. ]?)?\(?\b([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})\b";
const ADDRESS_PATTERN: &str = r"(?i)\d+\s+[\w\s.]+?(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Way|Circle|Cir)\.?[,\s]+[\w\s]+?,?\s+[A-Z]{2}\s+\d{5}(?:-\d{4})?";
const DIRECTORY_ID_PATTERN: &str = r"/([a-f0-9-]{36})";

pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4, .name";

/// Tags that start a new rendered line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn email_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&CELL, EMAIL_PATTERN)
}

fn phone_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&CELL, PHONE_PATTERN)
}

fn address_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&CELL, ADDRESS_PATTERN)
}

fn directory_id_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&CELL, DIRECTORY_ID_PATTERN)
}

/// Rendered text of an element: block boundaries and `<br>` become newlines,
/// hidden content is skipped.
pub fn visible_text(element: &ElementRef) -> String {
    let mut out = String::new();
    push_visible_text(element, &mut out);
    out
}

fn push_visible_text(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    push_visible_text(&child_ref, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Non-empty lines with inner whitespace collapsed.
pub fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Fields common to every section, read from one element.
#[derive(Debug, Clone, Default)]
pub struct ElementFields {
    pub text: String,
    pub lines: Vec<String>,
    pub heading: Option<String>,
    pub photo: Option<String>,
    pub link: Option<String>,
}

impl ElementFields {
    /// Heading sub-query first, then the first text line.
    pub fn name(&self) -> String {
        self.heading
            .clone()
            .or_else(|| self.lines.first().cloned())
            .unwrap_or_default()
    }

    pub fn first_line(&self) -> String {
        self.lines.first().cloned().unwrap_or_default()
    }

    pub fn second_line(&self) -> String {
        self.lines.get(1).cloned().unwrap_or_default()
    }

    pub fn email(&self) -> Option<String> {
        find_email(&self.text)
    }

    pub fn phone(&self) -> Option<String> {
        find_phone(&self.text)
    }

    pub fn address(&self) -> Option<String> {
        find_address(&self.text)
    }
}

pub fn read_element(element: &ElementRef, base_url: &str) -> ElementFields {
    let text = visible_text(element);
    let lines = text_lines(&text);

    let heading = sub_text(element, HEADING_SELECTOR);
    let photo = sub_attr(element, "img", "src").and_then(|src| normalize_asset_url(&src, base_url));
    let link = sub_attr(element, "a[href]", "href").and_then(|href| normalize_asset_url(&href, base_url));

    ElementFields {
        text: lines.join("\n"),
        lines,
        heading,
        photo,
        link,
    }
}

/// Visible text of the first descendant matching `selector`, if non-empty.
pub fn sub_text(element: &ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let found = element.select(&selector).next()?;
    let text = text_lines(&visible_text(&found)).join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Attribute of the first descendant matching `selector`.
pub fn sub_attr(element: &ElementRef, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    element
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn find_email(text: &str) -> Option<String> {
    email_regex()?.find(text).map(|m| m.as_str().to_string())
}

pub fn find_phone(text: &str) -> Option<String> {
    phone_regex()?.find(text).map(|m| m.as_str().to_string())
}

pub fn find_address(text: &str) -> Option<String> {
    // Addresses often wrap across two rendered lines.
    let flat = text.replace('\n', ", ");
    address_regex()?
        .find(&flat)
        .map(|m| m.as_str().trim().to_string())
}

/// True when a line is contact data rather than a name.
pub fn is_contact_line(line: &str) -> bool {
    line.contains('@') || find_phone(line).is_some()
}

/// Directory identifier embedded in a site URL.
pub fn directory_id(url: &str) -> Option<String> {
    directory_id_regex()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Make an `src`/`href` absolute against the site origin.
///
/// Data URIs and non-navigational links yield `None`.
pub fn normalize_asset_url(raw: &str, base_url: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let lower = raw.to_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:") {
        return None;
    }

    if raw.starts_with("//") {
        return Some(format!("https:{}", raw));
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(raw.to_string());
    }
    let base = base_url.trim_end_matches('/');
    if raw.starts_with('/') {
        return Some(format!("{}{}", base, raw));
    }

    reqwest::Url::parse(&format!("{}/", base))
        .and_then(|b| b.join(raw))
        .map(|u| u.to_string())
        .ok()
}

/// Query `selectors` in order and return the first non-empty match set
/// together with the selector that produced it.
pub fn select_with_fallback<'a>(
    document: &'a Html,
    selectors: &[&'static str],
) -> (Option<&'static str>, Vec<ElementRef<'a>>) {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping invalid selector {:?}: {:?}", selector_str, e);
                continue;
            }
        };
        let found: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !found.is_empty() {
            return (Some(selector_str), found);
        }
    }
    (None, Vec::new())
}

/// First match of a comma-separated selector in a whole document.
pub fn document_text(document: &Html, selector: &str) -> Option<String> {
    sub_text(&document.root_element(), selector)
}

/// Truncate to at most `max` characters on a char boundary.
pub fn cap_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `"/news/spring-picnic"` -> `"Spring Picnic"`.
pub fn title_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    segment
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
