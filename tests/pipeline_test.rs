//! End-to-end runs over fixture pages with an in-memory browser

mod common;

use common::{landing_url, FakePage, BASE, DIRECTORY_ID};
use directory_export::config::Timeouts;
use directory_export::downloader::Downloader;
use directory_export::pipeline::{run, RunOptions};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

fn options(root: &Path) -> RunOptions {
    RunOptions {
        base_url: BASE.to_string(),
        export_root: root.to_path_buf(),
        timeouts: Timeouts {
            render: Duration::ZERO,
            ..Timeouts::default()
        },
    }
}

/// Photo hosts are unreachable, so every download fails fast.
fn downloader() -> Downloader {
    Downloader::new(4)
        .unwrap()
        .with_backoff(Duration::ZERO)
        .with_max_attempts(1)
}

fn section_url(path: &str) -> String {
    format!("{}/{}/{}", BASE, path, DIRECTORY_ID)
}

fn directory_site(landing: &str) -> FakePage {
    FakePage::new(landing)
        .html(&section_url("staff"), "staff.html")
        .html(&section_url("birthdays"), "birthdays.html")
        .html(&section_url("anniversaries"), "anniversaries.html")
        .error(&format!("{}/groups", BASE), "HTTP 404")
        .html(&format!("{}/ministries", BASE), "groups.html")
        .html(&format!("{}/bulletins", BASE), "bulletin.html")
}

fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_full_run_exports_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let page = directory_site(&landing_url()).html(&landing_url(), "families.html");

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert!(summary.errors.is_empty(), "unexpected errors: {:?}", summary.errors);
    assert_eq!(summary.families, 2);
    assert_eq!(summary.staff, 2);
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.birthdays, 2);
    assert_eq!(summary.anniversaries, 1);
    assert_eq!(summary.pages, 1);

    let families = read_json(&dir.path().join("families").join("families.json"));
    assert_eq!(families["metadata"]["total_records"], 2);
    assert_eq!(families["metadata"]["source"], BASE);
    let first = &families["families"][0];
    assert_eq!(first["id"], "family_001");
    assert_eq!(first["name"], "Smith, John & Mary");
    assert_eq!(first["photo"], "");
    assert_eq!(first["contact"]["email"], "john.smith@example.org");
    assert_eq!(first["members"][2]["age"], 12);

    let staff = read_json(&dir.path().join("staff").join("staff.json"));
    assert_eq!(staff["staff"][0]["title"], "Senior Pastor");
    assert_eq!(staff["staff"][1]["name"], "Staff 2");

    let groups = read_json(&dir.path().join("groups").join("groups.json"));
    assert_eq!(groups["groups"][0]["leaders"][1], "Ben Cole");

    let events = read_json(&dir.path().join("events.json"));
    assert_eq!(events["metadata"]["total_records"], 3);
    assert_eq!(events["birthdays"][1]["date"], "July 19");
    assert_eq!(events["anniversaries"][0]["family"], "John & Mary Smith");

    let pages = read_json(&dir.path().join("additional_pages").join("additional_pages.json"));
    assert_eq!(pages["additional_pages"][0]["title"], "Weekly Bulletin");
    assert_eq!(
        pages["additional_pages"][0]["asset_urls"][1],
        format!("{}/files/bulletin.pdf", BASE)
    );
}

#[tokio::test]
async fn test_failed_section_does_not_stop_run() {
    let dir = tempfile::tempdir().unwrap();
    let page = directory_site(&landing_url()).timeout(&landing_url());

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert_eq!(summary.families, 0);
    assert_eq!(summary.staff, 2);
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.birthdays, 2);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.errors[0].starts_with("Error scraping families:"));
    assert!(summary.errors[0].contains("Timed out"));
    assert!(summary.errors[1].starts_with("Error scraping pages:"));

    assert!(!dir.path().join("families").join("families.json").exists());
    assert!(dir.path().join("families").join("photos").is_dir());
    assert!(dir.path().join("staff").join("staff.json").exists());
    assert!(dir.path().join("events.json").exists());
}

#[tokio::test]
async fn test_landing_without_directory_id() {
    let dir = tempfile::tempdir().unwrap();
    let landing = format!("{}/home", BASE);
    let page = directory_site(&landing).html(&landing, "families.html");

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert_eq!(summary.families, 2);
    assert_eq!(summary.staff, 0);
    assert!(summary
        .errors
        .iter()
        .any(|e| e.starts_with("Error scraping staff:") && e.contains("directory ID")));
    assert!(summary.errors.iter().any(|e| e.starts_with("Error scraping events:")));
    assert!(!dir.path().join("events.json").exists());
}

#[tokio::test]
async fn test_groups_fail_when_no_candidate_loads() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(&landing_url())
        .html(&landing_url(), "families.html")
        .html(&section_url("staff"), "staff.html")
        .html(&section_url("birthdays"), "birthdays.html")
        .html(&section_url("anniversaries"), "anniversaries.html");

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert_eq!(summary.groups, 0);
    assert!(summary.errors.iter().any(|e| e.starts_with("Error scraping groups:")));
    let visited = page.visited.lock().unwrap().clone();
    for path in ["/groups", "/ministries", "/smallgroups"] {
        assert!(visited.contains(&format!("{}{}", BASE, path)));
    }
}

#[tokio::test]
async fn test_anniversaries_failure_keeps_birthdays() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(&landing_url())
        .html(&landing_url(), "families.html")
        .html(&section_url("staff"), "staff.html")
        .html(&section_url("birthdays"), "birthdays.html")
        .timeout(&section_url("anniversaries"))
        .html(&format!("{}/groups", BASE), "groups.html")
        .html(&format!("{}/bulletins", BASE), "bulletin.html");

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert_eq!(summary.birthdays, 2);
    assert_eq!(summary.anniversaries, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("Error scraping anniversaries:"));

    let events = read_json(&dir.path().join("events.json"));
    assert_eq!(events["metadata"]["total_records"], 2);
    assert_eq!(events["birthdays"][0]["name"], "Emma Smith");
    assert_eq!(events["anniversaries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_failing_page_is_skipped_and_siblings_kept() {
    let dir = tempfile::tempdir().unwrap();
    let page = directory_site(&landing_url())
        .html(&landing_url(), "landing_nav.html")
        .error(&format!("{}/calendar", BASE), "HTTP 500");

    let summary = run(&page, &options(dir.path()), &downloader()).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert!(summary.errors.is_empty(), "unexpected errors: {:?}", summary.errors);

    let pages = read_json(&dir.path().join("additional_pages").join("additional_pages.json"));
    let records = pages["additional_pages"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "page_002");
    assert_eq!(records[0]["url"], format!("{}/bulletins", BASE));
}
