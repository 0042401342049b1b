//! Shared test helpers: an in-memory `Page` that serves fixture HTML.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use directory_export::browser::Page;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE: &str = "http://127.0.0.1:1";
pub const DIRECTORY_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

pub fn landing_url() -> String {
    format!("{}/directory/{}", BASE, DIRECTORY_ID)
}

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {:?}: {}", path, e))
}

pub enum Response {
    Html(String),
    Error(String),
    Timeout,
}

/// Routes URLs to canned responses. Submitting a form on a page with a
/// registered submit target moves the page there.
pub struct FakePage {
    routes: HashMap<String, Response>,
    submit_targets: HashMap<String, String>,
    current: Mutex<String>,
    pub filled: Mutex<Vec<(String, String)>>,
    pub visited: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakePage {
    pub fn new(start_url: &str) -> Self {
        Self {
            routes: HashMap::new(),
            submit_targets: HashMap::new(),
            current: Mutex::new(start_url.to_string()),
            filled: Mutex::new(Vec::new()),
            visited: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn html(mut self, url: &str, fixture_name: &str) -> Self {
        self.routes.insert(url.to_string(), Response::Html(fixture(fixture_name)));
        self
    }

    pub fn error(mut self, url: &str, message: &str) -> Self {
        self.routes.insert(url.to_string(), Response::Error(message.to_string()));
        self
    }

    pub fn timeout(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Response::Timeout);
        self
    }

    pub fn on_submit(mut self, from: &str, to: &str) -> Self {
        self.submit_targets.insert(from.to_string(), to.to_string());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn matches(&self, selector: &str) -> Result<bool> {
        let html = self.current_html()?;
        let selector = Selector::parse(selector).map_err(|e| anyhow!("bad selector {}: {:?}", selector, e))?;
        Ok(Html::parse_document(&html).select(&selector).next().is_some())
    }

    fn current_html(&self) -> Result<String> {
        let url = self.current();
        match self.routes.get(&url) {
            Some(Response::Html(html)) => Ok(html.clone()),
            _ => Err(anyhow!("no document loaded at {}", url)),
        }
    }

    fn submit(&self) {
        let url = self.current();
        if let Some(target) = self.submit_targets.get(&url) {
            *self.current.lock().unwrap() = target.clone();
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some(Response::Html(_)) => {
                *self.current.lock().unwrap() = url.to_string();
                Ok(())
            }
            Some(Response::Error(message)) => Err(anyhow!("{}", message)),
            Some(Response::Timeout) => Err(anyhow!("Timed out after {:?} navigating to {}", timeout, url)),
            None => Err(anyhow!("HTTP 404 for {}", url)),
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.current())
    }

    async fn content(&self) -> Result<String> {
        self.current_html()
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        self.matches(selector)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.matches(selector)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        if !self.matches(selector)? {
            return Err(anyhow!("No input matching {}", selector));
        }
        self.filled
            .lock()
            .unwrap()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        if !self.matches(selector)? {
            return Ok(false);
        }
        self.submit();
        Ok(true)
    }

    async fn press_enter(&self, _selector: &str) -> Result<()> {
        self.submit();
        Ok(())
    }

    async fn settle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
