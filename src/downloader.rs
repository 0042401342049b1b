//! Asset Downloader Module
//!
//! Fetches photos and attachments to disk.
//!
//! - Filenames come from the URL path, or from a SHA-256 of the URL when the
//!   path has no usable name
//! - An existing file at the target path is reused without a request
//! - Bounded retry with exponential backoff; failure yields an empty path
//! - Batch downloads share one connection pool and never fail as a whole

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Total attempts per URL, including the first
pub const MAX_ATTEMPTS: u32 = 3;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Base delay for exponential backoff (milliseconds)
const BASE_BACKOFF_MS: u64 = 500;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_attempts: u32,
    backoff: Duration,
    max_concurrent: usize,
}

impl Downloader {
    pub fn new(max_concurrent: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_attempts: MAX_ATTEMPTS,
            backoff: Duration::from_millis(BASE_BACKOFF_MS),
            max_concurrent: max_concurrent.max(1),
        })
    }

    /// Override the base retry delay. Zero disables waiting between attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Download `url` into `dest_dir` and return the local path as a string.
    ///
    /// Returns an empty string for an empty URL or when every attempt failed.
    pub async fn download_asset(&self, url: &str, dest_dir: &Path) -> String {
        let url = url.trim();
        if url.is_empty() {
            return String::new();
        }

        match self.try_download(url, dest_dir).await {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                warn!("Error downloading {}: {:#}", url, e);
                String::new()
            }
        }
    }

    async fn try_download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", dest_dir))?;

        let path = dest_dir.join(asset_filename(url));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Already downloaded: {:?}", path);
            return Ok(path);
        }

        let mut last_error = anyhow!("no attempts made");
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // Exponential backoff: base, 2x base, 4x base...
                let delay = self.backoff * (1u32 << (attempt - 1));
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!("Retry {}/{} for {}", attempt + 1, self.max_attempts, url);
            }

            match self.fetch(url).await {
                Ok(bytes) => {
                    write_atomically(&path, &bytes).await?;
                    return Ok(path);
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error.context(format!("gave up after {} attempts", self.max_attempts)))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(anyhow!("HTTP {}", status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Download many URLs concurrently. Returns `url -> local path` for the
    /// ones that succeeded; failures are logged and left out.
    ///
    /// URLs that map to the same local filename share one download, so no
    /// two writers in a batch ever target the same file.
    pub async fn download_batch(&self, urls: &[String], dest_dir: &Path) -> HashMap<String, String> {
        let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
        for url in urls {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            let filename = asset_filename(url);
            match groups.iter_mut().find(|(name, _)| *name == filename) {
                Some((_, members)) => {
                    if !members.contains(&url) {
                        members.push(url);
                    }
                }
                None => groups.push((filename, vec![url])),
            }
        }

        let mut results = HashMap::new();
        for chunk in groups.chunks(self.max_concurrent) {
            let futures = chunk.iter().map(|(_, members)| async move {
                let mut path = String::new();
                for url in members {
                    path = self.download_asset(url, dest_dir).await;
                    if !path.is_empty() {
                        break;
                    }
                }
                (members, path)
            });

            for (members, path) in futures::future::join_all(futures).await {
                if path.is_empty() {
                    continue;
                }
                for url in members {
                    results.insert(url.to_string(), path.clone());
                }
            }
        }
        results
    }
}

/// Local filename for a URL. Same URL, same name, on every run.
pub fn asset_filename(url: &str) -> String {
    let from_path = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
    });

    match from_path {
        Some(name) if name.contains('.') && is_safe_filename(&name) => name,
        _ => format!("asset_{}.jpg", url_hash(url)),
    }
}

fn is_safe_filename(name: &str) -> bool {
    !name.starts_with('.') && !name.contains(['\\', ':', '%']) && name.len() <= 200
}

/// First 12 hex chars of SHA-256 over the URL string.
fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..12].to_string()
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", partial))?;
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("Failed to move download into {:?}", path))?;
    Ok(())
}
