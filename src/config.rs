//! Run configuration
//!
//! Everything comes from the process environment. A local `.env` file is
//! loaded first when present; real environment variables win over it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AuthenticationError;

pub const DEFAULT_BASE_URL: &str = "https://members.instantchurchdirectory.com";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_EXPORT_ROOT: &str = "exports";
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Login credentials. `Debug` never prints the password.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub base_url: String,
    pub webdriver_url: String,
    pub export_root: PathBuf,
    pub headless: bool,
    pub max_concurrent_downloads: usize,
    pub timeouts: Timeouts,
}

/// Bounds on every browser wait.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub navigation: Duration,
    pub settle: Duration,
    pub render: Duration,
    pub login_field: Duration,
    pub login_settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(15),
            settle: Duration::from_secs(10),
            render: Duration::from_secs(2),
            login_field: Duration::from_secs(10),
            login_settle: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the environment.
    pub fn from_env() -> Result<Self, AuthenticationError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Credentials are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthenticationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (username, password) = match (get("ICD_USERNAME"), get("ICD_PASSWORD")) {
            (Some(u), Some(p)) => (u, p),
            _ => return Err(AuthenticationError::MissingCredentials),
        };

        let base_url = get("ICD_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let headless = get("HEADLESS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        let max_concurrent_downloads = get("MAX_CONCURRENT_DOWNLOADS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS);

        Ok(Self {
            credentials: Credentials { username, password },
            base_url,
            webdriver_url: get("WEBDRIVER_URL").unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            export_root: PathBuf::from(get("EXPORT_ROOT").unwrap_or_else(|| DEFAULT_EXPORT_ROOT.to_string())),
            headless,
            max_concurrent_downloads,
            timeouts: Timeouts::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_password_fails_fast() {
        let result = Config::from_lookup(lookup(&[("ICD_USERNAME", "me@example.com")]));
        assert!(matches!(result, Err(AuthenticationError::MissingCredentials)));
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let result = Config::from_lookup(lookup(&[("ICD_USERNAME", "  "), ("ICD_PASSWORD", "x")]));
        assert!(matches!(result, Err(AuthenticationError::MissingCredentials)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("ICD_USERNAME", "me@example.com"),
            ("ICD_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(config.export_root, PathBuf::from("exports"));
        assert!(config.headless);
        assert_eq!(config.max_concurrent_downloads, 8);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ICD_USERNAME", "me@example.com"),
            ("ICD_PASSWORD", "secret"),
            ("ICD_BASE_URL", "https://dir.example.org/"),
            ("HEADLESS", "false"),
            ("MAX_CONCURRENT_DOWNLOADS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://dir.example.org");
        assert!(!config.headless);
        assert_eq!(config.max_concurrent_downloads, DEFAULT_MAX_CONCURRENT_DOWNLOADS);
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials {
            username: "u".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
