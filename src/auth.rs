//! Login flow
//!
//! Handles both the two-step form (email, submit, then password) and the
//! single-page form (both fields visible at once).

use anyhow::Result;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::browser::{Page, WebDriverPage};
use crate::config::{Config, Credentials, Timeouts};
use crate::error::AuthenticationError;
use crate::extract::document_text;

pub const USERNAME_SELECTOR: &str =
    r#"input[type="email"], input[type="text"], input[name="email"], input[name="username"]"#;
pub const PASSWORD_SELECTOR: &str = r#"input[type="password"]"#;
pub const SUBMIT_SELECTOR: &str = r#"button[type="submit"], input[type="submit"]"#;
pub const LOGIN_ERROR_SELECTOR: &str = r#".error, .alert, [role="alert"]"#;

const SIGN_IN_URL_PATTERN: &str = r"(?i)login|signin|sign-in|sign_in";

/// Launch a browser and log in. The caller owns the returned page and must
/// close it; on failure the browser has already been closed.
pub async fn get_authenticated_page(config: &Config) -> Result<WebDriverPage, AuthenticationError> {
    info!("Starting browser...");
    let page = WebDriverPage::launch(&config.webdriver_url, config.headless)
        .await
        .map_err(|e| AuthenticationError::BrowserLaunch(format!("{:#}", e)))?;

    match login(&page, &config.credentials, &config.base_url, &config.timeouts).await {
        Ok(()) => Ok(page),
        Err(e) => {
            if let Err(close_err) = page.close().await {
                warn!("Failed to quit browser: {}", close_err);
            }
            Err(e)
        }
    }
}

/// Fill and submit the login form on an already open page.
pub async fn login(
    page: &dyn Page,
    credentials: &Credentials,
    base_url: &str,
    timeouts: &Timeouts,
) -> Result<(), AuthenticationError> {
    login_steps(page, credentials, base_url, timeouts)
        .await
        .map_err(AuthenticationError::from_any)
}

async fn login_steps(
    page: &dyn Page,
    credentials: &Credentials,
    base_url: &str,
    timeouts: &Timeouts,
) -> Result<()> {
    info!("Navigating to login page...");
    page.goto(base_url, timeouts.navigation).await?;

    if !page.wait_for(USERNAME_SELECTOR, timeouts.login_field).await? {
        return Err(AuthenticationError::InputNotFound("email").into());
    }

    info!("Logging in as {}...", credentials.username);
    page.fill(USERNAME_SELECTOR, &credentials.username).await?;

    if page.exists(PASSWORD_SELECTOR).await? {
        page.fill(PASSWORD_SELECTOR, &credentials.password).await?;
        submit(page, PASSWORD_SELECTOR).await?;
    } else {
        submit(page, USERNAME_SELECTOR).await?;
        if !page.wait_for(PASSWORD_SELECTOR, timeouts.login_field).await? {
            return Err(AuthenticationError::InputNotFound("password").into());
        }
        page.fill(PASSWORD_SELECTOR, &credentials.password).await?;
        submit(page, PASSWORD_SELECTOR).await?;
    }

    page.settle(timeouts.login_settle).await?;

    let current_url = page.current_url().await?;
    if still_on_sign_in(&current_url, base_url) {
        let html = page.content().await.unwrap_or_default();
        return Err(match login_error_message(&html) {
            Some(message) => AuthenticationError::Rejected(message),
            None => AuthenticationError::StillOnSignIn,
        }
        .into());
    }

    info!("Authentication successful!");
    Ok(())
}

/// Click a submit button when there is one, otherwise press Enter in `field`.
async fn submit(page: &dyn Page, field: &str) -> Result<()> {
    if !page.click(SUBMIT_SELECTOR).await? {
        page.press_enter(field).await?;
    }
    Ok(())
}

fn sign_in_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(SIGN_IN_URL_PATTERN).ok()).as_ref()
}

pub fn still_on_sign_in(current_url: &str, base_url: &str) -> bool {
    let on_pattern = sign_in_regex().is_some_and(|re| re.is_match(current_url));
    on_pattern || current_url.trim_end_matches('/') == base_url.trim_end_matches('/')
}

pub fn login_error_message(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document_text(&document, LOGIN_ERROR_SELECTOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://members.instantchurchdirectory.com";

    #[test]
    fn test_still_on_sign_in() {
        assert!(still_on_sign_in("https://members.instantchurchdirectory.com/", BASE));
        assert!(still_on_sign_in("https://members.instantchurchdirectory.com/Account/Login?r=1", BASE));
        assert!(still_on_sign_in("https://auth.example.com/signin", BASE));
        assert!(!still_on_sign_in(
            "https://members.instantchurchdirectory.com/directory/0f8fad5b-d9cb-469f-a165-70867728950e",
            BASE
        ));
    }

    #[test]
    fn test_sign_in_pattern_compiles() {
        assert!(sign_in_regex().is_some());
        assert!(still_on_sign_in("https://x.org/Sign-In", BASE));
        assert!(still_on_sign_in("https://x.org/users/sign_in", BASE));
    }

    #[test]
    fn test_login_error_message() {
        let html = r#"<html><body><form><div role="alert"> Invalid   password </div></form></body></html>"#;
        assert_eq!(login_error_message(html).as_deref(), Some("Invalid password"));
        assert!(login_error_message("<html><body><form></form></body></html>").is_none());
    }
}
