use thiserror::Error;

/// Fatal login failures. Anything here ends the run with exit code 1.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("ICD_USERNAME and ICD_PASSWORD must be set in the environment or .env file")]
    MissingCredentials,

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("login form {0} input not found")]
    InputNotFound(&'static str),

    #[error("Login failed: {0}")]
    Rejected(String),

    #[error("Login failed: still on sign-in page")]
    StillOnSignIn,

    #[error("Authentication failed: {0}")]
    Other(String),
}

impl AuthenticationError {
    /// Wrap an arbitrary failure, keeping auth errors as they are.
    pub fn from_any(err: anyhow::Error) -> Self {
        match err.downcast::<AuthenticationError>() {
            Ok(auth) => auth,
            Err(other) => AuthenticationError::Other(format!("{:#}", other)),
        }
    }
}
