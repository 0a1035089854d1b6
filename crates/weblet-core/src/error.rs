//! Error types for Weblet

use thiserror::Error;

/// Result type alias for Weblet operations
pub type WebletResult<T> = Result<T, WebletError>;

/// Main error type for Weblet
#[derive(Error, Debug)]
pub enum WebletError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Desktop integration error: {0}")]
    Desktop(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WebletError {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new profile error
    pub fn profile(msg: impl Into<String>) -> Self {
        Self::Profile(msg.into())
    }

    /// Create a new desktop integration error
    pub fn desktop(msg: impl Into<String>) -> Self {
        Self::Desktop(msg.into())
    }

    /// Create a new process error
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Whether this error should be surfaced to the user rather than
    /// swallowed after logging.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Store(_)
        )
    }
}
