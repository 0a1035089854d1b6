//! Weblet Core Library
//!
//! This crate provides shared types, errors, validation, and path
//! resolution for Weblet.

pub mod error;
pub mod paths;
pub mod types;
pub mod validation;

pub use error::{WebletError, WebletResult};
pub use paths::Paths;

/// Current unix timestamp in seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}
