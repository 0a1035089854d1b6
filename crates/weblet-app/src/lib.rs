//! Weblet application layer
//!
//! The pieces behind the `weblet` binary: lifecycle orchestration
//! over the storage/profile/desktop crates, site icon discovery,
//! running-instance tracking, and the standalone webapp runtime.

pub mod icon_fetcher;
pub mod manager;
pub mod process;
pub mod standalone;
