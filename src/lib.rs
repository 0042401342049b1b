//! Directory Export Library
//!
//! Logs into a church membership directory, scrapes each section and
//! exports the results as JSON with downloaded photos and assets.

pub mod auth;
pub mod browser;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod scrapers;
pub mod storage;
pub mod types;

pub use types::*;
