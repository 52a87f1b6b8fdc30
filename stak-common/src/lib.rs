//! # STAK Common Library
//!
//! Shared code for the STAK Sync services:
//! - Error type and result alias
//! - TOML bootstrap configuration and root folder resolution
//! - SQLite schema creation and versioned migrations

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
