//! # Seamloop Common Library
//!
//! Shared code for the seamloop workspace:
//! - Error types
//! - TOML configuration loading and config file resolution
//! - Seconds/samples conversion helpers

pub mod config;
pub mod error;
pub mod timing;

pub use error::{Error, Result};
