//! # Alissa Common Library
//!
//! Shared code for the Alissa Interpret tooling:
//! - Error type used across crates
//! - Configuration loading (CLI > environment > TOML file)
//! - Query parameter helpers for the public API

pub mod config;
pub mod error;
pub mod params;

pub use error::{Error, Result};
