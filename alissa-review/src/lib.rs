//! alissa-review library interface
//!
//! Counts manual review labels of Alissa Interpret analyses and keeps the
//! results in a tab-separated store. Exposes public APIs for integration
//! testing.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ReviewError, ReviewResult};
pub use crate::workflow::{run_manual_review, ManualReviewOptions};
