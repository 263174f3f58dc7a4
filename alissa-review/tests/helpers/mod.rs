//! Test helper modules for alissa-review integration tests
//!
//! - MockAlissa: in-process Alissa Interpret API with request accounting

pub mod mock_alissa;

pub use mock_alissa::{
    analysis_detail, analysis_summary, variant, ExportRequestLog, MockAlissa, MockState,
};

use alissa_common::config::ExportSettings;
use alissa_review::ManualReviewOptions;
use std::path::PathBuf;

/// Run options with millisecond poll units so tests finish quickly
pub fn fast_options(database: PathBuf) -> ManualReviewOptions {
    let mut options = ManualReviewOptions::new(database);
    options.export = ExportSettings {
        time_unit_ms: 1,
        max_attempts: 20,
        timeout_secs: 30,
        ..ExportSettings::default()
    };
    options
}
