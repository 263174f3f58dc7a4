//! Manual review run: store → Alissa → store

use alissa_common::config::{ConnectionConfig, ExportSettings};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::db::ReviewStore;
use crate::error::ReviewResult;
use crate::services::{AlissaClient, AnalysisAggregator, AnalysisFilter, PollPolicy, RunSummary};

/// Listing status reviewed by default
pub const DEFAULT_STATUS: &str = "IN_PROGRESS";

/// Analyses created before this date are not listed by default
pub fn default_created_after() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default()
}

/// Timestamp format the listing expects, e.g. `2021-01-01T00:00:00.000+0000`
pub fn created_after_param(date: NaiveDate) -> String {
    format!("{}T00:00:00.000+0000", date.format("%Y-%m-%d"))
}

/// Inputs for one manual review run
#[derive(Debug, Clone)]
pub struct ManualReviewOptions {
    /// Review store (TSV) to read and rewrite
    pub database: PathBuf,
    pub filter: AnalysisFilter,
    pub export: ExportSettings,
}

impl ManualReviewOptions {
    pub fn new(database: PathBuf) -> Self {
        Self {
            database,
            filter: AnalysisFilter {
                status: Some(DEFAULT_STATUS.to_string()),
                created_after: Some(created_after_param(default_created_after())),
                ..Default::default()
            },
            export: ExportSettings::default(),
        }
    }
}

/// Run the manual review aggregation end to end
///
/// The store is loaded (and its header validated) before any request is
/// made. Rows are persisted as each analysis completes; the store file is
/// replaced only when the whole run succeeds.
pub async fn run_manual_review(
    connection: &ConnectionConfig,
    options: &ManualReviewOptions,
) -> ReviewResult<RunSummary> {
    let store = ReviewStore::load(&options.database)?;

    let client = AlissaClient::connect(connection).await?;
    let analyses = client.get_analyses(&options.filter).await?;
    tracing::info!(
        analyses = analyses.len(),
        known = store.len(),
        status = ?options.filter.status,
        created_after = ?options.filter.created_after,
        "Listed analyses"
    );

    let mut writer = store.begin_run()?;
    let aggregator = AnalysisAggregator::new(
        &client,
        PollPolicy::from(&options.export),
        options.export.large_analysis_threshold,
    );

    let summary = aggregator.run(&analyses, &store, &mut writer).await?;
    writer.commit()?;
    client.close();

    tracing::info!(
        listed = summary.listed,
        reused = summary.reused,
        reviewed = summary.reviewed,
        skipped_large = summary.skipped_large,
        skipped_ineligible = summary.skipped_ineligible,
        rows = summary.rows_written,
        "Manual review run complete"
    );

    Ok(summary)
}
