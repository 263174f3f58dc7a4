//! Per-analysis manual review aggregation
//!
//! Decision sequence for each listed analysis:
//! 1. Reference already in the store → reuse the stored record
//! 2. No classification tree, or not a PATIENT/INHERITANCE analysis → skip
//! 3. Fetch detail, sum variant counts over lab results
//! 4. Too many molecular variants → record `skipped_large_analysis`
//! 5. Export and classify molecular variants, then CNVs
//!
//! Analyses are handled strictly one after another; errors abort the run.

use crate::db::{ReviewStore, StoreWriter};
use crate::error::ReviewResult;
use crate::models::{AnalysisKind, AnalysisRecord, AnalysisSummary, ReviewOutcome, VariantKind};
use crate::services::{label_classifier, AlissaClient, ExportPoller, PollPolicy};

/// Why an analysis produced no row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoClassificationTree,
    UnsupportedAnalysisType,
}

/// Result of handling one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisDecision {
    /// Previously persisted record, reused as-is
    Reused(AnalysisRecord),
    /// Not eligible; nothing is written
    Skipped(SkipReason),
    /// Newly computed record
    Processed(AnalysisRecord),
}

impl AnalysisDecision {
    pub fn record(&self) -> Option<&AnalysisRecord> {
        match self {
            AnalysisDecision::Reused(record) | AnalysisDecision::Processed(record) => Some(record),
            AnalysisDecision::Skipped(_) => None,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub reused: usize,
    pub reviewed: usize,
    pub skipped_large: usize,
    pub skipped_ineligible: usize,
    pub rows_written: usize,
}

/// Whether an analysis is eligible for review
pub fn eligibility(summary: &AnalysisSummary) -> Result<AnalysisKind, SkipReason> {
    if !summary.has_classification_tree() {
        return Err(SkipReason::NoClassificationTree);
    }
    summary.kind().ok_or(SkipReason::UnsupportedAnalysisType)
}

pub struct AnalysisAggregator<'a> {
    client: &'a AlissaClient,
    poller: ExportPoller<'a>,
    large_analysis_threshold: u64,
}

impl<'a> AnalysisAggregator<'a> {
    pub fn new(client: &'a AlissaClient, policy: PollPolicy, large_analysis_threshold: u64) -> Self {
        Self {
            client,
            poller: ExportPoller::new(client, policy),
            large_analysis_threshold,
        }
    }

    /// Handle one analysis against the previously persisted records
    pub async fn process(
        &self,
        summary: &AnalysisSummary,
        store: &ReviewStore,
    ) -> ReviewResult<AnalysisDecision> {
        if let Some(existing) = store.get(&summary.reference) {
            tracing::debug!(reference = %summary.reference, "Already in store, reusing row");
            return Ok(AnalysisDecision::Reused(existing.clone()));
        }

        let kind = match eligibility(summary) {
            Ok(kind) => kind,
            Err(reason) => {
                tracing::debug!(
                    reference = %summary.reference,
                    analysis_type = %summary.analysis_type,
                    reason = ?reason,
                    "Skipping analysis"
                );
                return Ok(AnalysisDecision::Skipped(reason));
            }
        };

        let detail = self.client.get_analysis_detail(kind, summary.id).await?;
        let totals = detail.variant_totals();

        if totals.molecular > self.large_analysis_threshold {
            tracing::warn!(
                reference = %summary.reference,
                molecular_variant_count = totals.molecular,
                threshold = self.large_analysis_threshold,
                "Large analysis, not exporting variants"
            );
            return Ok(AnalysisDecision::Processed(AnalysisRecord::from_summary(
                summary,
                kind,
                totals,
                ReviewOutcome::SkippedLargeAnalysis,
            )));
        }

        let molecular_variants = self
            .poller
            .export_variants(summary.id, kind, VariantKind::MolecularVariant, totals.molecular)
            .await?;
        let molecular = label_classifier::classify(&molecular_variants);

        let cnv_variants = self
            .poller
            .export_variants(summary.id, kind, VariantKind::CopyNumberVariation, totals.cnv)
            .await?;
        let cnv = label_classifier::classify(&cnv_variants);

        tracing::info!(
            reference = %summary.reference,
            analysis_type = %kind,
            molecular_y = molecular.y,
            molecular_y2 = molecular.y2,
            molecular_y3_rare = molecular.y3_rare,
            cnv_y = cnv.y,
            cnv_y2 = cnv.y2,
            cnv_y3_rare = cnv.y3_rare,
            "Analysis reviewed"
        );

        Ok(AnalysisDecision::Processed(AnalysisRecord::from_summary(
            summary,
            kind,
            totals,
            ReviewOutcome::Reviewed { molecular, cnv },
        )))
    }

    /// Process analyses in listing order, persisting each row as it completes
    pub async fn run(
        &self,
        analyses: &[AnalysisSummary],
        store: &ReviewStore,
        writer: &mut StoreWriter,
    ) -> ReviewResult<RunSummary> {
        let mut summary = RunSummary {
            listed: analyses.len(),
            ..Default::default()
        };

        for analysis in analyses {
            let decision = self.process(analysis, store).await?;

            match &decision {
                AnalysisDecision::Reused(_) => summary.reused += 1,
                AnalysisDecision::Skipped(_) => summary.skipped_ineligible += 1,
                AnalysisDecision::Processed(record) => match record.outcome {
                    ReviewOutcome::SkippedLargeAnalysis => summary.skipped_large += 1,
                    ReviewOutcome::Reviewed { .. } => summary.reviewed += 1,
                },
            }

            if let Some(record) = decision.record() {
                writer.write(record)?;
            }
        }

        summary.rows_written = writer.rows_written();
        Ok(summary)
    }
}
