//! Analysis record: one row of the manual review store

use super::{AnalysisKind, AnalysisSummary, VariantTotals};

/// Status tag stored for analyses too large to export
pub const SKIPPED_LARGE_ANALYSIS: &str = "skipped_large_analysis";

/// Manual review label counts for one variant list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub y: u64,
    pub y2: u64,
    pub y3_rare: u64,
}

impl LabelCounts {
    pub fn new(y: u64, y2: u64, y3_rare: u64) -> Self {
        Self { y, y2, y3_rare }
    }

    pub fn total(&self) -> u64 {
        self.y + self.y2 + self.y3_rare
    }
}

/// What happened to an analysis' variant lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Both variant lists were exported and classified
    Reviewed {
        molecular: LabelCounts,
        cnv: LabelCounts,
    },
    /// Molecular variant count above the export threshold
    SkippedLargeAnalysis,
}

impl ReviewOutcome {
    /// `result_status` column value, if any
    pub fn status(&self) -> Option<&'static str> {
        match self {
            ReviewOutcome::Reviewed { .. } => None,
            ReviewOutcome::SkippedLargeAnalysis => Some(SKIPPED_LARGE_ANALYSIS),
        }
    }
}

/// One analysis' entry in the store
///
/// Once persisted, a record is reused verbatim by later runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub reference: String,
    pub analysis_type: AnalysisKind,
    pub pipeline_name: String,
    /// Target panel names joined with `,`
    pub target_panel: String,
    /// `YYYY-MM-DD`
    pub created_on: String,
    /// `YYYY-MM-DD`
    pub last_updated_on: String,
    pub molecular_variant_count: u64,
    pub cnv_count: u64,
    pub outcome: ReviewOutcome,
}

impl AnalysisRecord {
    /// Build a record from listing data plus the computed outcome
    pub fn from_summary(
        summary: &AnalysisSummary,
        kind: AnalysisKind,
        totals: VariantTotals,
        outcome: ReviewOutcome,
    ) -> Self {
        Self {
            reference: summary.reference.clone(),
            analysis_type: kind,
            pipeline_name: summary.analysis_pipeline_name.clone().unwrap_or_default(),
            target_panel: summary.target_panel_names.join(","),
            created_on: date_prefix(&summary.created_on),
            last_updated_on: date_prefix(&summary.last_updated_on),
            molecular_variant_count: totals.molecular,
            cnv_count: totals.cnv,
            outcome,
        }
    }
}

/// Date part of an API timestamp (`2021-03-04T10:11:12.000+0000` → `2021-03-04`)
pub fn date_prefix(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}
