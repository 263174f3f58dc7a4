//! Data models

pub mod analysis;
pub mod export_job;
pub mod record;

pub use analysis::{
    AnalysisDetail, AnalysisKind, AnalysisSummary, AnalysisVariantCount, ExportHandle,
    ExportRequest, LabResult, LabelsScore, VariantKind, VariantRecord, VariantTotals,
};
pub use export_job::{ExportJob, ExportState, ExportTransition};
pub use record::{date_prefix, AnalysisRecord, LabelCounts, ReviewOutcome, SKIPPED_LARGE_ANALYSIS};
