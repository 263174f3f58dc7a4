//! Services: Alissa API access, export polling, label counting, aggregation

pub mod alissa_client;
pub mod analysis_aggregator;
pub mod export_poller;
pub mod label_classifier;

pub use alissa_client::{AlissaClient, AnalysisFilter, DataFileFilter, PatientFilter, VCF_FILE_TYPE};
pub use analysis_aggregator::{AnalysisAggregator, AnalysisDecision, RunSummary, SkipReason};
pub use export_poller::{base_delay_units, ExportPoller, PollPolicy};
