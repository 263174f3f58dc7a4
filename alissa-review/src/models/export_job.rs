//! Export job state machine
//!
//! Requested → Polling → Ready, with Failed and TimedOut as the other
//! terminal states.

use std::time::{Duration, Instant};

use super::{AnalysisKind, VariantKind};

/// Lifecycle state of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Export created, no fetch attempted yet
    Requested,
    /// Waiting for the server to materialize the result
    Polling,
    /// Payload retrieved
    Ready,
    /// Fetch failed with a non-retryable error
    Failed,
    /// Poll bounds exhausted
    TimedOut,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportState::Ready | ExportState::Failed | ExportState::TimedOut
        )
    }
}

/// State transition record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTransition {
    pub old_state: ExportState,
    pub new_state: ExportState,
}

/// Ephemeral export job, never persisted
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub export_id: String,
    pub analysis_id: u64,
    pub analysis_kind: AnalysisKind,
    pub variant_kind: VariantKind,
    /// Sizes the poll delay
    pub expected_variant_count: u64,
    pub state: ExportState,
    /// Fetch attempts made so far
    pub attempts: u32,
    started_at: Instant,
}

impl ExportJob {
    pub fn new(
        export_id: String,
        analysis_id: u64,
        analysis_kind: AnalysisKind,
        variant_kind: VariantKind,
        expected_variant_count: u64,
    ) -> Self {
        Self {
            export_id,
            analysis_id,
            analysis_kind,
            variant_kind,
            expected_variant_count,
            state: ExportState::Requested,
            attempts: 0,
            started_at: Instant::now(),
        }
    }

    pub fn transition_to(&mut self, new_state: ExportState) -> ExportTransition {
        let transition = ExportTransition {
            old_state: self.state,
            new_state,
        };
        self.state = new_state;

        tracing::debug!(
            analysis_id = self.analysis_id,
            export_id = %self.export_id,
            variant_kind = %self.variant_kind,
            old_state = ?transition.old_state,
            new_state = ?transition.new_state,
            terminal = new_state.is_terminal(),
            "Export state transition"
        );

        transition
    }

    /// Time since the export was requested
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
