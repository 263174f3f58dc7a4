//! Asynchronous variant export polling
//!
//! Requests an export, then repeatedly waits and fetches until the server
//! has the result ready. The wait before each fetch scales with the expected
//! export size; the loop is bounded by an attempt count and a wall-clock
//! budget.
//!
//! **Algorithm:**
//! 1. Create the export (all variants, no review filters) → `Requested`
//! 2. Sleep `delay(attempt)` → `Polling`, fetch by export id
//! 3. HTTP error status: not ready yet, go to 2
//! 4. Any other error → `Failed`, returned to the caller
//! 5. Bounds exhausted → `TimedOut`, returned as `ExportTimedOut`

use alissa_common::config::ExportSettings;
use std::time::Duration;

use crate::error::{ReviewError, ReviewResult};
use crate::models::{AnalysisKind, ExportJob, ExportState, VariantKind, VariantRecord};
use crate::services::AlissaClient;

/// Delay before the first fetch, in time units: `max(expected / 100, 1)`
///
/// Larger exports need proportionally longer server-side processing.
pub fn base_delay_units(expected_variant_count: u64) -> f64 {
    (expected_variant_count as f64 / 100.0).max(1.0)
}

/// Bounds and pacing for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wall-clock length of one delay unit
    pub time_unit: Duration,
    /// Delay growth per not-ready reply; 1.0 keeps the delay constant
    pub backoff_multiplier: f64,
    /// Cap for grown delays, in time units (never below the base delay)
    pub max_delay_units: f64,
    pub max_attempts: u32,
    /// Budget per export, measured from creation
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for PollPolicy {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            time_unit: Duration::from_millis(settings.time_unit_ms),
            backoff_multiplier: settings.backoff_multiplier.max(1.0),
            max_delay_units: settings.max_delay_units,
            max_attempts: settings.max_attempts.max(1),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

impl PollPolicy {
    /// Delay in time units before fetch attempt `attempt` (1-based)
    pub fn delay_units(&self, expected_variant_count: u64, attempt: u32) -> f64 {
        let base = base_delay_units(expected_variant_count);
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let grown = base * self.backoff_multiplier.powi(exponent);

        grown.min(self.max_delay_units.max(base))
    }

    pub fn delay(&self, expected_variant_count: u64, attempt: u32) -> Duration {
        self.time_unit
            .mul_f64(self.delay_units(expected_variant_count, attempt))
    }

    /// Delay before attempt `attempt`, cut short at the end of the timeout
    pub fn wait_before(
        &self,
        expected_variant_count: u64,
        attempt: u32,
        elapsed: Duration,
    ) -> Duration {
        self.delay(expected_variant_count, attempt)
            .min(self.timeout.saturating_sub(elapsed))
    }
}

/// Drives one export from request to payload
pub struct ExportPoller<'a> {
    client: &'a AlissaClient,
    policy: PollPolicy,
}

impl<'a> ExportPoller<'a> {
    pub fn new(client: &'a AlissaClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Export all variants of `variant_kind` for one analysis
    pub async fn export_variants(
        &self,
        analysis_id: u64,
        analysis_kind: AnalysisKind,
        variant_kind: VariantKind,
        expected_variant_count: u64,
    ) -> ReviewResult<Vec<VariantRecord>> {
        let handle = self
            .client
            .create_variant_export(analysis_kind, analysis_id, variant_kind)
            .await?;

        let mut job = ExportJob::new(
            handle.export_id,
            analysis_id,
            analysis_kind,
            variant_kind,
            expected_variant_count,
        );

        tracing::debug!(
            analysis_id,
            export_id = %job.export_id,
            variant_kind = %variant_kind,
            expected_variant_count,
            "Export requested"
        );

        self.poll(&mut job).await
    }

    async fn poll(&self, job: &mut ExportJob) -> ReviewResult<Vec<VariantRecord>> {
        loop {
            if job.attempts >= self.policy.max_attempts || job.elapsed() >= self.policy.timeout {
                job.transition_to(ExportState::TimedOut);
                tracing::error!(
                    analysis_id = job.analysis_id,
                    export_id = %job.export_id,
                    variant_kind = %job.variant_kind,
                    attempts = job.attempts,
                    elapsed_ms = job.elapsed().as_millis(),
                    "Export not ready within poll bounds"
                );
                return Err(ReviewError::ExportTimedOut {
                    analysis_id: job.analysis_id,
                    variant_kind: job.variant_kind,
                    export_id: job.export_id.clone(),
                    attempts: job.attempts,
                    elapsed: job.elapsed(),
                });
            }

            if job.state == ExportState::Requested {
                job.transition_to(ExportState::Polling);
            }

            let delay = self.policy.wait_before(
                job.expected_variant_count,
                job.attempts + 1,
                job.elapsed(),
            );
            tokio::time::sleep(delay).await;
            job.attempts += 1;

            let result = self
                .client
                .get_variant_export(
                    job.analysis_kind,
                    job.analysis_id,
                    job.variant_kind,
                    &job.export_id,
                )
                .await;

            match result {
                Ok(records) => {
                    job.transition_to(ExportState::Ready);
                    tracing::info!(
                        analysis_id = job.analysis_id,
                        variant_kind = %job.variant_kind,
                        records = records.len(),
                        attempts = job.attempts,
                        "Export retrieved"
                    );
                    return Ok(records);
                }
                Err(err) if err.is_not_ready() => {
                    tracing::debug!(
                        analysis_id = job.analysis_id,
                        export_id = %job.export_id,
                        attempt = job.attempts,
                        error = %err,
                        "Export not ready yet"
                    );
                }
                Err(err) => {
                    job.transition_to(ExportState::Failed);
                    tracing::warn!(
                        analysis_id = job.analysis_id,
                        export_id = %job.export_id,
                        error = %err,
                        "Export fetch failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_policy() -> PollPolicy {
        PollPolicy {
            time_unit: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            max_delay_units: 300.0,
            max_attempts: 10,
            timeout: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_base_delay_boundaries() {
        assert_eq!(base_delay_units(0), 1.0);
        assert_eq!(base_delay_units(99), 1.0);
        assert_eq!(base_delay_units(100), 1.0);
        assert_eq!(base_delay_units(250), 2.5);
        assert_eq!(base_delay_units(100_000), 1000.0);
    }

    #[test]
    fn test_constant_policy_repeats_base_delay() {
        let policy = constant_policy();

        for attempt in 1..=5 {
            assert_eq!(policy.delay_units(250, attempt), 2.5);
        }
        assert_eq!(policy.delay(250, 3), Duration::from_millis(2500));
    }

    #[test]
    fn test_cap_never_shrinks_base_delay() {
        let policy = constant_policy();
        // 100000 variants → 1000 units, above the 300 unit cap
        assert_eq!(policy.delay_units(100_000, 1), 1000.0);
        assert_eq!(policy.delay_units(100_000, 4), 1000.0);
    }

    #[test]
    fn test_backoff_grows_until_cap() {
        let policy = PollPolicy {
            backoff_multiplier: 2.0,
            max_delay_units: 10.0,
            ..constant_policy()
        };

        assert_eq!(policy.delay_units(250, 1), 2.5);
        assert_eq!(policy.delay_units(250, 2), 5.0);
        assert_eq!(policy.delay_units(250, 3), 10.0);
        assert_eq!(policy.delay_units(250, 4), 10.0);
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = ExportSettings {
            time_unit_ms: 5,
            backoff_multiplier: 0.5,
            max_delay_units: 30.0,
            max_attempts: 0,
            timeout_secs: 60,
            large_analysis_threshold: 10_000,
        };

        let policy = PollPolicy::from(&settings);
        assert_eq!(policy.time_unit, Duration::from_millis(5));
        // Shrinking delays and zero attempts are clamped
        assert_eq!(policy.backoff_multiplier, 1.0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_wait_is_clamped_to_remaining_timeout() {
        let policy = PollPolicy {
            timeout: Duration::from_secs(10),
            ..constant_policy()
        };

        // 100000 variants → 1000 s delay, but only 4 s of budget remain
        assert_eq!(
            policy.wait_before(100_000, 1, Duration::from_secs(6)),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.wait_before(250, 1, Duration::from_secs(6)),
            Duration::from_millis(2500)
        );
        assert_eq!(
            policy.wait_before(250, 1, Duration::from_secs(11)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_default_policy_uses_one_second_units() {
        let policy = PollPolicy::default();
        assert_eq!(policy.time_unit, Duration::from_secs(1));
        assert_eq!(policy.delay(0, 1), Duration::from_secs(1));
    }
}
