//! Application layer for testdelta.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not touch the filesystem directly.

mod settings;

pub use settings::{DEFAULT_OUTPUT, Settings, SettingsOverrides, resolve_settings};

use anyhow::Context;
use std::path::PathBuf;
use testdelta_adapters::ReportReader;
use testdelta_domain::{ClusterOptions, DurationThreshold, cluster_with, compare, summarize};
use testdelta_types::{DiffReceipt, RunRef, RunResult, ToolInfo, VerdictStatus};
use tracing::{debug, info};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DiffRequest {
    pub baseline_path: PathBuf,
    pub current_path: PathBuf,
    pub threshold: DurationThreshold,
    pub cluster: ClusterOptions,
    pub tool: ToolInfo,
}

#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub receipt: DiffReceipt,

    /// Parsed runs, kept for callers that want to print totals.
    pub baseline: RunResult,
    pub current: RunResult,
}

impl DiffOutcome {
    pub fn failed(&self) -> bool {
        self.receipt.summary.verdict.status == VerdictStatus::Fail
    }
}

pub struct DiffUseCase<R: ReportReader, C: Clock> {
    reader: R,
    clock: C,
}

impl<R: ReportReader, C: Clock> DiffUseCase<R, C> {
    pub fn new(reader: R, clock: C) -> Self {
        Self { reader, clock }
    }

    pub fn execute(&self, req: DiffRequest) -> anyhow::Result<DiffOutcome> {
        let baseline = self
            .reader
            .read(&req.baseline_path)
            .with_context(|| format!("load baseline report {}", req.baseline_path.display()))?;
        let current = self
            .reader
            .read(&req.current_path)
            .with_context(|| format!("load current report {}", req.current_path.display()))?;

        debug!(
            baseline_tests = baseline.total_tests,
            current_tests = current.total_tests,
            "loaded runs"
        );

        let receipt = DiffBuilder {
            threshold: req.threshold,
            cluster: req.cluster,
            tool: req.tool,
            generated_at: self.clock.now_rfc3339(),
        }
        .build(
            &baseline,
            Some(req.baseline_path.display().to_string()),
            &current,
            Some(req.current_path.display().to_string()),
        );

        info!(
            new_failures = receipt.summary.new_failures,
            fixed = receipt.summary.fixed_failures,
            flaky = receipt.summary.flaky_tests,
            slower = receipt.summary.slower_tests,
            clusters = receipt.summary.cluster_count,
            "diff complete"
        );

        Ok(DiffOutcome {
            receipt,
            baseline,
            current,
        })
    }
}

/// Turns two already-loaded runs into a receipt. Pure; used by the use case
/// and directly by callers holding runs in memory.
#[derive(Debug, Clone)]
pub struct DiffBuilder {
    pub threshold: DurationThreshold,
    pub cluster: ClusterOptions,
    pub tool: ToolInfo,
    pub generated_at: String,
}

impl DiffBuilder {
    pub fn build(
        &self,
        baseline: &RunResult,
        baseline_path: Option<String>,
        current: &RunResult,
        current_path: Option<String>,
    ) -> DiffReceipt {
        let comparisons = compare(baseline, current, self.threshold);
        let clusters = cluster_with(&comparisons, &self.cluster);
        let summary = summarize(&comparisons, &clusters, self.threshold);

        DiffReceipt {
            schema: testdelta_types::DIFF_SCHEMA_V1.to_string(),
            tool: self.tool.clone(),
            generated_at: self.generated_at.clone(),
            baseline: RunRef::from_run(baseline, baseline_path),
            current: RunRef::from_run(current, current_path),
            summary,
            comparisons,
            clusters,
        }
    }
}
