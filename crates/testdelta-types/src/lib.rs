//! Shared types for testdelta.
//!
//! Design goal: versioned, explicit, boring.
//! The run model is what report parsers produce; the diff receipt is what
//! renderers and PR bots consume.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RUN_SCHEMA_V1: &str = "testdelta.run.v1";
pub const DIFF_SCHEMA_V1: &str = "testdelta.diff.v1";

/// Slowness threshold used when the caller does not supply one (percent).
pub const DEFAULT_THRESHOLD_PCT: f64 = 20.0;

/// Minimum similarity score for a failure to join an existing cluster.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

// ----------------------------
// Run model
// ----------------------------

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a test in the baseline run. `New` means the test did not exist there.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum BaselineStatus {
    Passed,
    Failed,
    Skipped,
    New,
}

impl BaselineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BaselineStatus::Passed => "passed",
            BaselineStatus::Failed => "failed",
            BaselineStatus::Skipped => "skipped",
            BaselineStatus::New => "new",
        }
    }
}

impl From<TestStatus> for BaselineStatus {
    fn from(status: TestStatus) -> Self {
        match status {
            TestStatus::Passed => BaselineStatus::Passed,
            TestStatus::Failed => BaselineStatus::Failed,
            TestStatus::Skipped => BaselineStatus::Skipped,
        }
    }
}

impl PartialEq<TestStatus> for BaselineStatus {
    fn eq(&self, other: &TestStatus) -> bool {
        *self == BaselineStatus::from(*other)
    }
}

impl fmt::Display for BaselineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TestError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub stacktrace: String,
}

/// Identity of a test across runs: `<class_name>::<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestIdentity(String);

impl TestIdentity {
    pub fn new(class_name: &str, name: &str) -> Self {
        Self(format!("{class_name}::{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TestRecord {
    pub name: String,
    pub class_name: String,
    pub status: TestStatus,

    /// Wall time in milliseconds (>= 0).
    pub duration_ms: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl TestRecord {
    pub fn identity(&self) -> TestIdentity {
        TestIdentity::new(&self.class_name, &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    pub duration_ms: f64,
    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestSuite {
    /// Build a suite, counting statuses from the given tests.
    pub fn new(
        name: impl Into<String>,
        tests: Vec<TestRecord>,
        timestamp: Option<String>,
        duration_ms: f64,
    ) -> Self {
        let count = |status: TestStatus| tests.iter().filter(|t| t.status == status).count() as u32;
        Self {
            name: name.into(),
            timestamp,
            duration_ms,
            total_tests: tests.len() as u32,
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            tests,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RunResult {
    pub suites: Vec<TestSuite>,

    /// RFC 3339 timestamp of the run.
    pub timestamp: String,

    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: f64,
}

impl RunResult {
    /// Build a run, summing aggregates over the suites.
    pub fn from_suites(suites: Vec<TestSuite>, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            total_tests: suites.iter().map(|s| s.total_tests).sum(),
            passed: suites.iter().map(|s| s.passed).sum(),
            failed: suites.iter().map(|s| s.failed).sum(),
            skipped: suites.iter().map(|s| s.skipped).sum(),
            total_duration_ms: suites.iter().map(|s| s.duration_ms).sum(),
            suites,
        }
    }

    /// All test records, suite by suite, in report order.
    pub fn tests(&self) -> impl Iterator<Item = &TestRecord> {
        self.suites.iter().flat_map(|s| s.tests.iter())
    }
}

// ----------------------------
// Diff model
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimingChange {
    Slower,
    Faster,
    #[default]
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Comparison {
    /// The current run's record when present, otherwise the baseline's.
    pub test: TestRecord,

    pub old_status: BaselineStatus,

    /// A test missing from the current run is reported as failed.
    pub new_status: TestStatus,

    pub status_changed: bool,

    /// current - baseline, milliseconds. Negative means faster.
    pub duration_change_ms: f64,

    /// Zero when the baseline duration is zero.
    pub duration_change_pct: f64,

    /// Timing classification against the caller's slowness threshold.
    #[serde(default)]
    pub timing: TimingChange,

    pub is_regression: bool,
    pub is_fixed: bool,
    pub is_flaky: bool,
}

impl Comparison {
    pub fn identity(&self) -> TestIdentity {
        self.test.identity()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FailureCluster {
    pub id: String,

    /// Representative error, fixed from the founding member.
    pub error_type: String,
    pub error_message: String,

    pub tests: Vec<Comparison>,
    pub count: u32,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DiffSummary {
    pub total_tests: u32,
    pub new_failures: u32,
    pub fixed_failures: u32,
    pub flaky_tests: u32,
    pub slower_tests: u32,
    pub faster_tests: u32,
    pub cluster_count: u32,
    pub threshold_pct: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RunRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub timestamp: String,
    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl RunRef {
    pub fn from_run(run: &RunResult, path: Option<String>) -> Self {
        Self {
            path,
            timestamp: run.timestamp.clone(),
            total_tests: run.total_tests,
            passed: run.passed,
            failed: run.failed,
            skipped: run.skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DiffReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub generated_at: String,

    pub baseline: RunRef,
    pub current: RunRef,

    pub summary: DiffSummary,
    pub comparisons: Vec<Comparison>,

    /// Sorted by descending member count.
    pub clusters: Vec<FailureCluster>,
}

impl DiffReceipt {
    pub fn regressions(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|c| c.is_regression)
    }

    pub fn fixes(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|c| c.is_fixed)
    }

    pub fn flaky(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons.iter().filter(|c| c.is_flaky)
    }

    /// Passing tests that got slower than the threshold allows.
    pub fn slower(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons
            .iter()
            .filter(|c| c.timing == TimingChange::Slower && c.new_status == TestStatus::Passed)
    }

    pub fn faster(&self) -> impl Iterator<Item = &Comparison> {
        self.comparisons
            .iter()
            .filter(|c| c.timing == TimingChange::Faster && c.new_status == TestStatus::Passed)
    }
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    /// Slowness threshold in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// HTML report path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_comment: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_regression: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ClusteringConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f64>,

    /// Error messages are cut to this many chars before edit distance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_message_chars: Option<usize>,
}
