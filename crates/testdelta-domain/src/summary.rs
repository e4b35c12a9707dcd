use crate::DurationThreshold;
use testdelta_types::{
    Comparison, DiffSummary, FailureCluster, TestStatus, TimingChange, Verdict, VerdictStatus,
};

/// Aggregate comparisons and clusters into counts and a verdict.
///
/// Slower/faster only count tests that pass in the current run.
pub fn summarize(
    comparisons: &[Comparison],
    clusters: &[FailureCluster],
    threshold: DurationThreshold,
) -> DiffSummary {
    let new_failures = count(comparisons, |c| c.is_regression);
    let fixed_failures = count(comparisons, |c| c.is_fixed);
    let flaky_tests = count(comparisons, |c| c.is_flaky);
    let slower_tests = count(comparisons, |c| {
        c.timing == TimingChange::Slower && c.new_status == TestStatus::Passed
    });
    let faster_tests = count(comparisons, |c| {
        c.timing == TimingChange::Faster && c.new_status == TestStatus::Passed
    });

    let mut reasons = Vec::new();
    if new_failures > 0 {
        reasons.push(format!("{new_failures} new failure(s)"));
    }
    if slower_tests > 0 {
        reasons.push(format!(
            "{slower_tests} test(s) slower by more than {:.0}%",
            threshold.pct()
        ));
    }

    let status = if new_failures > 0 {
        VerdictStatus::Fail
    } else if slower_tests > 0 {
        VerdictStatus::Warn
    } else {
        VerdictStatus::Pass
    };

    DiffSummary {
        total_tests: comparisons.len() as u32,
        new_failures,
        fixed_failures,
        flaky_tests,
        slower_tests,
        faster_tests,
        cluster_count: clusters.len() as u32,
        threshold_pct: threshold.pct(),
        verdict: Verdict { status, reasons },
    }
}

fn count(comparisons: &[Comparison], pred: impl Fn(&Comparison) -> bool) -> u32 {
    comparisons.iter().filter(|c| pred(c)).count() as u32
}
