use crate::DurationThreshold;
use indexmap::IndexMap;
use std::collections::HashMap;
use testdelta_types::{
    BaselineStatus, Comparison, RunResult, TestIdentity, TestRecord, TestStatus, TimingChange,
};

/// Match tests across two runs by identity and classify each pairing.
///
/// Output order: tests of the current run (matched or new) in report order,
/// then tests that disappeared, in baseline order. Exactly one comparison is
/// emitted per identity. If an identity repeats within one run, the later
/// record wins but keeps the position of the first.
pub fn compare(
    baseline: &RunResult,
    current: &RunResult,
    threshold: DurationThreshold,
) -> Vec<Comparison> {
    let old_map = index_by_identity(baseline);
    let new_map = index_by_identity(current);

    let mut comparisons = Vec::with_capacity(new_map.len());

    for (key, new_test) in &new_map {
        match old_map.get(key) {
            Some(old_test) => comparisons.push(compare_matched(old_test, new_test, threshold)),
            None => comparisons.push(added(new_test)),
        }
    }

    for (key, old_test) in &old_map {
        if !new_map.contains_key(key) {
            comparisons.push(removed(old_test));
        }
    }

    comparisons
}

fn index_by_identity(run: &RunResult) -> IndexMap<TestIdentity, &TestRecord> {
    let mut map = IndexMap::new();
    for test in run.tests() {
        map.insert(test.identity(), test);
    }
    map
}

fn compare_matched(
    old_test: &TestRecord,
    new_test: &TestRecord,
    threshold: DurationThreshold,
) -> Comparison {
    let status_changed = old_test.status != new_test.status;
    let is_regression = old_test.status == TestStatus::Passed && new_test.status == TestStatus::Failed;
    let is_fixed = old_test.status == TestStatus::Failed && new_test.status == TestStatus::Passed;

    let duration_change_ms = new_test.duration_ms - old_test.duration_ms;
    let duration_change_pct = if old_test.duration_ms > 0.0 {
        duration_change_ms / old_test.duration_ms * 100.0
    } else {
        0.0
    };

    Comparison {
        test: new_test.clone(),
        old_status: old_test.status.into(),
        new_status: new_test.status,
        status_changed,
        duration_change_ms,
        duration_change_pct,
        timing: classify_timing(duration_change_pct, threshold),
        is_regression,
        is_fixed,
        is_flaky: status_changed && new_test.status != TestStatus::Skipped,
    }
}

fn added(new_test: &TestRecord) -> Comparison {
    let failing = new_test.status == TestStatus::Failed;
    Comparison {
        test: new_test.clone(),
        old_status: BaselineStatus::New,
        new_status: new_test.status,
        status_changed: failing,
        duration_change_ms: 0.0,
        duration_change_pct: 0.0,
        timing: TimingChange::Unchanged,
        is_regression: failing,
        is_fixed: false,
        is_flaky: false,
    }
}

// A test that vanished from the current run counts as a failure.
fn removed(old_test: &TestRecord) -> Comparison {
    Comparison {
        test: old_test.clone(),
        old_status: old_test.status.into(),
        new_status: TestStatus::Failed,
        status_changed: true,
        duration_change_ms: 0.0,
        duration_change_pct: 0.0,
        timing: TimingChange::Unchanged,
        is_regression: true,
        is_fixed: false,
        is_flaky: false,
    }
}

fn classify_timing(pct: f64, threshold: DurationThreshold) -> TimingChange {
    if pct > threshold.pct() {
        TimingChange::Slower
    } else if pct < -threshold.pct() {
        TimingChange::Faster
    } else {
        TimingChange::Unchanged
    }
}

/// Flag every comparison whose identity occurs more than once in `comparisons`.
///
/// [`compare`] never emits a repeated identity, so on its own output this is a
/// no-op. It is meant for callers that concatenate the output of several diffs
/// of the same test across retried runs.
pub fn detect_flakiness(comparisons: Vec<Comparison>) -> Vec<Comparison> {
    let mut counts: HashMap<TestIdentity, usize> = HashMap::new();
    for c in &comparisons {
        *counts.entry(c.identity()).or_default() += 1;
    }

    comparisons
        .into_iter()
        .map(|mut c| {
            if counts.get(&c.identity()).copied().unwrap_or(0) > 1 {
                c.is_flaky = true;
            }
            c
        })
        .collect()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use testdelta_types::TestSuite;

    fn status_strategy() -> impl Strategy<Value = TestStatus> {
        prop_oneof![
            Just(TestStatus::Passed),
            Just(TestStatus::Failed),
            Just(TestStatus::Skipped),
        ]
    }

    // Unique names per run; small alphabet so the two runs overlap.
    fn run_strategy() -> impl Strategy<Value = RunResult> {
        proptest::collection::btree_map("[a-f]{1,2}", (status_strategy(), 0u32..500), 0..20)
            .prop_map(|tests| {
                let tests = tests
                    .into_iter()
                    .map(|(name, (status, ms))| TestRecord {
                        name,
                        class_name: "Suite".into(),
                        status,
                        duration_ms: ms as f64,
                        error: None,
                        stdout: None,
                        stderr: None,
                    })
                    .collect();
                RunResult::from_suites(
                    vec![TestSuite::new("Suite", tests, None, 0.0)],
                    "2024-01-01T00:00:00Z",
                )
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // One comparison per identity seen in either run.
        #[test]
        fn every_identity_compared_exactly_once(old in run_strategy(), new in run_strategy()) {
            let cs = compare(&old, &new, DurationThreshold::default());

            let expected: BTreeSet<_> = old.tests().chain(new.tests()).map(|t| t.identity()).collect();
            let seen: Vec<_> = cs.iter().map(|c| c.identity()).collect();
            let unique: BTreeSet<_> = seen.iter().cloned().collect();

            prop_assert_eq!(seen.len(), unique.len());
            prop_assert_eq!(unique, expected);
        }

        #[test]
        fn classification_flags_are_consistent(old in run_strategy(), new in run_strategy()) {
            let new_keys: BTreeSet<_> = new.tests().map(|t| t.identity()).collect();

            for c in compare(&old, &new, DurationThreshold::default()) {
                prop_assert!(!(c.is_regression && c.is_fixed));
                if c.is_fixed {
                    prop_assert_eq!(c.old_status, BaselineStatus::Failed);
                    prop_assert_eq!(c.new_status, TestStatus::Passed);
                }
                if !new_keys.contains(&c.identity()) {
                    prop_assert_eq!(c.new_status, TestStatus::Failed);
                    prop_assert!(c.is_regression);
                } else if c.old_status != BaselineStatus::New && c.is_regression {
                    prop_assert_eq!(c.old_status, BaselineStatus::Passed);
                    prop_assert_eq!(c.new_status, TestStatus::Failed);
                }
            }
        }

        #[test]
        fn compare_is_deterministic(old in run_strategy(), new in run_strategy()) {
            let a = compare(&old, &new, DurationThreshold::default());
            let b = compare(&old, &new, DurationThreshold::default());
            prop_assert_eq!(a, b);
        }
    }
}
