#![no_main]

use libfuzzer_sys::fuzz_target;
use testdelta_domain::{DurationThreshold, cluster, compare, summarize};
use testdelta_types::{RunResult, TestRecord, TestSuite};

fuzz_target!(|input: (Vec<TestRecord>, Vec<TestRecord>)| {
    let (old, new) = input;
    let wrap = |tests| RunResult::from_suites(vec![TestSuite::new("fuzz", tests, None, 0.0)], "t");
    let (old, new) = (wrap(old), wrap(new));

    let comparisons = compare(&old, &new, DurationThreshold::default());
    let clusters = cluster(&comparisons);
    let summary = summarize(&comparisons, &clusters, DurationThreshold::default());

    for c in &clusters {
        assert_eq!(c.count as usize, c.tests.len());
    }
    assert_eq!(summary.cluster_count as usize, clusters.len());
    assert!(summary.new_failures as usize <= comparisons.len());
});
