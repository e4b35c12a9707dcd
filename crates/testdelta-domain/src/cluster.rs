use crate::ClusterOptions;
use crate::similarity::{similarity_score, truncate_chars};
use testdelta_types::{BaselineStatus, Comparison, FailureCluster, TestError, TestStatus};

/// Group newly failing tests whose errors look alike, using default options.
pub fn cluster(comparisons: &[Comparison]) -> Vec<FailureCluster> {
    cluster_with(comparisons, &ClusterOptions::default())
}

/// Failing now and not failing before. Tests new to the run qualify.
pub fn is_new_failure(c: &Comparison) -> bool {
    c.new_status == TestStatus::Failed && c.old_status != BaselineStatus::Failed
}

/// Greedy first-fit clustering.
///
/// Failures are visited in input order and join the earliest-created cluster
/// whose representative scores at least `min_similarity`, even when a later
/// cluster would score higher. Representatives never change after founding.
/// Failures without an error payload are skipped. The result is sorted by
/// descending member count; ties keep creation order.
pub fn cluster_with(comparisons: &[Comparison], options: &ClusterOptions) -> Vec<FailureCluster> {
    let mut clusters: Vec<FailureCluster> = Vec::new();

    for comparison in comparisons.iter().filter(|c| is_new_failure(c)) {
        let Some(error) = &comparison.test.error else {
            continue;
        };

        let home = clusters.iter_mut().find(|cluster| {
            score(error, cluster, options.max_message_chars) >= options.min_similarity
        });

        match home {
            Some(cluster) => {
                cluster.tests.push(comparison.clone());
                cluster.count += 1;
            }
            None => {
                let id = format!("cluster-{}", clusters.len());
                clusters.push(FailureCluster {
                    id,
                    error_type: error.error_type.clone(),
                    error_message: error.message.clone(),
                    tests: vec![comparison.clone()],
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters
}

fn score(
    error: &TestError,
    cluster: &FailureCluster,
    max_message_chars: Option<usize>,
) -> f64 {
    match max_message_chars {
        None => similarity_score(error, &cluster.error_type, &cluster.error_message),
        Some(max) => {
            let capped = TestError {
                error_type: error.error_type.clone(),
                message: truncate_chars(&error.message, max).to_string(),
                stacktrace: String::new(),
            };
            similarity_score(
                &capped,
                &cluster.error_type,
                truncate_chars(&cluster.error_message, max),
            )
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use testdelta_types::{TestError, TestRecord, TimingChange};

    fn comparison_strategy() -> impl Strategy<Value = Comparison> {
        (
            prop_oneof![
                Just(BaselineStatus::Passed),
                Just(BaselineStatus::Failed),
                Just(BaselineStatus::Skipped),
                Just(BaselineStatus::New),
            ],
            prop_oneof![
                Just(TestStatus::Passed),
                Just(TestStatus::Failed),
                Just(TestStatus::Skipped),
            ],
            proptest::option::of((
                prop_oneof![Just("E"), Just("F")],
                "[ab ]{0,12}",
            )),
        )
            .prop_map(|(old_status, new_status, error)| Comparison {
                test: TestRecord {
                    name: "t".into(),
                    class_name: "S".into(),
                    status: new_status,
                    duration_ms: 0.0,
                    error: error.map(|(ty, msg)| TestError {
                        error_type: ty.to_string(),
                        message: msg,
                        stacktrace: String::new(),
                    }),
                    stdout: None,
                    stderr: None,
                },
                old_status,
                new_status,
                status_changed: false,
                duration_change_ms: 0.0,
                duration_change_pct: 0.0,
                timing: TimingChange::Unchanged,
                is_regression: false,
                is_fixed: false,
                is_flaky: false,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // Every qualifying failure lands in exactly one cluster.
        #[test]
        fn clusters_partition_qualifying_failures(
            cs in proptest::collection::vec(comparison_strategy(), 0..30)
        ) {
            let clusters = cluster(&cs);
            let qualifying = cs
                .iter()
                .filter(|c| is_new_failure(c) && c.test.error.is_some())
                .count();

            let total: u32 = clusters.iter().map(|c| c.count).sum();
            prop_assert_eq!(total as usize, qualifying);

            for c in &clusters {
                prop_assert_eq!(c.count as usize, c.tests.len());
                for member in &c.tests {
                    prop_assert!(is_new_failure(member));
                    prop_assert!(member.test.error.is_some());
                }
            }

            for pair in clusters.windows(2) {
                prop_assert!(pair[0].count >= pair[1].count);
            }
        }

        #[test]
        fn clustering_is_deterministic(
            cs in proptest::collection::vec(comparison_strategy(), 0..30)
        ) {
            prop_assert_eq!(cluster(&cs), cluster(&cs));
        }
    }
}
