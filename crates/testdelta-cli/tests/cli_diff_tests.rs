//! Integration tests for `testdelta diff`

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn testdelta() -> Command {
    let mut cmd = Command::cargo_bin("testdelta").expect("failed to find testdelta binary");
    cmd.env_remove("TESTDELTA_LOG");
    cmd
}

#[test]
fn diff_prints_summary_and_writes_html() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Old results: 4 tests (3 passed, 1 failed, 0 skipped)",
        ))
        .stdout(predicate::str::contains(
            "New results: 5 tests (2 passed, 3 failed, 0 skipped)",
        ))
        .stdout(predicate::str::contains("New failures: 3"))
        .stdout(predicate::str::contains("Fixed tests: 1"))
        .stdout(predicate::str::contains("Flaky tests: 3"))
        .stdout(predicate::str::contains("Slower tests (>20%): 1"))
        .stdout(predicate::str::contains("Failure clusters: 2"))
        .stdout(predicate::str::contains("Verdict: fail"));

    let report = temp_dir.path().join("report.html");
    assert!(report.exists(), "default report.html should be written");
    let html = fs::read_to_string(report).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("calc.Math::subtracts"));
}

#[test]
fn diff_writes_json_receipt() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let out = temp_dir.path().join("nested").join("report.html");
    let json = temp_dir.path().join("nested").join("diff.json");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--output")
        .arg(&out)
        .arg("--json")
        .arg(&json)
        .arg("--pretty")
        .assert()
        .success();

    assert!(out.exists());
    let content = fs::read_to_string(&json).unwrap();
    assert!(content.contains('\n'), "pretty JSON spans lines");

    let v: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(v["schema"], "testdelta.diff.v1");
    assert_eq!(v["tool"]["name"], "testdelta");
    assert_eq!(v["summary"]["new_failures"], 3);
    assert_eq!(v["summary"]["verdict"]["status"], "fail");
    assert_eq!(v["comparisons"].as_array().unwrap().len(), 5);

    let clusters = v["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0]["count"], 2);
    assert_eq!(clusters[0]["error_type"], "AssertionError");
    assert_eq!(clusters[1]["error_type"], "TypeError");
}

#[test]
fn diff_prints_pr_comment() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--pr-comment")
        .assert()
        .success()
        .stdout(predicate::str::contains("## 🧪 Test Report Diff"))
        .stdout(predicate::str::contains("| 🔴 **New Failures** | 3 |"))
        .stdout(predicate::str::contains("- **calc.Math**::`adds`"))
        .stdout(predicate::str::contains("### 🔗 Grouped Failures"));
}

#[test]
fn diff_writes_pr_comment_to_file() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let md = temp_dir.path().join("comment.md");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--md-out")
        .arg(&md)
        .assert()
        .success()
        .stdout(predicate::str::contains("## 🧪 Test Report Diff").not());

    let content = fs::read_to_string(md).unwrap();
    assert!(content.starts_with("❌ testdelta: fail"));
}

#[test]
fn fail_on_regression_exits_2() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--fail-on-regression")
        .assert()
        .code(2);

    assert!(
        temp_dir.path().join("report.html").exists(),
        "report is still written on a failing verdict"
    );
}

#[test]
fn fail_on_regression_passes_clean_diff() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current_pass.xml"))
        .arg("--fail-on-regression")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verdict: pass"));
}

#[test]
fn slow_tests_warn_but_do_not_fail() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current_slow.xml"))
        .arg("--fail-on-regression")
        .assert()
        .success()
        .stdout(predicate::str::contains("Slower tests (>20%): 1"))
        .stdout(predicate::str::contains("Verdict: warn"));
}

#[test]
fn threshold_flag_changes_slowness() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current_slow.xml"))
        .arg("--threshold")
        .arg("60")
        .assert()
        .success()
        .stdout(predicate::str::contains("Slower tests (>60%): 0"))
        .stdout(predicate::str::contains("Verdict: pass"));
}

#[test]
fn negative_threshold_is_a_tool_error() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--threshold=-5")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid threshold"));
}

#[test]
fn implicit_config_is_picked_up() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    fs::write(
        temp_dir.path().join("testdelta.toml"),
        "[defaults]\nthreshold = 60.0\noutput = \"from-config.html\"\nfail_on_regression = true\n",
    )
    .unwrap();

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current_slow.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Slower tests (>60%): 0"));

    assert!(temp_dir.path().join("from-config.html").exists());

    // fail_on_regression from the config applies too
    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .assert()
        .code(2);
}

#[test]
fn cli_flag_beats_config() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let config = temp_dir.path().join("custom.toml");
    fs::write(&config, "[defaults]\nthreshold = 60.0\n").unwrap();

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current_slow.xml"))
        .arg("--config")
        .arg(&config)
        .arg("--threshold")
        .arg("10")
        .assert()
        .success()
        .stdout(predicate::str::contains("Slower tests (>10%): 1"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--config")
        .arg(temp_dir.path().join("nope.toml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load config"));
}

#[test]
fn missing_report_is_a_tool_error() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(temp_dir.path().join("missing.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load baseline report"))
        .stderr(predicate::str::contains("missing.xml"));

    assert!(!temp_dir.path().join("report.html").exists());
}

#[test]
fn malformed_report_is_a_tool_error() {
    let temp_dir = tempdir().expect("failed to create temp dir");

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("malformed.xml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load current report"))
        .stderr(predicate::str::contains("malformed JUnit XML"));
}

#[test]
fn json_runs_are_accepted() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let run_json = temp_dir.path().join("run.json");
    fs::write(
        &run_json,
        r#"{
  "suites": [{
    "name": "calc",
    "tests": [
      {"name": "adds", "class_name": "calc.Math", "status": "passed", "duration_ms": 100.0},
      {"name": "divides", "class_name": "calc.Math", "status": "failed", "duration_ms": 50.0,
       "error": {"type": "AssertionError", "message": "expected 2 got 3"}},
      {"name": "multiplies", "class_name": "calc.Math", "status": "passed", "duration_ms": 200.0},
      {"name": "reads", "class_name": "calc.Io", "status": "passed", "duration_ms": 100.0}
    ],
    "timestamp": null,
    "duration_ms": 450.0,
    "total_tests": 4, "passed": 3, "failed": 1, "skipped": 0
  }],
  "timestamp": "2024-05-01T10:00:00Z",
  "total_tests": 4, "passed": 3, "failed": 1, "skipped": 0,
  "total_duration_ms": 450.0
}"#,
    )
    .unwrap();

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(&run_json)
        .arg(fixtures_dir().join("current_pass.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Verdict: pass"));
}

#[test]
fn no_flags_turn_off_config_switches() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    fs::write(
        temp_dir.path().join("testdelta.toml"),
        "[defaults]\npr_comment = true\nfail_on_regression = true\n",
    )
    .unwrap();

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("## 🧪 Test Report Diff"));

    testdelta()
        .current_dir(temp_dir.path())
        .arg("diff")
        .arg(fixtures_dir().join("baseline.xml"))
        .arg(fixtures_dir().join("current.xml"))
        .arg("--no-fail-on-regression")
        .arg("--no-pr-comment")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verdict: fail"))
        .stdout(predicate::str::contains("## 🧪 Test Report Diff").not());
}
