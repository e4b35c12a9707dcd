//! testdelta workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual testdelta functionality is in the workspace member crates:
//! - `testdelta-types`: Run model, diff receipt and JSON schemas
//! - `testdelta-domain`: Comparison, classification and failure clustering
//! - `testdelta-adapters`: JUnit XML parsing and file loading
//! - `testdelta-render`: Markdown, HTML and GitHub annotation output
//! - `testdelta-app`: Application use cases
//! - `testdelta-cli`: the `testdelta` binary
