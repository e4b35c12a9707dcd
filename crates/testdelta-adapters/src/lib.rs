//! Std adapters for testdelta.
//!
//! In clean-arch terms: this is where we touch the world. Report files come in
//! here and leave as a [`RunResult`].

mod junit;

pub use junit::parse_junit_str;

use std::fs;
use std::path::{Path, PathBuf};
use testdelta_types::{ConfigFile, RunResult};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JUnit XML")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed JUnit XML: unclosed <{0}>")]
    Unclosed(String),

    #[error("no <testsuites> or <testsuite> root element")]
    MissingRoot,

    #[error("failed to parse run json {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Anything that can turn a report path into a run.
pub trait ReportReader {
    fn read(&self, path: &Path) -> Result<RunResult, AdapterError>;
}

/// Reads reports from the filesystem.
///
/// `.json` files are taken as serialized [`RunResult`]s; anything else is
/// parsed as JUnit XML.
#[derive(Debug, Default, Clone)]
pub struct FsReportReader;

impl ReportReader for FsReportReader {
    fn read(&self, path: &Path) -> Result<RunResult, AdapterError> {
        load_run(path)
    }
}

/// Load a run from disk: `.json` as a serialized run, anything else as JUnit XML.
pub fn load_run(path: &Path) -> Result<RunResult, AdapterError> {
    let content = read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|source| AdapterError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        parse_junit_str(&content)
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile, AdapterError> {
    let content = read_to_string(path)?;
    toml::from_str(&content).map_err(|source| AdapterError::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn read_to_string(path: &Path) -> Result<String, AdapterError> {
    fs::read_to_string(path).map_err(|source| AdapterError::Read {
        path: path.to_path_buf(),
        source,
    })
}
