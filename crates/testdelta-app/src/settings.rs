//! Effective settings: CLI flag > config file > built-in default.

use anyhow::Context;
use std::path::PathBuf;
use testdelta_domain::{ClusterOptions, DurationThreshold};
use testdelta_types::{ConfigFile, DEFAULT_MIN_SIMILARITY};

pub const DEFAULT_OUTPUT: &str = "report.html";

/// What the caller passed explicitly. `None` defers to the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub threshold: Option<f64>,
    pub output: Option<PathBuf>,
    pub pr_comment: Option<bool>,
    pub fail_on_regression: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub threshold: DurationThreshold,
    pub cluster: ClusterOptions,
    pub output: PathBuf,
    pub pr_comment: bool,
    pub fail_on_regression: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DurationThreshold::default(),
            cluster: ClusterOptions::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            pr_comment: false,
            fail_on_regression: false,
        }
    }
}

pub fn resolve_settings(
    config: &ConfigFile,
    overrides: &SettingsOverrides,
) -> anyhow::Result<Settings> {
    let defaults = &config.defaults;

    let threshold = match overrides.threshold.or(defaults.threshold) {
        Some(pct) => DurationThreshold::new(pct).context("invalid threshold")?,
        None => DurationThreshold::default(),
    };

    let cluster = ClusterOptions::new(
        config
            .clustering
            .min_similarity
            .unwrap_or(DEFAULT_MIN_SIMILARITY),
        config.clustering.max_message_chars,
    )
    .context("invalid [clustering] settings")?;

    let output = overrides
        .output
        .clone()
        .or_else(|| defaults.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    Ok(Settings {
        threshold,
        cluster,
        output,
        pr_comment: overrides
            .pr_comment
            .or(defaults.pr_comment)
            .unwrap_or(false),
        fail_on_regression: overrides
            .fail_on_regression
            .or(defaults.fail_on_regression)
            .unwrap_or(false),
    })
}
