use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use testdelta_adapters::{FsReportReader, load_config};
use testdelta_app::{
    DiffOutcome, DiffRequest, DiffUseCase, SettingsOverrides, SystemClock, resolve_settings,
};
use testdelta_render::{github_annotations, render_html, render_markdown};
use testdelta_types::{ConfigFile, DiffReceipt, ToolInfo, VerdictStatus};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TESTDELTA_LOG";
const DEFAULT_CONFIG: &str = "testdelta.toml";

#[derive(Debug, Parser)]
#[command(
    name = "testdelta",
    version,
    about = "The git diff for test results: regressions, fixes, flaky tests and grouped failures"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two test reports (JUnit XML or run JSON) and write an HTML report.
    Diff {
        /// Baseline report
        old: PathBuf,

        /// Current report
        new: PathBuf,

        /// HTML report path [default: report.html]
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write the diff receipt as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Emit a markdown PR comment (stdout unless --md-out is given)
        #[arg(long, default_value_t = false, overrides_with = "no_pr_comment")]
        pr_comment: bool,

        /// Do not emit a PR comment, even if the config file asks for one
        #[arg(long, default_value_t = false, overrides_with = "pr_comment")]
        no_pr_comment: bool,

        /// Write the PR comment here instead of stdout
        #[arg(long)]
        md_out: Option<PathBuf>,

        /// Slowness threshold in percent [default: 20]
        #[arg(long)]
        threshold: Option<f64>,

        /// Config file [default: ./testdelta.toml when present]
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exit with code 2 when the diff has new failures
        #[arg(long, default_value_t = false, overrides_with = "no_fail_on_regression")]
        fail_on_regression: bool,

        /// Exit 0 on new failures, even if the config file sets fail_on_regression
        #[arg(long, default_value_t = false, overrides_with = "fail_on_regression")]
        no_fail_on_regression: bool,
    },

    /// Render a markdown PR comment from a diff receipt.
    Md {
        #[arg(long)]
        diff: PathBuf,

        /// Output markdown path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit GitHub Actions annotations from a diff receipt.
    GithubAnnotations {
        #[arg(long)]
        diff: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();

    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Diff {
            old,
            new,
            output,
            json,
            pretty,
            pr_comment,
            no_pr_comment,
            md_out,
            threshold,
            config,
            fail_on_regression,
            no_fail_on_regression,
        } => {
            let config = read_config(config.as_deref())?;
            let settings = resolve_settings(
                &config,
                &SettingsOverrides {
                    threshold,
                    output,
                    pr_comment: switch(pr_comment || md_out.is_some(), no_pr_comment),
                    fail_on_regression: switch(fail_on_regression, no_fail_on_regression),
                },
            )?;
            debug!(?settings, "resolved settings");

            let usecase = DiffUseCase::new(FsReportReader, SystemClock);
            let outcome = usecase.execute(DiffRequest {
                baseline_path: old,
                current_path: new,
                threshold: settings.threshold,
                cluster: settings.cluster,
                tool: tool_info(),
            })?;

            print_summary(&outcome);

            let html = render_html(&outcome.receipt)?;
            write_file(&settings.output, html.as_bytes())?;
            println!("\n✅ HTML report written to {}", settings.output.display());

            if let Some(path) = &json {
                write_json(path, &outcome.receipt, pretty)?;
                println!("✅ JSON receipt written to {}", path.display());
            }

            if settings.pr_comment {
                let md = render_markdown(&outcome.receipt);
                match &md_out {
                    Some(path) => {
                        write_file(path, md.as_bytes())?;
                        println!("✅ PR comment written to {}", path.display());
                    }
                    None => {
                        println!("\n📝 PR comment:");
                        println!("{}", "─".repeat(60));
                        print!("{md}");
                        println!("{}", "─".repeat(60));
                    }
                }
            }

            if settings.fail_on_regression && outcome.failed() {
                return Ok(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Md { diff, out } => {
            let receipt: DiffReceipt = read_json(&diff)?;
            let md = render_markdown(&receipt);

            match out {
                Some(path) => write_file(&path, md.as_bytes())?,
                None => print!("{md}"),
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::GithubAnnotations { diff } => {
            let receipt: DiffReceipt = read_json(&diff)?;
            for line in github_annotations(&receipt) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(outcome: &DiffOutcome) {
    let s = &outcome.receipt.summary;
    println!(
        "✓ Old results: {} tests ({} passed, {} failed, {} skipped)",
        outcome.baseline.total_tests,
        outcome.baseline.passed,
        outcome.baseline.failed,
        outcome.baseline.skipped
    );
    println!(
        "✓ New results: {} tests ({} passed, {} failed, {} skipped)",
        outcome.current.total_tests,
        outcome.current.passed,
        outcome.current.failed,
        outcome.current.skipped
    );
    println!("\n📈 Results:");
    println!("  🔴 New failures: {}", s.new_failures);
    println!("  ✅ Fixed tests: {}", s.fixed_failures);
    println!("  ⚠️  Flaky tests: {}", s.flaky_tests);
    println!(
        "  ⏱️  Slower tests (>{:.0}%): {}",
        s.threshold_pct, s.slower_tests
    );
    println!("  🚀 Faster tests (>{:.0}%): {}", s.threshold_pct, s.faster_tests);
    println!("  🔗 Failure clusters: {}", s.cluster_count);
    println!("  Verdict: {}", verdict_label(s.verdict.status));
}

/// A `--flag` / `--no-flag` pair; neither given defers to the config file.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

fn verdict_label(status: VerdictStatus) -> &'static str {
    match status {
        VerdictStatus::Pass => "pass",
        VerdictStatus::Warn => "warn",
        VerdictStatus::Fail => "fail",
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "testdelta".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// An explicit `--config` must exist; the implicit `./testdelta.toml` is optional.
fn read_config(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_config(path).with_context(|| format!("load config {}", path.display()));
    }

    let implicit = Path::new(DEFAULT_CONFIG);
    if implicit.is_file() {
        debug!(path = DEFAULT_CONFIG, "using implicit config");
        return load_config(implicit).with_context(|| format!("load config {DEFAULT_CONFIG}"));
    }

    Ok(ConfigFile::default())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    write_file(path, &bytes)
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    atomic_write(path, bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
