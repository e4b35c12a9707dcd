use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use testdelta_adapters::{FsReportReader, ReportReader};
use testdelta_app::{Clock, DiffBuilder, SystemClock};
use testdelta_domain::{ClusterOptions, DurationThreshold};
use testdelta_render::{render_html, render_markdown};
use testdelta_types::ToolInfo;

const FIXTURES: &str = "crates/testdelta-cli/tests/fixtures";

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for testdelta")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for run results, diff receipts and config.
    Schema {
        /// Output directory
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail if the files on disk differ instead of rewriting them
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Render the CLI fixtures into an HTML report and PR comment for eyeballing templates.
    Demo {
        #[arg(long, default_value = "target/demo")]
        out_dir: PathBuf,
    },

    /// Run the usual repo checks (fmt, clippy, test, schema).
    Ci,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Demo { out_dir } => cmd_demo(&out_dir),
        Command::Ci => cmd_ci(),
    }
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", ["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        ["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"],
    )?;
    run("cargo", ["test", "--all"])?;
    run("cargo", ["run", "-p", "xtask", "--", "schema"])?;
    Ok(())
}

fn run<const N: usize>(bin: &str, args: [&str; N]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin}"))?;
    if !status.success() {
        anyhow::bail!("{bin} failed: {status}");
    }
    Ok(())
}

fn schemas() -> anyhow::Result<Vec<(&'static str, Vec<u8>)>> {
    Ok(vec![
        (
            "testdelta.run.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testdelta_types::RunResult))?,
        ),
        (
            "testdelta.diff.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testdelta_types::DiffReceipt))?,
        ),
        (
            "testdelta.config.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testdelta_types::ConfigFile))?,
        ),
    ])
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    let generated = schemas()?;

    if check {
        let mut stale = Vec::new();
        for (name, json) in &generated {
            let path = out_dir.join(name);
            let on_disk = fs::read(&path).unwrap_or_default();
            if on_disk != *json {
                stale.push(path.display().to_string());
            }
        }
        if !stale.is_empty() {
            anyhow::bail!(
                "schemas out of date, run `cargo run -p xtask -- schema`: {}",
                stale.join(", ")
            );
        }
        return Ok(());
    }

    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;
    for (name, json) in generated {
        let path = out_dir.join(name);
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

fn cmd_demo(out_dir: &Path) -> anyhow::Result<()> {
    let fixtures = Path::new(FIXTURES);
    let baseline_path = fixtures.join("baseline.xml");
    let current_path = fixtures.join("current.xml");

    let baseline = FsReportReader
        .read(&baseline_path)
        .with_context(|| format!("read {}", baseline_path.display()))?;
    let current = FsReportReader
        .read(&current_path)
        .with_context(|| format!("read {}", current_path.display()))?;

    let receipt = DiffBuilder {
        threshold: DurationThreshold::default(),
        cluster: ClusterOptions::default(),
        tool: ToolInfo {
            name: "testdelta".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: SystemClock.now_rfc3339(),
    }
    .build(
        &baseline,
        Some(baseline_path.display().to_string()),
        &current,
        Some(current_path.display().to_string()),
    );

    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;

    let html_path = out_dir.join("report.html");
    fs::write(&html_path, render_html(&receipt)?)
        .with_context(|| format!("write {}", html_path.display()))?;

    let md_path = out_dir.join("comment.md");
    fs::write(&md_path, render_markdown(&receipt))
        .with_context(|| format!("write {}", md_path.display()))?;

    println!("wrote {} and {}", html_path.display(), md_path.display());
    Ok(())
}
