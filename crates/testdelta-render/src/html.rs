use crate::{format_ms, format_pct};
use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;
use testdelta_types::{Comparison, DiffReceipt, FailureCluster, TestStatus, VerdictStatus};

const TEMPLATE: &str = include_str!("report.html.hbs");
const STYLES: &str = include_str!("report.css");

const MAX_HEATMAP_ROWS: usize = 15;

#[derive(Serialize)]
struct Page<'a> {
    styles: &'a str,
    verdict: &'static str,
    verdict_class: &'static str,
    reasons: &'a [String],
    generated_at: &'a str,
    tool: String,
    threshold: String,
    baseline: RunCard,
    current: RunCard,
    cards: Vec<Card>,
    sections: Vec<Section>,
    cluster_count: usize,
    clusters: Vec<ClusterView<'a>>,
    heatmap: Vec<HeatmapRow>,
    receipt_json: String,
}

#[derive(Serialize)]
struct RunCard {
    label: &'static str,
    path: String,
    timestamp: String,
    totals: String,
}

#[derive(Serialize)]
struct Card {
    label: String,
    value: u32,
    class: &'static str,
}

#[derive(Serialize)]
struct Section {
    id: &'static str,
    title: &'static str,
    status_class: &'static str,
    count: usize,
    rows: Vec<Row>,
}

#[derive(Serialize)]
struct Row {
    class_name: String,
    name: String,
    old_status: String,
    new_status: String,
    duration: String,
    change: String,
    error_type: Option<String>,
    error_message: Option<String>,
}

#[derive(Serialize)]
struct ClusterView<'a> {
    id: &'a str,
    error_type: &'a str,
    error_message: &'a str,
    count: u32,
    members: Vec<String>,
}

/// Pass rate of one test class over the changed tests it owns.
#[derive(Debug, Serialize, PartialEq)]
struct HeatmapRow {
    class_name: String,
    passed: u32,
    total: u32,
    pass_rate_pct: u32,
    /// Pass rate rounded to the nearest 10, used as `data-rate` for colouring.
    rate_bucket: u32,
}

/// A single self-contained HTML page with inline CSS and the receipt embedded
/// as JSON.
pub fn render_html(receipt: &DiffReceipt) -> anyhow::Result<String> {
    let mut hbs = Handlebars::new();
    hbs.register_template_string("report", TEMPLATE)
        .context("register HTML report template")?;

    let page = build_page(receipt)?;
    hbs.render("report", &page).context("render HTML report")
}

fn build_page(receipt: &DiffReceipt) -> anyhow::Result<Page<'_>> {
    let summary = &receipt.summary;

    let (verdict, verdict_class) = match summary.verdict.status {
        VerdictStatus::Pass => ("✅ pass", "positive"),
        VerdictStatus::Warn => ("⚠️ warn", "warning"),
        VerdictStatus::Fail => ("❌ fail", "negative"),
    };

    let threshold = format!("{:.0}%", summary.threshold_pct);

    let cards = vec![
        Card {
            label: "🔴 New Failures".into(),
            value: summary.new_failures,
            class: if summary.new_failures > 0 { "negative" } else { "positive" },
        },
        Card {
            label: "✅ Fixed Tests".into(),
            value: summary.fixed_failures,
            class: "positive",
        },
        Card {
            label: "⚠️ Flaky Tests".into(),
            value: summary.flaky_tests,
            class: "warning",
        },
        Card {
            label: format!("⏱️ Slower (>{threshold})"),
            value: summary.slower_tests,
            class: if summary.slower_tests > 0 { "warning" } else { "positive" },
        },
        Card {
            label: format!("🚀 Faster (>{threshold})"),
            value: summary.faster_tests,
            class: "positive",
        },
        Card {
            label: "🔗 Failure Clusters".into(),
            value: summary.cluster_count,
            class: "neutral",
        },
    ];

    let sections = vec![
        section("regressions", "Regressions", "regression", receipt.regressions()),
        section("fixes", "Fixes", "fixed", receipt.fixes()),
        section("flaky", "Flaky", "flaky", receipt.flaky()),
        section("performance", "Performance", "slower", receipt.slower()),
    ];

    let clusters: Vec<ClusterView<'_>> = receipt.clusters.iter().map(cluster_view).collect();

    // Markup characters only occur inside JSON strings, so unicode escapes
    // keep the payload inert inside the script element.
    let receipt_json = serde_json::to_string(receipt)
        .context("serialize receipt for embedding")?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026");

    Ok(Page {
        styles: STYLES,
        verdict,
        verdict_class,
        reasons: &summary.verdict.reasons,
        generated_at: &receipt.generated_at,
        tool: format!("{} {}", receipt.tool.name, receipt.tool.version),
        threshold,
        baseline: run_card("Baseline", &receipt.baseline),
        current: run_card("Current", &receipt.current),
        cards,
        sections,
        cluster_count: clusters.len(),
        clusters,
        heatmap: heatmap(receipt),
        receipt_json,
    })
}

fn run_card(label: &'static str, run: &testdelta_types::RunRef) -> RunCard {
    RunCard {
        label,
        path: run.path.clone().unwrap_or_else(|| "-".to_string()),
        timestamp: run.timestamp.clone(),
        totals: format!(
            "{} tests: {} passed, {} failed, {} skipped",
            run.total_tests, run.passed, run.failed, run.skipped
        ),
    }
}

fn section<'a>(
    id: &'static str,
    title: &'static str,
    status_class: &'static str,
    comparisons: impl Iterator<Item = &'a Comparison>,
) -> Section {
    let rows: Vec<Row> = comparisons.map(row).collect();
    Section {
        id,
        title,
        status_class,
        count: rows.len(),
        rows,
    }
}

fn row(c: &Comparison) -> Row {
    Row {
        class_name: c.test.class_name.clone(),
        name: c.test.name.clone(),
        old_status: c.old_status.to_string(),
        new_status: c.new_status.to_string(),
        duration: format_ms(c.test.duration_ms),
        change: if c.duration_change_pct == 0.0 {
            String::new()
        } else {
            format_pct(c.duration_change_pct)
        },
        error_type: c.test.error.as_ref().map(|e| e.error_type.clone()),
        error_message: c.test.error.as_ref().map(|e| e.message.clone()),
    }
}

/// Group regressions, fixes and flaky tests by class. A test listed in more
/// than one of those groups counts once per group. Highest pass rate first,
/// ties in first-seen order, at most [`MAX_HEATMAP_ROWS`] rows.
fn heatmap(receipt: &DiffReceipt) -> Vec<HeatmapRow> {
    let mut classes: Vec<(&str, u32, u32)> = Vec::new();

    for c in receipt
        .regressions()
        .chain(receipt.fixes())
        .chain(receipt.flaky())
    {
        let passing = !c.is_regression && c.new_status == TestStatus::Passed;
        let class_name = c.test.class_name.as_str();
        let idx = match classes.iter().position(|(name, _, _)| *name == class_name) {
            Some(idx) => idx,
            None => {
                classes.push((class_name, 0, 0));
                classes.len() - 1
            }
        };
        let entry = &mut classes[idx];
        entry.2 += 1;
        if passing {
            entry.1 += 1;
        }
    }

    let rate = |passed: u32, total: u32| f64::from(passed) / f64::from(total) * 100.0;

    // sort_by is stable
    classes.sort_by(|a, b| rate(b.1, b.2).total_cmp(&rate(a.1, a.2)));

    classes
        .into_iter()
        .take(MAX_HEATMAP_ROWS)
        .map(|(class_name, passed, total)| {
            let pct = rate(passed, total);
            HeatmapRow {
                class_name: class_name.to_string(),
                passed,
                total,
                pass_rate_pct: pct.round() as u32,
                rate_bucket: ((pct / 10.0).round() * 10.0) as u32,
            }
        })
        .collect()
}

fn cluster_view(cluster: &FailureCluster) -> ClusterView<'_> {
    ClusterView {
        id: &cluster.id,
        error_type: &cluster.error_type,
        error_message: &cluster.error_message,
        count: cluster.count,
        members: cluster
            .tests
            .iter()
            .map(|c| c.identity().to_string())
            .collect(),
    }
}
