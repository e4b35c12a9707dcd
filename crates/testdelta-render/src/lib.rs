//! Rendering for testdelta diff receipts.
//!
//! Everything here is a pure function of a [`DiffReceipt`]: markdown for PR
//! comments, a self-contained HTML page, and GitHub Actions annotation lines.

mod html;

pub use html::render_html;

use testdelta_types::{Comparison, DiffReceipt, VerdictStatus};

const MAX_REGRESSIONS: usize = 10;
const MAX_FIXES: usize = 10;
const MAX_FLAKY: usize = 5;
const MAX_CLUSTERS: usize = 3;
const REGRESSION_MESSAGE_CHARS: usize = 100;
const CLUSTER_MESSAGE_CHARS: usize = 80;

/// Markdown suitable for a GitHub/GitLab pull request comment.
pub fn render_markdown(receipt: &DiffReceipt) -> String {
    let mut out = String::new();
    let summary = &receipt.summary;

    let header = match summary.verdict.status {
        VerdictStatus::Pass => "✅ testdelta: pass",
        VerdictStatus::Warn => "⚠️ testdelta: warn",
        VerdictStatus::Fail => "❌ testdelta: fail",
    };
    out.push_str(header);
    out.push_str("\n\n");

    out.push_str("## 🧪 Test Report Diff\n\n");
    out.push_str(&format!(
        "**Baseline:** {} tests ({} passed, {} failed, {} skipped)  \n",
        receipt.baseline.total_tests,
        receipt.baseline.passed,
        receipt.baseline.failed,
        receipt.baseline.skipped
    ));
    out.push_str(&format!(
        "**Current:** {} tests ({} passed, {} failed, {} skipped)\n\n",
        receipt.current.total_tests,
        receipt.current.passed,
        receipt.current.failed,
        receipt.current.skipped
    ));

    out.push_str("### Summary\n");
    out.push_str("|  |  |\n");
    out.push_str("|---|---|\n");
    let rows = [
        ("🔴 **New Failures**".to_string(), summary.new_failures),
        ("✅ **Fixed Tests**".to_string(), summary.fixed_failures),
        ("⚠️ **Flaky Tests**".to_string(), summary.flaky_tests),
        (
            format!("⏱️ **Slower (>{:.0}%)**", summary.threshold_pct),
            summary.slower_tests,
        ),
        (
            format!("🚀 **Faster (>{:.0}%)**", summary.threshold_pct),
            summary.faster_tests,
        ),
    ];
    for (label, count) in rows {
        if count > 0 {
            out.push_str(&format!("| {label} | {count} |\n"));
        }
    }
    out.push('\n');

    let regressions: Vec<&Comparison> = receipt.regressions().collect();
    if !regressions.is_empty() {
        out.push_str("### 🔴 Regressions\n\n");
        for r in regressions.iter().take(MAX_REGRESSIONS) {
            out.push_str(&format!("- **{}**::`{}`\n", r.test.class_name, r.test.name));
            if let Some(err) = &r.test.error {
                out.push_str(&format!("  - Error: {}\n", err.error_type));
                out.push_str(&format!(
                    "  - Message: {}\n",
                    truncate_with_ellipsis(&err.message, REGRESSION_MESSAGE_CHARS)
                ));
            }
        }
        push_more(&mut out, regressions.len(), MAX_REGRESSIONS, "");
    }

    let fixes: Vec<&Comparison> = receipt.fixes().collect();
    if !fixes.is_empty() {
        out.push_str("### ✅ Fixed Tests\n\n");
        for f in fixes.iter().take(MAX_FIXES) {
            out.push_str(&format!("- {}::`{}`\n", f.test.class_name, f.test.name));
        }
        push_more(&mut out, fixes.len(), MAX_FIXES, "");
    }

    let flaky: Vec<&Comparison> = receipt.flaky().collect();
    if !flaky.is_empty() {
        out.push_str("### ⚠️ Flaky Tests\n\n");
        for f in flaky.iter().take(MAX_FLAKY) {
            out.push_str(&format!(
                "- {}::`{}` ({} → {})\n",
                f.test.class_name, f.test.name, f.old_status, f.new_status
            ));
        }
        push_more(&mut out, flaky.len(), MAX_FLAKY, "");
    }

    if !receipt.clusters.is_empty() {
        out.push_str("### 🔗 Grouped Failures\n\n");
        for cluster in receipt.clusters.iter().take(MAX_CLUSTERS) {
            out.push_str(&format!(
                "- **{}** ({} failures)\n",
                cluster.error_type, cluster.count
            ));
            out.push_str(&format!(
                "  - `{}`\n",
                truncate_with_ellipsis(&cluster.error_message, CLUSTER_MESSAGE_CHARS)
            ));
        }
        push_more(&mut out, receipt.clusters.len(), MAX_CLUSTERS, " clusters");
    }

    if !summary.verdict.reasons.is_empty() {
        out.push_str("**Notes:**\n");
        for r in &summary.verdict.reasons {
            out.push_str(&format!("- {r}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!("---\n_Generated at {}_\n", receipt.generated_at));
    out
}

/// GitHub Actions workflow commands: one error per regression, one warning
/// per passing test that got slower than the threshold.
pub fn github_annotations(receipt: &DiffReceipt) -> Vec<String> {
    let mut lines = Vec::new();

    for r in receipt.regressions() {
        let detail = match &r.test.error {
            Some(err) => format!("{}: {}", err.error_type, err.message),
            None => "no error details".to_string(),
        };
        let msg = format!(
            "testdelta regression {id} ({old} → {new}): {detail}",
            id = r.identity(),
            old = r.old_status,
            new = r.new_status,
        );
        lines.push(format!("::error::{}", escape_workflow_data(&msg)));
    }

    for s in receipt.slower() {
        let current = s.test.duration_ms;
        let baseline = current - s.duration_change_ms;
        let msg = format!(
            "testdelta {id} slower: {pct} (baseline {b}, current {c})",
            id = s.identity(),
            pct = format_pct(s.duration_change_pct),
            b = format_ms(baseline),
            c = format_ms(current),
        );
        lines.push(format!("::warning::{}", escape_workflow_data(&msg)));
    }

    lines
}

pub(crate) fn format_pct(pct: f64) -> String {
    let sign = if pct > 0.0 { "+" } else { "" };
    format!("{sign}{pct:.1}%")
}

pub(crate) fn format_ms(ms: f64) -> String {
    format!("{ms:.0}ms")
}

fn push_more(out: &mut String, total: usize, shown: usize, noun: &str) {
    if total > shown {
        out.push_str(&format!("\n*... and {} more{noun}*\n", total - shown));
    }
    out.push('\n');
}

/// First `max` chars of `s`, with `...` appended when something was cut.
fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// Workflow command data must not carry raw newlines or percent signs.
fn escape_workflow_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
