//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use quizforge_core::analytics::PerformanceData;
use quizforge_core::exam::human_time;
use quizforge_core::report::ExamReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML page from an exam report.
pub fn generate_html(report: &ExamReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>{} results</title>\n",
        html_escape(&report.quiz.title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{} results</h1>\n",
        html_escape(&report.quiz.title)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Topic: <strong>{}</strong> | {} of {} questions | {}</p>\n",
        html_escape(&report.quiz.topic),
        report.score.total,
        report.quiz.question_count,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    let score_class = score_class(report.score.score_pct as f64 / 100.0);
    html.push_str(&format!(
        "<p class=\"score {score_class}\">{}% <span>({}/{} correct)</span>",
        report.score.score_pct, report.score.correct_count, report.score.total
    ));
    if let Some(delta) = report.score_delta() {
        html.push_str(&format!(
            " <span class=\"delta\">{delta:+} vs previous</span>"
        ));
    }
    html.push_str("</p>\n");
    html.push_str(&format!(
        "<p>Time: {} of {} minutes{}</p>\n",
        human_time(report.duration_ms),
        report.total_minutes,
        if report.auto_submitted {
            " (auto-submitted)"
        } else {
            ""
        }
    ));
    if let Some(avg) = report.history.average_score {
        html.push_str(&format!(
            "<p class=\"meta\">{} attempts | average {:.0}% | best {}%</p>\n",
            report.history.attempts,
            avg,
            report.history.best_score.unwrap_or(0)
        ));
    }

    if !report.analysis.by_tag.is_empty() {
        html.push_str("<h3>Accuracy by tag</h3>\n");
        html.push_str(&generate_bar_chart(&report.analysis.by_tag));
    }
    html.push_str("</section>\n");

    // Weaknesses and strengths
    if !report.analysis.top_weaknesses.is_empty() || !report.analysis.top_strengths.is_empty() {
        html.push_str("<section class=\"analysis\">\n");
        if !report.analysis.top_weaknesses.is_empty() {
            html.push_str("<h2>Weaknesses</h2>\n<ul>\n");
            for w in &report.analysis.top_weaknesses {
                html.push_str(&format!(
                    "<li><strong>{}</strong>: {:.0}% errors, avg {}. {}</li>\n",
                    html_escape(&w.tag),
                    w.err_rate * 100.0,
                    human_time(w.avg_time_ms as u64),
                    html_escape(&w.note)
                ));
            }
            html.push_str("</ul>\n");
        }
        if !report.analysis.top_strengths.is_empty() {
            html.push_str("<h2>Strengths</h2>\n<ul>\n");
            for s in &report.analysis.top_strengths {
                html.push_str(&format!(
                    "<li><strong>{}</strong>: {:.0}% accuracy</li>\n",
                    html_escape(&s.tag),
                    s.acc_rate * 100.0
                ));
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</section>\n");
    }

    // Per-question results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Questions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Question</th><th onclick=\"sortTable(2)\">Result</th><th onclick=\"sortTable(3)\">Your answer</th><th onclick=\"sortTable(4)\">Expected</th><th onclick=\"sortTable(5)\">Time</th><th onclick=\"sortTable(6)\">Changes</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for (i, row) in report.rows.iter().enumerate() {
        let class = if row.correct { "pass" } else { "fail" };
        let result = if row.correct { "correct" } else { "wrong" };
        let flag = if row.flagged {
            " <span class=\"flag\">flagged</span>"
        } else {
            ""
        };

        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            i + 1,
            html_escape(&row.prompt),
            flag,
            result,
            html_escape(&row.selected.join(", ")),
            html_escape(&row.expected),
            human_time(row.time_ms),
            row.changed_count
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ExamReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn score_class(ratio: f64) -> &'static str {
    if ratio >= 0.8 {
        "good"
    } else if ratio >= 0.5 {
        "fair"
    } else {
        "poor"
    }
}

fn generate_bar_chart(
    by_tag: &std::collections::BTreeMap<String, PerformanceData>,
) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 200;

    let total_height = by_tag.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 100,
        total_height
    );

    for (i, (tag, perf)) in by_tag.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = perf.accuracy();
        let width = (accuracy * max_width as f64) as usize;

        let color = match score_class(accuracy) {
            "good" => "#22c55e",
            "fair" => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(tag)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.0}% ({}/{})</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            accuracy * 100.0,
            perf.correct,
            perf.seen
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.score { font-size: 2.5rem; font-weight: bold; margin: 0.5rem 0; }
.score span { font-size: 1rem; font-weight: normal; }
.good { color: #16a34a; }
.fair { color: #ca8a04; }
.poor { color: #dc2626; }
.flag { font-size: 0.75rem; padding: 0 0.4rem; border-radius: 4px; background: #fef3c7; color: #92400e; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
