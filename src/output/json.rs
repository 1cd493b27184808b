//! JSON report renderer.
//!
//! Outputs `{"report": {...}, "comments": [...]}` with counts separated
//! from the posted comments so CI scripts can read either part.

use crate::models::report::RunReport;
use crate::output::OutputRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, report: &RunReport) -> String {
        let output = serde_json::json!({
            "report": {
                "filesConsidered": report.files_considered,
                "linesWhitelisted": report.lines_whitelisted,
                "proposed": report.proposed,
                "dropped": report.dropped,
                "truncated": report.truncated,
                "inline": report.inline,
                "fallback": report.fallback,
                "failed": report.failed,
                "disposition": report.disposition,
                "summary": report.summary,
            },
            "comments": report.posted,
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
