//! Terminal renderer: posted comments grouped by file, then the counts.

use colored::Colorize;

use crate::models::comment::{Disposition, PostedComment};
use crate::models::report::RunReport;
use crate::output::OutputRenderer;

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render(&self, report: &RunReport) -> String {
        let mut output = String::new();

        if !report.summary.trim().is_empty() {
            output.push_str(&format!(
                " {} {}\n\n",
                disposition_label(report.disposition),
                report.summary.trim()
            ));
        }

        if report.posted.is_empty() {
            output.push_str(&format!("{}", "  ✔ No comments posted.\n".green()));
        }

        let mut current_file = "";
        for comment in &report.posted {
            if comment.path() != current_file {
                if !current_file.is_empty() {
                    output.push('\n');
                }
                current_file = comment.path();
            }

            let (icon, location) = match comment {
                PostedComment::Inline { path, line, .. } => {
                    ("●".cyan().bold().to_string(), format!("{path}:{line}"))
                }
                PostedComment::FileLevel { path, line, .. } => {
                    let location = match line {
                        Some(line) => format!("{path} (wanted line {line})"),
                        None => path.clone(),
                    };
                    ("◌".yellow().bold().to_string(), location)
                }
            };

            let content = comment.content();
            output.push_str(&format!(" {} {}\n", icon, location.bold()));
            output.push_str(&format!("   {}\n", content.remark));
            if let Some(ref suggestion) = content.suggestion {
                for line in suggestion.lines() {
                    output.push_str(&format!("   {} {}\n", "→".cyan(), line));
                }
            }
        }

        output.push_str(&format!("\n{}\n", "───────────────────────────────────".dimmed()));
        output.push_str(&format!(
            " {} files, {} commentable lines\n",
            report.files_considered.to_string().bold(),
            report.lines_whitelisted.to_string().bold(),
        ));
        output.push_str(&format!(
            " {} proposed: {} inline, {} fallback, {} dropped, {} truncated, {} failed\n",
            report.proposed.to_string().bold(),
            report.inline.to_string().green().bold(),
            report.fallback.to_string().yellow().bold(),
            report.dropped,
            report.truncated,
            if report.failed > 0 {
                report.failed.to_string().red().bold().to_string()
            } else {
                report.failed.to_string()
            },
        ));
        output.push_str(&format!(
            " {}\n",
            crate::constants::AI_DISCLOSURE.dimmed()
        ));

        output
    }
}

fn disposition_label(disposition: Disposition) -> String {
    match disposition {
        Disposition::Approve => "✔ approve".green().bold().to_string(),
        Disposition::RequestChanges => "✖ request changes".red().bold().to_string(),
        Disposition::Comment => "ℹ comment".blue().bold().to_string(),
    }
}
