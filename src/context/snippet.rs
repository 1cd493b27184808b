//! Numbered context snippets around commentable lines.

use std::collections::BTreeMap;

use tracing::debug;

use super::resolver::FileResolver;
use crate::diff::whitelist::{eligible_lines, is_commentable};
use crate::models::context::{ContextSnippet, SnippetLine};
use crate::models::diff::FileDiff;

/// Marker rendered between two non-adjacent windows.
const GAP_MARKER: &str = "...";

/// Build the context snippet for one file.
///
/// Every commentable line `L` contributes the window
/// `[max(1, L - radius), min(len, L + radius)]` of the resolved file. The
/// windows are merged into one sorted union. When the file cannot be
/// resolved, or the union comes out empty, the snippet is built from the
/// diff's own added and context lines instead.
pub fn build_snippet(
    file: &FileDiff,
    resolver: &dyn FileResolver,
    radius: usize,
) -> ContextSnippet {
    let content = if file.is_deleted || file.is_binary {
        None
    } else {
        resolver.resolve(&file.path)
    };

    if let Some(content) = content {
        let lines = window_lines(file, &content, radius);
        if !lines.is_empty() {
            return ContextSnippet {
                path: file.path.clone(),
                lines,
                from_diff_only: false,
            };
        }
        debug!(path = %file.path, "context windows empty, using diff text");
    }

    ContextSnippet {
        path: file.path.clone(),
        lines: diff_lines(file),
        from_diff_only: true,
    }
}

/// Merged window ranges (1-based, inclusive) clipped to `total` lines.
pub fn merged_windows(
    anchors: impl IntoIterator<Item = u32>,
    radius: usize,
    total: usize,
) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = anchors
        .into_iter()
        .map(|line| {
            let line = line as usize;
            (line.saturating_sub(radius).max(1), line.saturating_add(radius).min(total))
        })
        .filter(|(start, end)| start <= end)
        .collect();

    ranges.sort_by_key(|r| r.0);
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 + 1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

fn window_lines(file: &FileDiff, content: &str, radius: usize) -> Vec<SnippetLine> {
    let source: Vec<&str> = content.lines().collect();
    let windows = merged_windows(eligible_lines(file), radius, source.len());

    windows
        .into_iter()
        .flat_map(|(start, end)| start..=end)
        .map(|number| SnippetLine {
            number: number as u32,
            text: source[number - 1].to_string(),
        })
        .collect()
}

/// Commentable lines straight from the diff, one entry per new line number.
fn diff_lines(file: &FileDiff) -> Vec<SnippetLine> {
    let by_line: BTreeMap<u32, &str> = file
        .changes()
        .filter(|c| is_commentable(c.kind))
        .filter_map(|c| c.new_line.map(|n| (n, c.content.as_str())))
        .collect();

    by_line
        .into_iter()
        .map(|(number, text)| SnippetLine {
            number,
            text: text.to_string(),
        })
        .collect()
}

/// Render a snippet as `number: text` lines, marking gaps between windows.
pub fn render_snippet(snippet: &ContextSnippet) -> String {
    let mut out = String::new();
    let mut previous: Option<u32> = None;

    for line in &snippet.lines {
        if previous.is_some_and(|prev| line.number > prev + 1) {
            out.push_str(GAP_MARKER);
            out.push('\n');
        }
        out.push_str(&format!("{}: {}\n", line.number, line.text));
        previous = Some(line.number);
    }

    if snippet.from_diff_only && !out.is_empty() {
        out.insert_str(0, "(file content unavailable; showing diff lines only)\n");
    }
    out
}
