//! Unified diff format parser.
//!
//! Parses `git diff` output, GitHub's `.diff` media type, and plain
//! `diff -u` output into `Vec<FileDiff>` with old/new line numbers
//! tracked per change.
//!
//! Hunk bodies are consumed by the line counts in their `@@` header, so a
//! deleted line that itself starts with `--` cannot be mistaken for the next
//! file header. A hunk whose body disagrees with its header is dropped with
//! a warning; the rest of the diff is still parsed.

use tracing::warn;

use super::DiffError;
use crate::models::diff::{Change, FileDiff, Hunk};

/// Parse a unified diff string into a list of file diffs.
///
/// Empty (or whitespace-only) input yields an empty list. Non-empty input
/// with no recognisable file header at all is a [`DiffError::ParseError`].
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>, DiffError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = input.lines().collect();
    let mut files: Vec<FileDiff> = Vec::new();
    let mut saw_header = false;
    let mut i = 0;

    while i < lines.len() {
        let start = if lines[i].starts_with("diff --git ") {
            Some(SectionStart::Git)
        } else if is_plain_file_header(&lines, i) {
            Some(SectionStart::Plain)
        } else {
            None
        };

        let Some(start) = start else {
            // Preamble (e.g. `git format-patch` mail headers) or noise.
            i += 1;
            continue;
        };
        saw_header = true;

        let section_start = i;
        let (file, next) = parse_file_section(&lines, i, start);
        i = next;

        match file {
            Some(file) => files.push(file),
            None => warn!(
                line = section_start + 1,
                "skipping diff section without a usable file path"
            ),
        }
    }

    if !saw_header {
        return Err(DiffError::ParseError(
            "input does not contain any unified diff file headers".to_string(),
        ));
    }

    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionStart {
    /// `diff --git a/x b/x`
    Git,
    /// `--- x` immediately followed by `+++ y`
    Plain,
}

/// Paths and flags accumulated while reading one file's extended headers.
#[derive(Debug, Default)]
struct SectionHeader {
    old_path: Option<String>,
    new_path: Option<String>,
    is_new: bool,
    is_deleted: bool,
    is_rename: bool,
    is_binary: bool,
}

/// `--- ` at `i` directly followed by `+++ ` starts a file section.
fn is_plain_file_header(lines: &[&str], i: usize) -> bool {
    lines[i].starts_with("--- ")
        && lines.get(i + 1).is_some_and(|next| next.starts_with("+++ "))
}

/// Whether `i` begins a new file section of either flavour.
fn is_section_start(lines: &[&str], i: usize) -> bool {
    lines[i].starts_with("diff --git ") || is_plain_file_header(lines, i)
}

/// Parse one file section starting at `start_idx`.
///
/// Returns the file (or `None` when no path could be determined) and the
/// index of the first line after the section.
fn parse_file_section(
    lines: &[&str],
    start_idx: usize,
    start: SectionStart,
) -> (Option<FileDiff>, usize) {
    let mut header = SectionHeader::default();
    let mut i = start_idx;

    if start == SectionStart::Git {
        let (old, new) = parse_git_header(lines[i]);
        header.old_path = old;
        header.new_path = new;
        i += 1;
    }

    // Extended headers, up to the first hunk or the next file.
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("@@") {
            break;
        }
        if line.starts_with("diff --git ") {
            break;
        }
        if let Some(rest) = line.strip_prefix("--- ") {
            header.old_path = parse_marker_path(rest);
            if header.old_path.is_none() {
                header.is_new = true;
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            header.new_path = parse_marker_path(rest);
            if header.new_path.is_none() {
                header.is_deleted = true;
            }
        } else if line.starts_with("new file mode") {
            header.is_new = true;
        } else if line.starts_with("deleted file mode") {
            header.is_deleted = true;
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            header.is_rename = true;
            header.old_path = Some(normalize_path(&unquote(rest)));
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            header.is_rename = true;
            header.new_path = Some(normalize_path(&unquote(rest)));
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            header.is_binary = true;
        }
        // index, similarity, mode and copy lines carry nothing we need.
        i += 1;
    }

    let mut hunks = Vec::new();
    while i < lines.len() && !is_section_start(lines, i) {
        if !lines[i].starts_with("@@") {
            i += 1;
            continue;
        }
        let (hunk, next) = parse_hunk(lines, i);
        if let Some(hunk) = hunk {
            hunks.push(hunk);
        }
        i = next;
    }

    if header.is_new {
        header.old_path = None;
    }
    if header.is_deleted {
        header.new_path = None;
    }
    if let (Some(old), Some(new)) = (&header.old_path, &header.new_path) {
        if old != new {
            header.is_rename = true;
        }
    }

    let path = if header.is_deleted {
        header.old_path.clone()
    } else {
        header.new_path.clone().or_else(|| header.old_path.clone())
    };

    let file = path.filter(|p| !p.is_empty()).map(|path| FileDiff {
        path,
        old_path: header.old_path,
        new_path: header.new_path,
        is_new: header.is_new,
        is_deleted: header.is_deleted,
        is_rename: header.is_rename,
        is_binary: header.is_binary,
        hunks,
    });

    (file, i)
}

/// Parse the "diff --git a/path b/path" header line into normalized paths.
fn parse_git_header(line: &str) -> (Option<String>, Option<String>) {
    let rest = line.strip_prefix("diff --git ").unwrap_or(line);

    // Quoted form: diff --git "a/x y" "b/x y"
    if rest.starts_with('"') {
        let mut parts = rest.split("\" \"");
        let a = parts.next().map(unquote);
        let b = parts.next().map(unquote);
        return (
            a.map(|p| normalize_path(strip_diff_prefix(&p))),
            b.map(|p| normalize_path(strip_diff_prefix(&p))),
        );
    }

    let (a_part, b_part) = match find_second_prefix(rest) {
        Some(b_idx) => (&rest[..b_idx], &rest[b_idx + 1..]),
        None => rest.split_once(' ').unwrap_or((rest, "")),
    };

    let clean = |p: &str| {
        let p = normalize_path(strip_diff_prefix(p));
        (!p.is_empty()).then_some(p)
    };
    (clean(a_part), clean(b_part))
}

/// Path after a `---` / `+++` marker; `None` for `/dev/null`.
fn parse_marker_path(raw: &str) -> Option<String> {
    // Plain `diff -u` appends a tab and a timestamp.
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    let raw = unquote(raw);
    if raw == "/dev/null" {
        return None;
    }
    let path = normalize_path(strip_diff_prefix(&raw));
    (!path.is_empty()).then_some(path)
}

/// Strip a single-character git diff prefix (`a/`, `b/`, `c/`, `w/`, `i/`, `o/`).
///
/// `c/`, `w/`, `i/` and `o/` appear when `diff.mnemonicPrefix` is enabled.
pub fn strip_diff_prefix(path: &str) -> &str {
    if path.len() >= 2 {
        let bytes = path.as_bytes();
        if bytes[1] == b'/' && matches!(bytes[0], b'a' | b'b' | b'c' | b'w' | b'i' | b'o') {
            return &path[2..];
        }
    }
    path
}

/// Normalize a repository-relative path.
///
/// Converts backslashes to forward slashes, drops leading `./` segments and
/// collapses repeated separators. Does not touch `a/`/`b/` prefixes; see
/// [`strip_diff_prefix`].
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Remove surrounding double quotes and the escapes git uses inside them.
fn unquote(s: &str) -> String {
    let s = s.trim();
    let inner = s.strip_prefix('"').unwrap_or(s);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Find the position of the second path prefix separator in a diff header.
///
/// Looks for ` X/` where X is any known single-letter prefix.
fn find_second_prefix(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (1..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b' '
            && bytes.get(i + 2) == Some(&b'/')
            && matches!(bytes.get(i + 1), Some(b'a' | b'b' | b'c' | b'w' | b'i' | b'o'))
    })
}

/// Skip forward to the next hunk or file header.
fn skip_to_next_boundary(lines: &[&str], mut i: usize) -> usize {
    while i < lines.len() && !lines[i].starts_with("@@") && !is_section_start(lines, i) {
        i += 1;
    }
    i
}

/// Parse a single hunk whose `@@` header is at `start`.
///
/// Returns `None` (after logging) when the header is unreadable or the body
/// does not match the header's line counts.
fn parse_hunk(lines: &[&str], start: usize) -> (Option<Hunk>, usize) {
    let Some(range) = parse_hunk_header(lines[start]) else {
        warn!(header = lines[start], "skipping hunk with unreadable header");
        return (None, skip_to_next_boundary(lines, start + 1));
    };
    // Numbering runs up to start + count; past u32::MAX the header is bogus.
    if range.old_start.checked_add(range.old_count).is_none()
        || range.new_start.checked_add(range.new_count).is_none()
    {
        warn!(header = lines[start], "skipping hunk with out-of-range line numbers");
        return (None, skip_to_next_boundary(lines, start + 1));
    }

    let mut changes: Vec<Change> = Vec::new();
    let mut old_line = range.old_start;
    let mut new_line = range.new_start;
    let mut old_left = range.old_count;
    let mut new_left = range.new_count;
    let mut i = start + 1;

    while (old_left > 0 || new_left > 0) && i < lines.len() {
        let line = lines[i];
        if line.starts_with("diff --git ") {
            break;
        }

        if let Some(content) = line.strip_prefix('+') {
            if new_left == 0 {
                break;
            }
            changes.push(Change::added(content, new_line));
            new_line += 1;
            new_left -= 1;
        } else if let Some(content) = line.strip_prefix('-') {
            if old_left == 0 {
                break;
            }
            changes.push(Change::deleted(content, old_line));
            old_line += 1;
            old_left -= 1;
        } else if line.starts_with(' ') || line.is_empty() {
            // Some tools strip the trailing space of empty context lines.
            if old_left == 0 || new_left == 0 {
                break;
            }
            let content = line.get(1..).unwrap_or("");
            changes.push(Change::context(content, old_line, new_line));
            old_line += 1;
            new_line += 1;
            old_left -= 1;
            new_left -= 1;
        } else if line.starts_with('\\') {
            // "\ No newline at end of file"
        } else {
            break;
        }
        i += 1;
    }

    // Trailing "\ No newline at end of file" after the last counted line.
    while i < lines.len() && lines[i].starts_with('\\') {
        i += 1;
    }

    if old_left > 0 || new_left > 0 {
        warn!(
            header = lines[start],
            missing_old = old_left,
            missing_new = new_left,
            "skipping hunk whose body does not match its header"
        );
        return (None, skip_to_next_boundary(lines, i));
    }

    let hunk = Hunk {
        old_start: range.old_start,
        old_count: range.old_count,
        new_start: range.new_start,
        new_count: range.new_count,
        header: range.section,
        changes,
    };
    (Some(hunk), i)
}

/// The numeric ranges and trailing text of a `@@` line.
#[derive(Debug, PartialEq, Eq)]
struct HunkRange {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
    section: Option<String>,
}

/// Parse a `@@ -old_start,old_count +new_start,new_count @@ section` line.
fn parse_hunk_header(line: &str) -> Option<HunkRange> {
    let line = line.strip_prefix("@@ ")?;
    let end = line.find(" @@")?;
    let range_part = &line[..end];
    let section = line[end + 3..].trim();
    let section = (!section.is_empty()).then(|| section.to_string());

    let (old, new) = range_part.split_once(' ')?;
    let (old_start, old_count) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(new.strip_prefix('+')?)?;

    Some(HunkRange {
        old_start,
        old_count,
        new_start,
        new_count,
        section,
    })
}

/// Parse "start,count" or "start" (count defaults to 1).
fn parse_range(s: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}
