//! Object metadata extraction for AL source files.
//!
//! A best-effort line scan: the namespace, `using` imports, the object
//! header (`table 50100 "Sales Header"`) and the header properties that
//! precede the first structural section. Files without a header simply
//! produce no metadata.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::resolver::FileResolver;
use crate::models::context::ObjectMetadata;
use crate::models::diff::FileDiff;

/// Object kinds recognized in a header line.
const OBJECT_KINDS: &[&str] = &[
    "tableextension",
    "table",
    "pageextension",
    "pagecustomization",
    "page",
    "codeunit",
    "reportextension",
    "report",
    "query",
    "xmlport",
    "enumextension",
    "enum",
    "permissionsetextension",
    "permissionset",
    "profile",
];

/// Header properties worth surfacing to the model, in canonical casing.
const PROPERTY_KEYS: &[&str] = &[
    "Caption",
    "DataClassification",
    "TableType",
    "PageType",
    "SourceTable",
    "SourceTableView",
    "ApplicationArea",
    "UsageCategory",
    "Access",
    "Subtype",
    "Extensible",
    "ObsoleteState",
    "ObsoleteReason",
    "ObsoleteTag",
    "DrillDownPageId",
    "LookupPageId",
    "Permissions",
    "TableNo",
    "SingleInstance",
    "InherentPermissions",
    "InherentEntitlements",
    "Editable",
    "DataAccessIntent",
    "ProcessingOnly",
    "QueryType",
    "Direction",
    "Format",
    "Assignable",
];

static NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*namespace\s+(.+?)\s*;").expect("valid regex")
});

static USING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*using\s+(.+?)\s*;").expect("valid regex"));

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let kinds = OBJECT_KINDS.join("|");
    Regex::new(&format!(
        r#"(?i)^\s*({kinds})\s+(\d+)\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_.]*))"#
    ))
    .expect("valid regex")
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9]*)\s*=\s*(.+?)\s*;").expect("valid regex")
});

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:local|internal|protected)\s+)?(?:fields|keys|fieldgroups|layout|actions|dataset|requestpage|rendering|labels|elements|schema|views|var|trigger|procedure|value)\b",
    )
    .expect("valid regex")
});

/// Extract metadata for one changed file from its resolved content.
///
/// Deleted and binary files, unresolvable files and files without an object
/// header all yield `None`.
pub fn extract_metadata(file: &FileDiff, resolver: &dyn FileResolver) -> Option<ObjectMetadata> {
    if file.is_deleted || file.is_binary {
        return None;
    }
    let content = resolver.resolve(&file.path)?;
    scan_object(&file.path, &content)
}

/// Scan source text for an object header and its properties.
pub fn scan_object(path: &str, content: &str) -> Option<ObjectMetadata> {
    let mut namespace: Option<String> = None;
    let mut usings: Vec<String> = Vec::new();
    let mut lines = content.lines();

    let (kind, id, name) = loop {
        let line = lines.next()?;
        if is_comment(line) {
            continue;
        }
        if let Some(caps) = HEADER_RE.captures(line) {
            let Ok(id) = caps[2].parse::<u32>() else {
                continue;
            };
            let name = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            break (caps[1].to_lowercase(), id, name);
        }
        if namespace.is_none() {
            if let Some(caps) = NAMESPACE_RE.captures(line) {
                namespace = Some(unquote(&caps[1]));
                continue;
            }
        }
        if let Some(caps) = USING_RE.captures(line) {
            usings.push(unquote(&caps[1]));
        }
    };

    let mut properties = IndexMap::new();
    for line in lines {
        if SECTION_RE.is_match(line) {
            break;
        }
        if is_comment(line) {
            continue;
        }
        let Some(caps) = PROPERTY_RE.captures(line) else {
            continue;
        };
        let Some(key) = canonical_key(&caps[1]) else {
            continue;
        };
        properties
            .entry(key.to_string())
            .or_insert_with(|| property_value(&caps[2]));
    }

    Some(ObjectMetadata {
        path: path.to_string(),
        kind,
        id,
        name,
        namespace,
        usings,
        properties,
    })
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

fn canonical_key(key: &str) -> Option<&'static str> {
    PROPERTY_KEYS
        .iter()
        .copied()
        .find(|k| k.eq_ignore_ascii_case(key))
}

/// The leading quoted literal of a value, or the whole value unquoted.
fn property_value(raw: &str) -> String {
    let raw = raw.trim();
    for quote in ['\'', '"'] {
        if let Some(rest) = raw.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return rest[..end].to_string();
            }
        }
    }
    raw.to_string()
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(raw)
        .to_string()
}
