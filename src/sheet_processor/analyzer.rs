//! Column role detection.
//!
//! Headers look like `Default_Translation (en-en)` / `Target_Translation (de-de)`.
//! The source column carries the explicit marker or an English locale in
//! parentheses; the target column carries its marker or any other locale.

use crate::sheet_processor::dataset::Workbook;
use crate::utils::{Result, TranslatorError};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SOURCE_MARKER: &str = "Default_Translation";
pub const TARGET_MARKER: &str = "Target_Translation";
pub const UNKNOWN_LANGUAGE: &str = "unknown";

static PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("valid parenthesis regex"));
static LOCALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").expect("valid locale regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub source: String,
    pub target: String,
    pub language: String,
}

/// Raw scan result; either role may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    pub source: Option<String>,
    pub target: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Strength {
    Locale,
    Marker,
}

/// First parenthesized substring of a header, trimmed.
pub fn extract_language_code(header: &str) -> Option<String> {
    PAREN_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn locale_code(header: &str) -> Option<String> {
    extract_language_code(header).filter(|code| LOCALE_RE.is_match(code))
}

fn is_english(code: &str) -> bool {
    let lower = code.to_ascii_lowercase();
    lower == "en" || lower.starts_with("en-") || lower.starts_with("en_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Source,
    Target,
}

/// Markers decide the role on their own; only unmarked headers fall back to
/// the English/non-English locale split.
fn classify(header: &str) -> Option<(Role, Strength)> {
    if header.contains(SOURCE_MARKER) {
        return Some((Role::Source, Strength::Marker));
    }
    if header.contains(TARGET_MARKER) {
        return Some((Role::Target, Strength::Marker));
    }
    locale_code(header).map(|code| {
        if is_english(&code) {
            (Role::Source, Strength::Locale)
        } else {
            (Role::Target, Strength::Locale)
        }
    })
}

/// Scans headers left to right. A stronger match replaces a weaker one; among
/// equal matches the first one wins.
pub fn detect_columns<S: AsRef<str>>(headers: &[S]) -> Detection {
    let mut source: Option<(Strength, &str)> = None;
    let mut target: Option<(Strength, &str)> = None;

    for header in headers.iter().map(|h| h.as_ref()) {
        let Some((role, strength)) = classify(header) else {
            continue;
        };
        let slot = match role {
            Role::Source => &mut source,
            Role::Target => &mut target,
        };
        if slot.map_or(true, |(best, _)| strength > best) {
            *slot = Some((strength, header));
        }
    }

    let language = target
        .and_then(|(_, h)| extract_language_code(h))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

    Detection {
        source: source.map(|(_, h)| h.to_string()),
        target: target.map(|(_, h)| h.to_string()),
        language,
    }
}

pub fn resolve_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnRoles> {
    let detection = detect_columns(headers);
    match (detection.source, detection.target) {
        (Some(source), Some(target)) => Ok(ColumnRoles {
            source,
            target,
            language: detection.language,
        }),
        _ => Err(TranslatorError::ColumnDetection {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
        }),
    }
}

/// Picks the first sheet whose headers resolve and makes it the active one.
pub fn select_translation_sheet(workbook: &mut Workbook) -> Result<ColumnRoles> {
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        if let Ok(roles) = resolve_columns(&sheet.headers) {
            workbook.active = index;
            return Ok(roles);
        }
    }
    Err(TranslatorError::ColumnDetection {
        headers: workbook
            .sheets
            .first()
            .map(|s| s.headers.clone())
            .unwrap_or_default(),
    })
}
