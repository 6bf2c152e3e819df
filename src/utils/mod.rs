pub mod config;
pub mod errors;

pub use config::{AppConfig, BrowserKind, RunMode, RunOptions};
pub use errors::{Result, TranslatorError};

pub fn sanitize_cell(value: &str) -> String {
    if value.starts_with('=')
        || value.starts_with('+')
        || value.starts_with('-')
        || value.starts_with('@')
    {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// `"de-de"` -> `"de"`, as expected by the translation site's `tl` parameter.
pub fn short_lang_code(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Keeps a language code safe to embed in a file name.
pub fn file_safe_code(code: &str) -> String {
    let cleaned: String = code
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_formula_prefixes() {
        assert_eq!(sanitize_cell("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(sanitize_cell("-5 Grad"), "'-5 Grad");
        assert_eq!(sanitize_cell("Hallo"), "Hallo");
    }

    #[test]
    fn short_code_truncates_at_first_hyphen() {
        assert_eq!(short_lang_code("de-de"), "de");
        assert_eq!(short_lang_code("zh-Hant-TW"), "zh");
        assert_eq!(short_lang_code("fr"), "fr");
    }

    #[test]
    fn file_safe_code_replaces_separators() {
        assert_eq!(file_safe_code("pt-BR"), "pt-BR");
        assert_eq!(file_safe_code("../x y"), "___x_y");
        assert_eq!(file_safe_code("  "), "unknown");
    }
}
