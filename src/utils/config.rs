use crate::automation::Locator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub translation: TranslationConfig,
    pub checkpoint: CheckpointConfig,
    pub paths: PathsConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub start_maximized: bool,
    /// `{sl}` and `{tl}` are replaced with the source and target language.
    pub url_template: String,
    pub source_lang: String,
    pub page_load_delay_ms: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub result_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub stability_window_ms: u64,
    pub stability_interval_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub exponential_backoff: bool,
    pub input_locator: Locator,
    pub output_locator: Locator,
    /// Output texts that mean the site is still working on the request.
    pub busy_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub save_interval: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub import_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub marker_column: String,
    pub escape_formulas: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            browser: BrowserKind::Chrome,
            headless: false,
            start_maximized: true,
            url_template: "https://translate.google.com/?sl={sl}&tl={tl}&op=translate".to_string(),
            source_lang: "auto".to_string(),
            page_load_delay_ms: 5000,
            request_timeout_seconds: 60,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1500,
            max_delay_ms: 3500,
            result_timeout_ms: 15_000,
            poll_interval_ms: 500,
            stability_window_ms: 5000,
            stability_interval_ms: 500,
            max_attempts: 3,
            retry_backoff_ms: 2000,
            max_backoff_ms: 10_000,
            exponential_backoff: false,
            input_locator: Locator::Css("textarea".to_string()),
            output_locator: Locator::Css("span[jsname='W297wb']".to_string()),
            busy_markers: vec!["Translating...".to_string(), "Translating…".to_string()],
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self { save_interval: 10 }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            import_dir: PathBuf::from("import"),
            output_dir: PathBuf::from("output"),
            output_prefix: "translated_".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            marker_column: "Has_Translation".to_string(),
            escape_formulas: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> crate::utils::errors::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::utils::errors::TranslatorError::ConfigError(e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| crate::utils::errors::TranslatorError::ConfigError(e.to_string()))
    }

    pub fn load_or_default(path: Option<&str>) -> Self {
        let Some(p) = path else {
            return Self::default();
        };
        if !std::path::Path::new(p).exists() {
            return Self::default();
        }
        match Self::load_from_file(p) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = p, error = %e, "Invalid configuration, using defaults");
                Self::default()
            }
        }
    }
}

impl TranslationConfig {
    pub fn request_delay_range(&self) -> (Duration, Duration) {
        let min = Duration::from_millis(self.min_delay_ms);
        let max = Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms));
        (min, max)
    }
}

/// Which rows a run (re)translates. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    FillMissing,
    RetranslateAll,
    ResumeFromOutput,
}

impl RunMode {
    pub fn loads_prior_output(&self) -> bool {
        matches!(self, RunMode::ResumeFromOutput)
    }

    pub fn keeps_existing_targets(&self) -> bool {
        !matches!(self, RunMode::RetranslateAll)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::FillMissing => write!(f, "fill-missing"),
            RunMode::RetranslateAll => write!(f, "retranslate-all"),
            RunMode::ResumeFromOutput => write!(f, "resume"),
        }
    }
}

/// Immutable settings for one run, passed through the controller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub config: AppConfig,
}

impl RunOptions {
    pub fn new(mode: RunMode, config: AppConfig) -> Self {
        Self { mode, config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [checkpoint]
            save_interval = 25

            [translation]
            max_attempts = 5
            output_locator = { by = "xpath", value = "//span[@lang]" }
            "#,
        )
        .unwrap();

        assert_eq!(config.checkpoint.save_interval, 25);
        assert_eq!(config.translation.max_attempts, 5);
        assert_eq!(
            config.translation.output_locator,
            Locator::XPath("//span[@lang]".to_string())
        );
        assert_eq!(config.translation.min_delay_ms, 1500);
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
        assert_eq!(config.browser.browser, BrowserKind::Chrome);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Some("does/not/exist.toml"));
        assert_eq!(config.checkpoint.save_interval, 10);
        assert_eq!(config.output.marker_column, "Has_Translation");
    }

    #[test]
    fn delay_range_never_inverts() {
        let config = TranslationConfig {
            min_delay_ms: 3000,
            max_delay_ms: 1000,
            ..TranslationConfig::default()
        };
        let (min, max) = config.request_delay_range();
        assert_eq!(min, max);
    }

    #[test]
    fn mode_predicates() {
        assert!(RunMode::ResumeFromOutput.loads_prior_output());
        assert!(!RunMode::FillMissing.loads_prior_output());
        assert!(RunMode::FillMissing.keeps_existing_targets());
        assert!(!RunMode::RetranslateAll.keeps_existing_targets());
    }
}
