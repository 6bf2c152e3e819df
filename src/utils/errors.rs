use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Could not detect source/target columns. Found columns: {headers:?}")]
    ColumnDetection { headers: Vec<String> },

    #[error("Transient automation error: {0}")]
    TransientAutomation(String),

    #[error("Automation session lost: {0}")]
    SessionFatal(String),

    #[error("WebDriver error `{error}`: {message}")]
    WebDriver { error: String, message: String },

    #[error("Row count mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No input file found (checked CLI argument, '{import_dir}' folder and current directory)")]
    NoInputFiles { import_dir: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, TranslatorError>;

/// WebDriver error codes that mean the browser session is gone.
const FATAL_WEBDRIVER_ERRORS: &[&str] = &[
    "invalid session id",
    "no such window",
    "session not created",
];

impl TranslatorError {
    pub fn is_session_fatal(&self) -> bool {
        match self {
            TranslatorError::SessionFatal(_) => true,
            TranslatorError::WebDriver { error, .. } => {
                FATAL_WEBDRIVER_ERRORS.contains(&error.as_str())
            }
            TranslatorError::HttpError(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Errors worth retrying inside a single row's translation attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslatorError::TransientAutomation(_) => true,
            TranslatorError::WebDriver { .. } | TranslatorError::HttpError(_) => {
                !self.is_session_fatal()
            }
            _ => false,
        }
    }
}
