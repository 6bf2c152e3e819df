pub mod automation;
pub mod cli;
pub mod sheet_processor;
pub mod state;
pub mod translation;
pub mod utils;

pub use automation::{ElementRef, Locator, UiSession, WebDriverSession};
pub use sheet_processor::{CellValue, ColumnRoles, Sheet, SheetFormat, Workbook};
pub use state::{CheckpointWriter, FileReport, FileStatus, RunReport, RunState};
pub use translation::{RunController, TranslationInvoker, TranslationOutcome};
pub use utils::{AppConfig, Result, RunMode, RunOptions, TranslatorError};
