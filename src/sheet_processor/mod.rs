pub mod analyzer;
pub mod dataset;
pub mod reader;
pub mod selector;
pub mod writer;

pub use analyzer::{detect_columns, resolve_columns, select_translation_sheet, ColumnRoles, Detection};
pub use dataset::{CellValue, Sheet, SheetFormat, Workbook};
pub use reader::{discover_input_files, load_workbook};
pub use selector::select_rows;
pub use writer::write_workbook;
