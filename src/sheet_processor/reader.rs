use crate::sheet_processor::dataset::{CellValue, Sheet, SheetFormat, Workbook};
use crate::utils::{Result, TranslatorError};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tracing::debug;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

pub fn format_for(path: &Path) -> Result<SheetFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ext == "csv" {
        Ok(SheetFormat::Csv)
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        Ok(SheetFormat::Xlsx)
    } else {
        Err(TranslatorError::UnsupportedFormat(path.display().to_string()))
    }
}

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    if !path.is_file() {
        return Err(TranslatorError::FileNotFound(path.display().to_string()));
    }
    match format_for(path)? {
        SheetFormat::Csv => read_csv(path),
        SheetFormat::Xlsx => read_spreadsheet(path),
    }
}

fn read_csv(path: &Path) -> Result<Workbook> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());
    let mut sheet = Sheet::new(name, headers);

    for record in reader.records() {
        let record = record?;
        sheet.rows.push(record.iter().map(CellValue::text).collect());
    }

    debug!(file = %path.display(), rows = sheet.row_count(), "Loaded CSV");
    Ok(Workbook::single(sheet, SheetFormat::Csv))
}

fn read_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let origin = range.start().unwrap_or((0, 0));
        let mut rows = range.rows();

        let headers: Vec<String> = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| convert_cell(cell).as_text().map(|s| s.into_owned()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let mut sheet = Sheet::new(name, headers);
        sheet.origin = origin;
        for row in rows {
            sheet.rows.push(row.iter().map(convert_cell).collect());
        }
        sheets.push(sheet);
    }

    if sheets.is_empty() {
        return Err(TranslatorError::UnsupportedFormat(format!(
            "{} contains no worksheets",
            path.display()
        )));
    }

    debug!(file = %path.display(), sheets = sheets.len(), "Loaded spreadsheet");
    Ok(Workbook {
        sheets,
        active: 0,
        format: SheetFormat::Xlsx,
    })
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        other => CellValue::text(other.to_string()),
    }
}

fn is_candidate(path: &Path, output_prefix: &str) -> bool {
    if !path.is_file() || format_for(path).is_err() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !(name.contains("output")
        || name.starts_with("generated_")
        || name.starts_with("~$")
        || (!output_prefix.is_empty() && name.starts_with(output_prefix)))
}

fn list_candidates(dir: &Path, output_prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| is_candidate(p, output_prefix))
        .collect();
    files.sort();
    Ok(files)
}

/// Input files, in priority order: the explicit argument, the import
/// directory, then the working directory.
pub fn discover_input_files(
    explicit: Option<&Path>,
    import_dir: &Path,
    working_dir: &Path,
    output_prefix: &str,
) -> Result<Vec<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(TranslatorError::FileNotFound(path.display().to_string()));
        }
        format_for(path)?;
        return Ok(vec![path.to_path_buf()]);
    }

    let from_import = list_candidates(import_dir, output_prefix)?;
    if !from_import.is_empty() {
        return Ok(from_import);
    }

    let from_cwd = list_candidates(working_dir, output_prefix)?;
    if !from_cwd.is_empty() {
        return Ok(from_cwd);
    }

    Err(TranslatorError::NoInputFiles {
        import_dir: import_dir.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_csv_and_strips_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(
            &path,
            "\u{feff}ID,Default_Translation (en-en),Target_Translation (de-de)\n1,Hello,\n2,,\n3,Bye,Tschüss\n",
        )
        .unwrap();

        let workbook = load_workbook(&path).unwrap();
        let sheet = workbook.active_sheet();

        assert_eq!(workbook.format, SheetFormat::Csv);
        assert_eq!(sheet.headers[0], "ID");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.cell(0, 1), &CellValue::text("Hello"));
        assert!(sheet.cell(1, 1).is_blank());
        assert_eq!(sheet.cell(2, 2), &CellValue::text("Tschüss"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();
        assert!(matches!(
            load_workbook(&path),
            Err(TranslatorError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn discovery_prefers_import_dir_and_skips_outputs() {
        let dir = TempDir::new().unwrap();
        let import = dir.path().join("import");
        fs::create_dir(&import).unwrap();
        fs::write(import.join("b.csv"), "x\n").unwrap();
        fs::write(import.join("a.xlsx"), "x").unwrap();
        fs::write(import.join("output_de.csv"), "x\n").unwrap();
        fs::write(import.join("translated_de-de.csv"), "x\n").unwrap();
        fs::write(import.join("~$a.xlsx"), "x").unwrap();
        fs::write(dir.path().join("root.csv"), "x\n").unwrap();

        let files = discover_input_files(None, &import, dir.path(), "translated_").unwrap();
        assert_eq!(files, vec![import.join("a.xlsx"), import.join("b.csv")]);
    }

    #[test]
    fn discovery_falls_back_to_working_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("root.csv"), "x\n").unwrap();
        fs::write(dir.path().join("generated_root.csv"), "x\n").unwrap();

        let files =
            discover_input_files(None, &dir.path().join("import"), dir.path(), "translated_")
                .unwrap();
        assert_eq!(files, vec![dir.path().join("root.csv")]);
    }

    #[test]
    fn discovery_errors_when_nothing_found() {
        let dir = TempDir::new().unwrap();
        let err = discover_input_files(None, &dir.path().join("import"), dir.path(), "translated_")
            .unwrap_err();
        assert!(matches!(err, TranslatorError::NoInputFiles { .. }));
    }

    #[test]
    fn explicit_argument_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.csv");
        let err = discover_input_files(Some(&missing), dir.path(), dir.path(), "translated_")
            .unwrap_err();
        assert!(matches!(err, TranslatorError::FileNotFound(_)));
    }
}
