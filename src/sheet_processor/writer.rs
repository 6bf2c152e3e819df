use crate::sheet_processor::dataset::{CellValue, Sheet, SheetFormat, Workbook};
use crate::utils::{Result, TranslatorError};
use csv::Writer;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes every sheet of `workbook` to `path`, replacing it atomically.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let bytes = match workbook.format {
        SheetFormat::Csv => csv_bytes(workbook.active_sheet())?,
        SheetFormat::Xlsx => xlsx_bytes(workbook)?,
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| TranslatorError::IoError(e.error))?;
    Ok(())
}

fn csv_bytes(sheet: &Sheet) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = Writer::from_writer(&mut buffer);
        writer.write_record(&sheet.headers)?;

        let width = sheet.headers.len();
        for row in &sheet.rows {
            let mut record: Vec<String> = row
                .iter()
                .map(|cell| cell.as_text().map(|s| s.into_owned()).unwrap_or_default())
                .collect();
            if record.len() < width {
                record.resize(width, String::new());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

fn xlsx_bytes(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut book = XlsxWorkbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for sheet in &workbook.sheets {
        let worksheet = book.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let (first_row, first_col) = sheet.origin;
        let first_col = first_col as u16;

        for (col, header) in sheet.headers.iter().enumerate() {
            if !header.is_empty() {
                worksheet.write_string(first_row, first_col + col as u16, header)?;
            }
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            let row_num = first_row + 1 + r as u32;
            for (c, cell) in row.iter().enumerate() {
                let col = first_col + c as u16;
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(s) => {
                        worksheet.write_string(row_num, col, s)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b)?;
                    }
                    CellValue::DateTime(serial) => {
                        let format = if serial.fract() == 0.0 {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        worksheet.write_number_with_format(row_num, col, *serial, format)?;
                    }
                }
            }
        }
    }

    Ok(book.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet_processor::reader::load_workbook;
    use tempfile::TempDir;

    fn sample_sheet(name: &str) -> Sheet {
        let mut sheet = Sheet::new(name, vec!["ID".into(), "Text".into(), "Flag".into()]);
        sheet.rows.push(vec![
            CellValue::Number(1.0),
            CellValue::text("Hallo, Welt"),
            CellValue::Bool(true),
        ]);
        sheet.rows.push(vec![CellValue::Number(2.0)]);
        sheet
    }

    #[test]
    fn csv_output_has_bom_and_pads_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("translated_de-de.csv");
        let workbook = Workbook::single(sample_sheet("export"), SheetFormat::Csv);

        write_workbook(&workbook, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "ID,Text,Flag\n1,\"Hallo, Welt\",TRUE\n2,,\n");
    }

    #[test]
    fn xlsx_output_keeps_every_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("translated_fr.xlsx");
        let workbook = Workbook {
            sheets: vec![sample_sheet("Strings"), sample_sheet("Notes")],
            active: 0,
            format: SheetFormat::Xlsx,
        };

        write_workbook(&workbook, &path).unwrap();
        let reloaded = load_workbook(&path).unwrap();

        assert_eq!(reloaded.sheets.len(), 2);
        assert_eq!(reloaded.sheets[1].name, "Notes");
        assert_eq!(reloaded.sheets[0].cell(0, 1), &CellValue::text("Hallo, Welt"));
        assert_eq!(reloaded.sheets[0].cell(0, 0), &CellValue::Number(1.0));
        assert_eq!(reloaded.sheets[0].cell(0, 2), &CellValue::Bool(true));
    }

    #[test]
    fn xlsx_output_keeps_sheet_position_and_dates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("translated_fr.xlsx");
        let mut notes = Sheet::new("Notes", vec!["Title".into(), "Due".into()]);
        notes.origin = (2, 1);
        notes.rows.push(vec![CellValue::text("Launch"), CellValue::DateTime(45306.0)]);
        let workbook = Workbook {
            sheets: vec![sample_sheet("Strings"), notes.clone()],
            active: 0,
            format: SheetFormat::Xlsx,
        };

        write_workbook(&workbook, &path).unwrap();
        let reloaded = load_workbook(&path).unwrap();

        assert_eq!(reloaded.sheets[1], notes);
        assert_eq!(reloaded.sheets[1].cell(0, 1).as_text().unwrap(), "2024-01-15");

        // a second pass writes the same layout again
        let again = dir.path().join("again.xlsx");
        write_workbook(&reloaded, &again).unwrap();
        assert_eq!(load_workbook(&again).unwrap().sheets[1], notes);
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("translated_de.csv");
        let mut workbook = Workbook::single(sample_sheet("export"), SheetFormat::Csv);

        write_workbook(&workbook, &path).unwrap();
        workbook.active_sheet_mut().rows.truncate(1);
        write_workbook(&workbook, &path).unwrap();

        let reloaded = load_workbook(&path).unwrap();
        assert_eq!(reloaded.active_sheet().row_count(), 1);
    }
}
