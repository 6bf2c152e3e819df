use crate::sheet_processor::dataset::Sheet;
use crate::utils::RunMode;

/// Row indices that need translation, ascending.
///
/// Rows without source text are never selected. Unless the mode retranslates
/// everything, rows whose target already has text are left alone.
pub fn select_rows(sheet: &Sheet, source_col: usize, target_col: usize, mode: RunMode) -> Vec<usize> {
    (0..sheet.row_count())
        .filter(|&row| !sheet.cell(row, source_col).is_blank())
        .filter(|&row| !mode.keeps_existing_targets() || sheet.cell(row, target_col).is_blank())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet_processor::dataset::CellValue;

    fn sheet(rows: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new("s", vec!["src".into(), "dst".into()]);
        for (src, dst) in rows {
            sheet.rows.push(vec![CellValue::text(*src), CellValue::text(*dst)]);
        }
        sheet
    }

    #[test]
    fn fill_missing_skips_translated_and_blank_rows() {
        let sheet = sheet(&[("Hello", ""), ("", ""), ("Bye", "Tschüss"), ("  ", "x"), ("Yes", " ")]);
        assert_eq!(select_rows(&sheet, 0, 1, RunMode::FillMissing), vec![0, 4]);
        assert_eq!(select_rows(&sheet, 0, 1, RunMode::ResumeFromOutput), vec![0, 4]);
    }

    #[test]
    fn retranslate_all_includes_existing_targets() {
        let sheet = sheet(&[("Hello", ""), ("", "orphan"), ("Bye", "Tschüss")]);
        assert_eq!(select_rows(&sheet, 0, 1, RunMode::RetranslateAll), vec![0, 2]);
    }

    #[test]
    fn short_rows_count_as_missing_target() {
        let mut sheet = sheet(&[]);
        sheet.rows.push(vec![CellValue::text("Only source")]);
        assert_eq!(select_rows(&sheet, 0, 1, RunMode::FillMissing), vec![0]);
    }
}
