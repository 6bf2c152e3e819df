use crate::sheet_processor::{write_workbook, CellValue, SheetFormat, Workbook};
use crate::utils::{file_safe_code, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MARKER_YES: &str = "Yes";
pub const MARKER_NO: &str = "No";

/// Persists a file's workbook to its per-language output path.
pub struct CheckpointWriter {
    path: PathBuf,
    save_interval: usize,
    target_column: String,
    marker_column: Option<String>,
    since_last_save: usize,
    saves: usize,
    /// Rows handled in this run: `true` translated, `false` kept source text.
    outcomes: HashMap<usize, bool>,
}

impl CheckpointWriter {
    pub fn new(path: PathBuf, save_interval: usize, target_column: impl Into<String>) -> Self {
        Self {
            path,
            save_interval: save_interval.max(1),
            target_column: target_column.into(),
            marker_column: None,
            since_last_save: 0,
            saves: 0,
            outcomes: HashMap::new(),
        }
    }

    pub fn with_marker_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.marker_column = if column.trim().is_empty() {
            None
        } else {
            Some(column)
        };
        self
    }

    /// `{output_dir}/{prefix}{language}.{ext}`
    pub fn output_path(
        output_dir: &Path,
        prefix: &str,
        language: &str,
        format: SheetFormat,
    ) -> PathBuf {
        output_dir.join(format!(
            "{}{}.{}",
            prefix,
            file_safe_code(language),
            format.extension()
        ))
    }

    /// `translated_de-de.csv` + `b` -> `translated_de-de_b.csv`
    pub fn tagged_path(path: &Path, tag: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, tag, ext.to_string_lossy()),
            None => format!("{}_{}", stem, tag),
        };
        path.with_file_name(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Counts one successful translation of `row`; true when an interval
    /// checkpoint is due.
    pub fn record_success(&mut self, row: usize) -> bool {
        self.outcomes.insert(row, true);
        self.since_last_save += 1;
        self.since_last_save >= self.save_interval
    }

    /// `row` kept its source text. Does not advance the interval.
    pub fn record_fallback(&mut self, row: usize) {
        self.outcomes.insert(row, false);
    }

    /// The interval restarts even when the write fails, so a broken output
    /// path is retried once per interval rather than after every row.
    pub fn save(&mut self, workbook: &mut Workbook) -> Result<()> {
        self.since_last_save = 0;
        self.refresh_marker(workbook);
        write_workbook(workbook, &self.path)?;

        self.saves += 1;
        debug!(path = %self.path.display(), saves = self.saves, "Checkpoint written");
        Ok(())
    }

    pub fn finish(&mut self, workbook: &mut Workbook) -> Result<()> {
        self.save(workbook)?;
        info!(path = %self.path.display(), "Output written");
        Ok(())
    }

    fn refresh_marker(&self, workbook: &mut Workbook) {
        let Some(marker) = &self.marker_column else {
            return;
        };
        let sheet = workbook.active_sheet_mut();
        let Some(target) = sheet.column_index(&self.target_column) else {
            return;
        };
        let marker_index = sheet.ensure_column(marker);

        for row in 0..sheet.row_count() {
            let translated = match self.outcomes.get(&row) {
                Some(&translated) => translated,
                // rows from earlier runs keep an existing marker
                None if !sheet.cell(row, marker_index).is_blank() => continue,
                None => !sheet.cell(row, target).is_blank(),
            };
            let value = if translated { MARKER_YES } else { MARKER_NO };
            sheet.set_cell(row, marker_index, CellValue::text(value));
        }
    }
}
