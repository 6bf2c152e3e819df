use crate::automation::UiSession;
use crate::sheet_processor::{
    load_workbook, select_rows, select_translation_sheet, CellValue, ColumnRoles, SheetFormat,
    Workbook,
};
use crate::state::{CheckpointWriter, FileReport, FileStatus, RunReport, RunState};
use crate::translation::invoker::{TranslationInvoker, TranslationOutcome};
use crate::utils::config::BrowserConfig;
use crate::utils::{file_safe_code, short_lang_code, Result, RunOptions, TranslatorError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Page URL for a detected language code.
pub fn language_url(config: &BrowserConfig, language: &str) -> String {
    config
        .url_template
        .replace("{sl}", &config.source_lang)
        .replace("{tl}", short_lang_code(language))
}

/// Drives every input file through detection, selection, translation and
/// checkpointing with a single browser session.
pub struct RunController<S: UiSession> {
    options: RunOptions,
    session: S,
    invoker: TranslationInvoker,
    state: RunState,
    current_url: Option<String>,
    /// Output paths already assigned to an input during this run.
    claimed_outputs: HashSet<PathBuf>,
    report: RunReport,
}

impl<S: UiSession> RunController<S> {
    pub fn new(options: RunOptions, session: S) -> Self {
        let invoker = TranslationInvoker::new(&options.config);
        Self {
            options,
            session,
            invoker,
            state: RunState::Initializing,
            current_url: None,
            claimed_outputs: HashSet::new(),
            report: RunReport::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Report of the latest run, including a run that was aborted.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Processes `inputs` in order. Returns `Err` only for a session-fatal
    /// error, after the affected file has been checkpointed.
    pub async fn run(&mut self, inputs: &[PathBuf]) -> Result<RunReport> {
        self.report = RunReport::default();
        self.claimed_outputs.clear();
        self.transition(RunState::Initializing);
        info!(mode = %self.options.mode, files = inputs.len(), "Starting run");

        for input in inputs {
            let mut report = FileReport::new(input.clone());
            let span = info_span!("file", file = %input.display());
            let result = self.process_file(input, &mut report).instrument(span).await;
            self.report.files.push(report);

            if let Err(e) = result {
                self.transition(RunState::Aborted);
                error!(file = %input.display(), error = %e, "Aborting run");
                return Err(e);
            }
        }

        self.transition(RunState::Done);
        Ok(self.report.clone())
    }

    async fn process_file(&mut self, input: &Path, report: &mut FileReport) -> Result<()> {
        self.transition(RunState::LoadingFile);
        info!("Processing file");

        let mut workbook = match load_workbook(input) {
            Ok(workbook) => workbook,
            Err(e) => {
                error!(error = %e, "Failed to load file, skipping");
                report.status = FileStatus::Skipped(e.to_string());
                return Ok(());
            }
        };

        let roles = match select_translation_sheet(&mut workbook) {
            Ok(roles) => roles,
            Err(e) => {
                warn!(error = %e, "Column detection failed, skipping");
                report.status = FileStatus::Skipped(e.to_string());
                return Ok(());
            }
        };
        info!(
            source = %roles.source,
            target = %roles.target,
            language = %roles.language,
            sheet = %workbook.active_sheet().name,
            "Detected columns"
        );

        let output = self.claim_output(input, &roles.language, workbook.format);
        report.language = Some(roles.language.clone());
        report.output = Some(output.clone());

        if self.options.mode.loads_prior_output() {
            workbook = merge_prior_output(workbook, &output, &roles);
        }

        self.transition(RunState::Selecting);
        let sheet = workbook.active_sheet();
        let (Some(source_col), Some(target_col)) = (
            sheet.column_index(&roles.source),
            sheet.column_index(&roles.target),
        ) else {
            report.status = FileStatus::Skipped("detected columns missing from sheet".to_string());
            return Ok(());
        };
        let work = select_rows(sheet, source_col, target_col, self.options.mode);
        report.rows_selected = work.len();

        if work.is_empty() {
            info!("No rows need translation, skipping");
            report.status = FileStatus::Skipped("no rows need translation".to_string());
            return Ok(());
        }
        info!(rows = work.len(), total = sheet.row_count(), "Selected rows");

        if let Err(e) = self.ensure_page(&roles.language).await {
            if e.is_session_fatal() {
                report.status = FileStatus::Aborted;
                return Err(e);
            }
            error!(error = %e, "Could not open translation page, skipping");
            report.status = FileStatus::Failed(e.to_string());
            return Ok(());
        }

        let config = &self.options.config;
        let mut writer = CheckpointWriter::new(output, config.checkpoint.save_interval, &roles.target)
            .with_marker_column(&config.output.marker_column);

        self.transition(RunState::Translating);
        let total = work.len();
        for (done, &row) in work.iter().enumerate() {
            let source = workbook
                .active_sheet()
                .cell(row, source_col)
                .as_text()
                .map(|s| s.into_owned())
                .unwrap_or_default();

            let outcome = match self.invoker.translate(&mut self.session, &source).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.transition(RunState::Checkpointing);
                    if let Err(save_err) = writer.save(&mut workbook) {
                        error!(error = %save_err, "Emergency checkpoint failed");
                    } else {
                        warn!(path = %writer.path().display(), "Progress saved before abort");
                    }
                    report.checkpoints = writer.saves();
                    report.status = FileStatus::Aborted;
                    return Err(e);
                }
            };

            workbook
                .active_sheet_mut()
                .set_cell(row, target_col, CellValue::text(outcome.text()));

            match &outcome {
                TranslationOutcome::Translated(_) => {
                    report.rows_translated += 1;
                    info!(row = row + 1, done = done + 1, total, "Translated row");

                    if writer.record_success(row) {
                        self.transition(RunState::Checkpointing);
                        if let Err(e) = writer.save(&mut workbook) {
                            warn!(error = %e, "Interval checkpoint failed, continuing");
                        }
                        self.transition(RunState::Translating);
                    }
                }
                TranslationOutcome::Fallback { reason, .. } => {
                    writer.record_fallback(row);
                    report.rows_fallback += 1;
                    error!(row = row + 1, reason = %reason, "Kept source text for row");
                }
            }
        }

        self.transition(RunState::Finalizing);
        report.status = match writer.finish(&mut workbook) {
            Ok(()) => FileStatus::Completed,
            Err(e) => {
                error!(error = %e, "Final save failed");
                FileStatus::Failed(e.to_string())
            }
        };
        report.checkpoints = writer.saves();
        info!(
            translated = report.rows_translated,
            fallback = report.rows_fallback,
            "File finished"
        );
        Ok(())
    }

    /// Gives each input its own output. A later input with an already used
    /// language gets the input's file stem appended to the name.
    fn claim_output(&mut self, input: &Path, language: &str, format: SheetFormat) -> PathBuf {
        let paths = &self.options.config.paths;
        let base = CheckpointWriter::output_path(
            &paths.output_dir,
            &paths.output_prefix,
            language,
            format,
        );

        let mut output = base.clone();
        if self.claimed_outputs.contains(&output) {
            let stem = input
                .file_stem()
                .map(|s| file_safe_code(&s.to_string_lossy()))
                .unwrap_or_else(|| "input".to_string());
            output = CheckpointWriter::tagged_path(&base, &stem);
            let mut n = 2;
            while self.claimed_outputs.contains(&output) {
                output = CheckpointWriter::tagged_path(&base, &format!("{}_{}", stem, n));
                n += 1;
            }
            warn!(
                shared = %base.display(),
                output = %output.display(),
                "Output already used by an earlier file in this run"
            );
        }

        self.claimed_outputs.insert(output.clone());
        output
    }

    async fn ensure_page(&mut self, language: &str) -> Result<()> {
        let browser = &self.options.config.browser;
        let url = language_url(browser, language);
        if self.current_url.as_deref() == Some(url.as_str()) {
            return Ok(());
        }

        let delay = Duration::from_millis(browser.page_load_delay_ms);
        info!(url = %url, "Opening translation page");
        self.current_url = None;
        self.session.navigate(&url).await?;
        self.current_url = Some(url);
        tokio::time::sleep(delay).await;
        Ok(())
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "State change");
            self.state = next;
        }
    }
}

/// Starts from the previous output when it lines up with the fresh input;
/// otherwise keeps the fresh input.
fn merge_prior_output(fresh: Workbook, output: &Path, roles: &ColumnRoles) -> Workbook {
    if !output.is_file() {
        info!(path = %output.display(), "No previous output, starting from input");
        return fresh;
    }

    let mut prior = match load_workbook(output) {
        Ok(prior) => prior,
        Err(e) => {
            warn!(path = %output.display(), error = %e, "Previous output unreadable, starting from input");
            return fresh;
        }
    };

    let index = if prior.sheets.len() == 1 {
        Some(0)
    } else {
        prior.sheet_named(&fresh.active_sheet().name)
    };
    let Some(index) = index else {
        warn!(sheet = %fresh.active_sheet().name, "Previous output lacks the translation sheet");
        return fresh;
    };
    prior.active = index;

    let sheet = prior.active_sheet();
    let (Some(prior_source), Some(_)) = (
        sheet.column_index(&roles.source),
        sheet.column_index(&roles.target),
    ) else {
        warn!(path = %output.display(), "Previous output lacks the detected columns, starting from input");
        return fresh;
    };

    let expected = fresh.active_sheet().row_count();
    let got = sheet.row_count();
    if expected != got {
        let mismatch = TranslatorError::ShapeMismatch { expected, got };
        warn!(path = %output.display(), error = %mismatch, "Discarding previous output");
        return fresh;
    }

    let fresh_sheet = fresh.active_sheet();
    if let Some(fresh_source) = fresh_sheet.column_index(&roles.source) {
        let differs = (0..expected).find(|&row| {
            fresh_sheet.cell(row, fresh_source).as_text() != sheet.cell(row, prior_source).as_text()
        });
        if let Some(row) = differs {
            warn!(
                path = %output.display(),
                row = row + 1,
                "Previous output has different source text, starting from input"
            );
            return fresh;
        }
    }

    info!(path = %output.display(), rows = got, "Resuming from previous output");
    prior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet_processor::{write_workbook, Sheet};
    use tempfile::TempDir;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            source: "src (en-en)".to_string(),
            target: "dst (de-de)".to_string(),
            language: "de-de".to_string(),
        }
    }

    fn book(rows: &[(&str, &str)]) -> Workbook {
        let mut sheet = Sheet::new("export", vec!["src (en-en)".into(), "dst (de-de)".into()]);
        for (s, d) in rows {
            sheet.rows.push(vec![CellValue::text(*s), CellValue::text(*d)]);
        }
        Workbook::single(sheet, SheetFormat::Csv)
    }

    #[test]
    fn url_uses_short_language_code() {
        let config = BrowserConfig::default();
        assert_eq!(
            language_url(&config, "de-de"),
            "https://translate.google.com/?sl=auto&tl=de&op=translate"
        );
    }

    #[test]
    fn resume_uses_matching_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("translated_de-de.csv");
        write_workbook(&book(&[("Hello", "Hallo"), ("Bye", "")]), &output).unwrap();

        let merged = merge_prior_output(book(&[("Hello", ""), ("Bye", "")]), &output, &roles());
        assert_eq!(merged.active_sheet().cell(0, 1), &CellValue::text("Hallo"));
    }

    #[test]
    fn resume_discards_mismatched_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("translated_de-de.csv");
        write_workbook(&book(&[("Hello", "Hallo")]), &output).unwrap();

        let fresh = book(&[("Hello", ""), ("Bye", "")]);
        let merged = merge_prior_output(fresh.clone(), &output, &roles());
        assert_eq!(merged, fresh);
    }

    #[test]
    fn resume_discards_output_of_other_input() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("translated_de-de.csv");
        write_workbook(&book(&[("Apple", "DE:Apple")]), &output).unwrap();

        let fresh = book(&[("Banana", "")]);
        let merged = merge_prior_output(fresh.clone(), &output, &roles());
        assert_eq!(merged, fresh);
    }

    #[test]
    fn resume_without_output_keeps_input() {
        let dir = TempDir::new().unwrap();
        let fresh = book(&[("Hello", "")]);
        let merged = merge_prior_output(fresh.clone(), &dir.path().join("missing.csv"), &roles());
        assert_eq!(merged, fresh);
    }
}
