use crate::utils::{AppConfig, BrowserKind, RunMode};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Translate spreadsheet rows through a translation website.
#[derive(Parser, Debug)]
#[command(name = "sheet-translator", version)]
pub struct Args {
    /// Input file (.csv/.xlsx). Defaults to the import folder, then the working directory.
    pub input: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Run mode; asked interactively when omitted on a terminal
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// WebDriver endpoint, e.g. http://localhost:9515
    #[arg(long)]
    pub webdriver_url: Option<String>,

    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    #[arg(long)]
    pub headless: bool,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub import_dir: Option<PathBuf>,

    /// Checkpoint after this many translated rows
    #[arg(long)]
    pub save_interval: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    FillMissing,
    RetranslateAll,
    Resume,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FillMissing => RunMode::FillMissing,
            ModeArg::RetranslateAll => RunMode::RetranslateAll,
            ModeArg::Resume => RunMode::ResumeFromOutput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

impl Args {
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = url.clone();
        }
        if let Some(browser) = self.browser {
            config.browser.browser = match browser {
                BrowserArg::Chrome => BrowserKind::Chrome,
                BrowserArg::Firefox => BrowserKind::Firefox,
            };
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
        if let Some(dir) = &self.import_dir {
            config.paths.import_dir = dir.clone();
        }
        if let Some(interval) = self.save_interval {
            config.checkpoint.save_interval = interval;
        }
    }
}

/// Asks for a run mode. Empty input or end of input picks fill-missing.
pub fn prompt_mode<R: BufRead, W: Write>(mut input: R, mut output: W) -> std::io::Result<RunMode> {
    loop {
        writeln!(output, "Select run mode:")?;
        writeln!(output, "  1) Fill missing translations (default)")?;
        writeln!(output, "  2) Retranslate all rows")?;
        writeln!(output, "  3) Resume from existing output")?;
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(RunMode::FillMissing);
        }
        match line.trim() {
            "" | "1" => return Ok(RunMode::FillMissing),
            "2" => return Ok(RunMode::RetranslateAll),
            "3" => return Ok(RunMode::ResumeFromOutput),
            other => writeln!(output, "Unknown choice '{}'", other)?,
        }
    }
}
