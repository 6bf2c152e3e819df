use anyhow::Context;
use clap::Parser;
use sheet_translator::cli::{prompt_mode, Args};
use sheet_translator::sheet_processor::discover_input_files;
use sheet_translator::{AppConfig, RunController, RunMode, RunOptions, UiSession, WebDriverSession};
use std::io::IsTerminal;
use std::time::Instant;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("sheet_translator={}", config.logging.level))
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let start = Instant::now();
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(Some(&args.config));
    args.apply_overrides(&mut config);
    init_tracing(&config)?;

    let mode = match args.mode {
        Some(mode) => RunMode::from(mode),
        None if std::io::stdin().is_terminal() => {
            prompt_mode(std::io::stdin().lock(), std::io::stdout())?
        }
        None => RunMode::FillMissing,
    };

    let cwd = std::env::current_dir()?;
    let inputs = discover_input_files(
        args.input.as_deref(),
        &config.paths.import_dir,
        &cwd,
        &config.paths.output_prefix,
    )?;
    tracing::info!(files = inputs.len(), mode = %mode, "Input files found");

    let session = WebDriverSession::connect(&config.browser)
        .await
        .with_context(|| format!("starting browser via {}", config.browser.webdriver_url))?;

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", run_id = %run_id);

    let mut controller = RunController::new(RunOptions::new(mode, config), session);
    let result = controller.run(&inputs).instrument(span).await;

    if let Err(e) = controller.session_mut().close().await {
        tracing::warn!(error = %e, "Browser session did not close cleanly");
    }

    let report = controller.report();
    for file in &report.files {
        tracing::info!(
            file = %file.input.display(),
            status = ?file.status,
            translated = file.rows_translated,
            fallback = file.rows_fallback,
            checkpoints = file.checkpoints,
            output = ?file.output,
            "File summary"
        );
    }
    tracing::info!(
        completed = report.completed(),
        translated = report.rows_translated(),
        fallback = report.rows_fallback(),
        minutes = %format!("{:.2}", start.elapsed().as_secs_f64() / 60.0),
        "Run finished"
    );

    result?;
    Ok(())
}
