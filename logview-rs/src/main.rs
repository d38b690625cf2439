use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use logview::app::{App, AppError};
use logview::cli::{Cli, ConfigFile};
use logview::config::{FileConfig, ViewConfig};
use logview::ingest::{self, LineParser};
use logview::terminal::Terminal;
use logview::{LogView, VelocityHistogram};

const LOG_ENV: &str = "LOGVIEW_LOG";
const INPUT_QUEUE: usize = 4096;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logview: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    // ── Settings: viewer defaults, then the file, then flags ─────────────────
    let mut config = ViewConfig {
        level_highlighting: true,
        highlight_current: true,
        ..ViewConfig::default()
    };
    let file = match cli.config_file() {
        ConfigFile::Skip => FileConfig::default(),
        ConfigFile::Explicit(path) => FileConfig::discover(Some(path.as_path()))?,
        ConfigFile::Search => FileConfig::discover(None)?,
    };
    file.apply_to(&mut config)?;
    cli.apply_to(&mut config)?;

    let view = Arc::new(LogView::new(config));
    let velocity = Arc::new(VelocityHistogram::new(Duration::from_secs(1)));

    // ── Input ────────────────────────────────────────────────────────────────
    let (tx, rx) = mpsc::channel(INPUT_QUEUE);
    let parser = LineParser::new(cli.source_name());
    tokio::spawn(ingest::run_reader(cli.file.clone(), cli.follow, parser, tx));

    info!(target: "logview.app", source = %cli.source_name(), follow = cli.follow, "starting");
    let mut app = App::new(view, velocity, Terminal::new(std::io::stdout()));
    app.run(rx).await
}

/// Send diagnostics to a file; the terminal belongs to the UI.  The guard
/// must live until exit so buffered lines are flushed.
fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (dir, name) = match log_file {
        Some(path) => (
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
            path.file_name()?.to_owned(),
        ),
        None => (
            dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("logview"),
            "logview.log".into(),
        ),
    };
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .ok()?;
    Some(guard)
}
