use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chatline::app::ChatWidget;
use chatline::infra::config::WidgetConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Terminal chat client with slash commands and `@` context pills.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON widget configuration. Defaults to `<config dir>/chatline/config.json`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// File receiving `RUST_LOG`-filtered logs. Logging is off without it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    if let Some(log_file) = &args.log_file {
        init_logging(log_file)?;
    }

    let config = WidgetConfig::load_or_default(args.config.as_deref())
        .map_err(|error| io::Error::other(format!("Error: {error}")))?;
    tracing::debug!(max_tabs = config.max_tabs, "config loaded");
    let mut widget = ChatWidget::new(config);

    chatline::runtime::run(&mut widget).await
}

fn init_logging(log_file: &Path) -> io::Result<()> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)
}
