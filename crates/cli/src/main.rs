mod app;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{self, IsTerminal},
    sync::Mutex,
};

use perfil_core::{
    config::{self, AppConfig},
    Workspace,
};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::app::{Console, PerfilApp};

fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!("data directory: {}", config.data_dir.display());

    let (workspace, notices) =
        Workspace::open(config).context("failed to open the item store")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    let console = Console::new(stdin.lock(), stdout.lock(), styled);
    let mut app = PerfilApp::new(workspace, console);
    app.run(&notices)
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("perfil.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::from_default_env();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
