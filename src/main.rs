mod api;
mod cli;
mod config;
mod db;
mod export;
mod lock;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use crate::export::ExportOutcome;
use crate::lock::{InstanceLock, LockError};
use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use std::process::{Command, ExitCode, Stdio};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => {
            let config = Config::load_or_default()?;
            let open_browser = config.open_browser;
            run_app(config, open_browser).await
        }
        Commands::Serve => run_app(Config::load_or_default()?, false).await,
        Commands::Export { output } => handle_export(output),
        Commands::Status => handle_status().map(|_| ExitCode::SUCCESS),
        Commands::Config { command } => handle_config_command(command).map(|_| ExitCode::SUCCESS),
    }
}

/// Takes the instance lock before anything touches the database.
/// Returns `None` when another instance is already running.
fn bootstrap(config: &Config) -> Result<Option<InstanceLock>> {
    config.ensure_data_dirs()?;

    let lock = match InstanceLock::acquire(&config.lock_path) {
        Ok(lock) => lock,
        Err(LockError::AlreadyRunning(_)) => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    Database::open(&config.db_path)?;
    info!(path = %config.db_path.display(), "database initialized");

    Ok(Some(lock))
}

async fn run_app(config: Config, open_browser: bool) -> Result<ExitCode> {
    let Some(lock) = bootstrap(&config)? else {
        eprintln!("Activity Tracker is already running.");
        return Ok(ExitCode::FAILURE);
    };

    let listener = match api::bind(&config).await {
        Ok(listener) => listener,
        Err(error) => {
            lock.release();
            return Err(error);
        }
    };

    let ui_url = ui_url(&config)?;
    if open_browser {
        open_in_browser(&ui_url);
    }
    println!("Activity Tracker: {ui_url}");

    let result = tokio::select! {
        server_result = api::run_server(listener, Arc::new(config)) => server_result,
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    lock.release();
    result.map(|_| ExitCode::SUCCESS)
}

fn handle_export(output: Option<std::path::PathBuf>) -> Result<ExitCode> {
    let config = Config::load_or_default()?;

    let target = match output {
        Some(path) => Some(path),
        None => prompt_export_path(&config)?,
    };

    let outcome = export::write_export(&config.db_path, target.as_deref());
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(match outcome {
        ExportOutcome::Error { .. } => ExitCode::FAILURE,
        ExportOutcome::Success { .. } | ExportOutcome::Cancelled => ExitCode::SUCCESS,
    })
}

fn prompt_export_path(config: &Config) -> Result<Option<std::path::PathBuf>> {
    let default_path = config.default_export_path().display().to_string();
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Save export to (leave empty to cancel)")
        .default(default_path)
        .allow_empty(true)
        .interact_text()
        .context("Failed to read export path")?;

    Ok(export::resolve_output(&answer))
}

fn handle_status() -> Result<()> {
    let config = Config::load_or_default()?;
    let database = Database::open(&config.db_path)?;

    println!("Activity Tracker status");
    println!("- data_dir: {}", Config::root_dir().display());
    println!("- db_path: {}", config.db_path.display());
    println!(
        "- running: {}",
        InstanceLock::is_held(&config.lock_path)
    );
    println!("- ui_url: {}", ui_url(&config)?);
    println!("- activities: {}", database.count_activities()?);
    println!("- log_entries: {}", database.count_log_entries()?);

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_or_default()?;
            config.set_value(&key, &value)?;
            config.save()?;
            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_or_default()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;
            println!("{value}");
            Ok(())
        }
    }
}

fn ui_url(config: &Config) -> Result<Url> {
    let addr = api::server_address(config.api_port);
    Url::parse(&format!("http://{addr}/")).with_context(|| format!("Invalid UI address: {addr}"))
}

fn open_in_browser(url: &Url) {
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = Command::new("xdg-open");

    let spawned = command
        .arg(url.as_str())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(error) = spawned {
        warn!(error = %error, url = %url, "failed to open browser");
    }
}
