//! Operator CLI over the file registry.
//!
//! # Responsibility
//! - Open the registry once at startup from config, env and flags.
//! - Run a single registry operation and print the result as JSON.
//! - Close the shared connection on every exit path.

use anyhow::{Context, Result};
use budgetsync_core::{
    default_log_level, init_logging, open_registry, FileService, RegistryConfig,
    SharedConnection, SqliteFileRepository,
};
use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "budgetsync", version, about = "Inspect and maintain the budget file registry")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database path; overrides config and environment.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Number of records, tombstones included.
    Count,
    /// List records.
    List {
        /// Hide tombstoned records.
        #[arg(long)]
        live: bool,
    },
    /// Show one record.
    Show { id: String },
    Rename { id: String, name: String },
    /// Unbind a file from its sync group.
    ResetGroup { id: String },
    /// Tombstone a file.
    Delete { id: String },
    /// Permanently remove a file record.
    Purge { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    if let Some(log_dir) = config.log_dir.as_deref() {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let conn = open_registry(&config).with_context(|| {
        format!(
            "failed to open registry at `{}`",
            config.database_path.display()
        )
    })?;

    let outcome = execute(&conn, &config, cli.command);
    let closed = conn.close().context("failed to close registry");
    outcome.and(closed)
}

fn resolve_config(cli: &Cli) -> Result<RegistryConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(db) = cli.db.clone() {
        config.database_path = db;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = Some(level);
    }
    Ok(config)
}

fn execute(conn: &SharedConnection, config: &RegistryConfig, command: Command) -> Result<()> {
    let repo = SqliteFileRepository::try_new(conn.clone())?;
    let service = FileService::with_retry(repo, config.retry_policy());

    match command {
        Command::Count => println!("{}", service.count()?),
        Command::List { live } => {
            let files = if live {
                service.list_live_files()?
            } else {
                service.list_files()?
            };
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Command::Show { id } => {
            let file = service.file_info(&id)?;
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
        Command::Rename { id, name } => service.rename(&id, &name)?,
        Command::ResetGroup { id } => service.reset_sync_group(&id)?,
        Command::Delete { id } => service.delete_file(&id)?,
        Command::Purge { id } => {
            let file = service.purge_file(&id)?;
            println!("{}", serde_json::to_string_pretty(&file)?);
        }
    }

    Ok(())
}
