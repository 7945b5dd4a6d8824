//! P5 Restore Tool
//!
//! Provides CLI interface for restoring the media referenced by editorial
//! metadata files (ALE, AAF, EDL) from a P5 archive

// p5restore/src/main.rs
mod archive;
mod batch;
mod cli;
mod config;
mod errors;
mod notify;
mod parsers;
mod restore;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use archive::ArchiveClient;
use archive::nsdchat::NsdchatClient;
use batch::BatchSettings;
use cli::{Cli, Commands};
use config::AppConfig;
use notify::mail::MailCommandNotifier;
use notify::{Notification, Notifier};
use restore::{RestoreEvent, RestoreOrchestrator};
use utils::WorkDirs;

const BATCH_LOG_FILE: &str = "p5restore.log";

/// Main entry point for the restore tool
fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run_app(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_app(cli: Cli) -> Result<ExitCode> {
    let config_path = config::resolve_config_path(cli.config.as_deref());
    match cli.command {
        Commands::Run { dry, send_log, dir } => {
            let app_config = load_config(&config_path)?;
            let base = dir.unwrap_or_else(|| app_config.base_dir.clone());
            let dirs = WorkDirs::new(&base);
            dirs.ensure()?;
            init_logging(cli.verbose, Some(open_batch_log(&dirs.logs)?));
            tracing::info!("Using config: {}", config_path.display());

            println!("🚀 Starting batch restore in {}...", base.display());
            let client = nsdchat_client(&app_config)?;
            let notifier = MailCommandNotifier::from_config(&app_config.notification);
            let report = batch::run_batch_flow(
                &app_config,
                &dirs,
                &client,
                &notifier,
                BatchSettings {
                    dry_run: dry,
                    send_log,
                },
            )?;

            for outcome in &report.outcomes {
                let mark = if outcome.is_success() { "✅" } else { "⚠️" };
                println!("{} {}: {:?}", mark, outcome.title, outcome.state);
            }
            println!(
                "📦 {} succeeded, {} failed.",
                report.succeeded(),
                report.failed()
            );
            if let Some(err) = &report.aborted {
                eprintln!(
                    "❌ Batch aborted: {}. {} file(s) left in {}.",
                    err,
                    report.unprocessed.len(),
                    dirs.restore.display()
                );
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Restore { file, dry, items } => {
            init_logging(cli.verbose, None);
            let app_config = load_config(&config_path)?;
            let client = nsdchat_client(&app_config)?;
            restore_single(&app_config, &client, &file, dry, &items)
        }
        Commands::Plans => {
            init_logging(cli.verbose, None);
            let app_config = load_config(&config_path)?;
            let client = nsdchat_client(&app_config)?;
            let plans = client
                .archive_plans()
                .context("Failed to list archive plans")?;
            for plan in plans {
                println!("{plan}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::TestMail => {
            init_logging(cli.verbose, None);
            let app_config = load_config(&config_path)?;
            MailCommandNotifier::from_config(&app_config.notification)
                .send(&Notification::test_mail())?;
            println!(
                "📧 Test mail sent to {}.",
                app_config.notification.recipients.join(", ")
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Parse { file, unique } => {
            init_logging(cli.verbose, None);
            print_items(&file, unique)
        }
    }
}

/// Stderr logging from `-v` (RUST_LOG overrides), plus a plain text copy in
/// `log_file` when given.
fn init_logging(verbose: u8, log_file: Option<File>) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();
}

fn open_batch_log(logs_dir: &Path) -> Result<File> {
    let path = logs_dir.join(BATCH_LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn load_config(config_path: &Path) -> Result<AppConfig> {
    AppConfig::load_from_json(config_path).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            config_path.display()
        )
    })
}

fn nsdchat_client(app_config: &AppConfig) -> Result<NsdchatClient> {
    let program = app_config.nsdchat_program()?;
    Ok(NsdchatClient::new(
        program,
        app_config.nsdchat.session_args.clone(),
    ))
}

fn print_items(file: &Path, unique: bool) -> Result<ExitCode> {
    let mut items = parsers::parse_file(file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    if unique {
        items.sort();
        items.dedup();
    }
    for item in &items {
        println!("{item}");
    }
    tracing::info!("{} item(s) in {}", items.len(), file.display());
    Ok(ExitCode::SUCCESS)
}

fn restore_single(
    app_config: &AppConfig,
    client: &NsdchatClient,
    file: &Path,
    dry_run: bool,
    picked: &[String],
) -> Result<ExitCode> {
    let mut items = parsers::parse_file(file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    if !picked.is_empty() {
        let (kept, unknown) = restore::pick_items(&items, picked);
        for name in unknown {
            println!("⚠️ {name} is not referenced by {}", file.display());
        }
        items = kept;
    }

    println!("🔄 Restoring {} item(s) from {}...", items.len(), file.display());
    let options = app_config.restore_options(dry_run);
    let mut orchestrator = RestoreOrchestrator::new(client, &options)
        .with_observer(|_: &Path, event: &RestoreEvent| println!("   {event}"));

    let outcome = match orchestrator.restore_items(file, items) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("❌ {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match &outcome.job_id {
        Some(job_id) => println!("✅ Restore job {job_id} started."),
        None if outcome.is_success() => println!("✅ Dry run finished, nothing submitted."),
        None => println!("⚠️ {}: {:?}", outcome.title, outcome.state),
    }
    Ok(ExitCode::SUCCESS)
}
