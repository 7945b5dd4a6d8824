// p5restore/src/batch/logic.rs
use anyhow::{Context, Result};

use crate::archive::ArchiveClient;
use crate::config::AppConfig;
use crate::notify::{Notification, Notifier};
use crate::restore::{self, BatchOutcome, BatchReport};
use crate::utils::{WorkDirs, collect_input_files, relocate, write_trace_log};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSettings {
    pub dry_run: bool,
    /// Mail the full trace of every file, not only job notifications.
    pub send_log: bool,
}

pub(super) fn perform_batch<C, N>(
    app_config: &AppConfig,
    dirs: &WorkDirs,
    client: &C,
    notifier: &N,
    settings: BatchSettings,
) -> Result<BatchReport>
where
    C: ArchiveClient + ?Sized,
    N: Notifier + ?Sized,
{
    dirs.ensure()?;
    let files = collect_input_files(&dirs.restore)?;
    if files.is_empty() {
        tracing::warn!("No ALE, AAF or EDL files in {}", dirs.restore.display());
        anyhow::bail!("Nothing to restore in {}", dirs.restore.display());
    }

    let options = app_config.restore_options(settings.dry_run);
    let report = restore::run_restore_flow(client, &options, &files, |outcome| {
        finalize(dirs, notifier, settings, outcome)
    });

    if let Some(err) = &report.aborted {
        tracing::error!(
            "Batch aborted: {}. Left in place: {}",
            err,
            report
                .unprocessed
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    tracing::info!(
        "Batch done: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

/// Post-processing of one finished file. Problems here are logged and never
/// affect the remaining files.
fn finalize<N: Notifier + ?Sized>(
    dirs: &WorkDirs,
    notifier: &N,
    settings: BatchSettings,
    outcome: &BatchOutcome,
) {
    if let Some(class) = outcome.classification() {
        tracing::info!("{}: {:?} ({:?})", outcome.title, class, outcome.state);
    }
    if let Err(err) = write_trace_log(&dirs.logs, outcome) {
        tracing::warn!("{:#}", err);
    }

    if let Some(dest) = dirs.destination(outcome.relocation()) {
        if let Err(err) = relocate(&outcome.source, dest) {
            tracing::warn!("{:#}", err);
        }
    }

    if let Some(notification) = Notification::for_outcome(outcome) {
        send(notifier, &notification);
    }
    if settings.send_log {
        send(notifier, &Notification::trace_log(outcome));
    }
}

fn send<N: Notifier + ?Sized>(notifier: &N, notification: &Notification) {
    if let Err(err) = notifier
        .send(notification)
        .with_context(|| format!("Failed to send \"{}\"", notification.subject))
    {
        tracing::warn!("{:#}", err);
    }
}
