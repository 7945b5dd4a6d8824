mod logic; // Folder driven batch: relocation, trace logs, notifications

pub use logic::BatchSettings;

use anyhow::Result;

use crate::archive::ArchiveClient;
use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::restore::BatchReport;
use crate::utils::WorkDirs;

/// Public entry point for the folder driven batch run.
///
/// Every ALE, AAF and EDL file in `restore/` below `dirs` is restored in turn;
/// finished files move to `finished/`, unparsable ones to `failed/`.
pub fn run_batch_flow<C, N>(
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
    logic::perform_batch(app_config, dirs, client, notifier, settings)
}
