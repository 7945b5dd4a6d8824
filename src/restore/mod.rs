pub(crate) mod events; // Progress events for presentation layers
pub(crate) mod logic; // Restore protocol state machine
pub(crate) mod outcome; // Per-file results, classification and trace

pub use events::RestoreEvent;
pub use logic::{RestoreOptions, RestoreOrchestrator};
pub use outcome::{BatchOutcome, BatchReport, Relocation};

use std::path::PathBuf;

use crate::archive::ArchiveClient;
use crate::parsers::RestoreItem;

/// Public entry point for a batch restore: every file gets its own restore
/// selection, processed one after another. `finished` sees each outcome as soon
/// as its file is done, before the next file starts.
pub fn run_restore_flow<C: ArchiveClient + ?Sized>(
    client: &C,
    options: &RestoreOptions,
    files: &[PathBuf],
    finished: impl FnMut(&BatchOutcome),
) -> BatchReport {
    tracing::info!(
        "Restoring from {} file(s), archive {}{}",
        files.len(),
        options.archive_id,
        if options.dry_run { " (dry run)" } else { "" }
    );
    RestoreOrchestrator::new(client, options).run_batch(files, finished)
}

/// Narrows a parsed item list to the names an operator picked, keeping file
/// order. Picked names the file does not contain are returned separately.
pub fn pick_items(
    items: &[RestoreItem],
    picked: &[String],
) -> (Vec<RestoreItem>, Vec<String>) {
    let kept = items
        .iter()
        .filter(|item| picked.contains(item))
        .cloned()
        .collect();
    let unknown = picked
        .iter()
        .filter(|name| !items.contains(name))
        .cloned()
        .collect();
    (kept, unknown)
}
