use std::fmt;

use super::outcome::{FileState, TraceLevel, VolumeInfo};

/// Progress of the restore protocol, emitted step by step so a front end can
/// render it (and regain control) between archive calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreEvent {
    Parsed { items: usize },
    Connected { host: String },
    SelectionCreated { selection: String, archive_id: String },
    ItemFound { item: String, matches: String },
    ItemMissing { item: String },
    EntriesAdded { selection: String, entries: u64 },
    VolumeResolved(VolumeInfo),
    Described { title: String },
    DescribeFailed { reason: String },
    Submitted { job_id: String, title: String },
    DryRunFinished,
    SelectionDestroyed { selection: String },
    ServiceError { message: String },
    Failed { state: FileState, reason: String },
}

impl RestoreEvent {
    pub fn level(&self) -> TraceLevel {
        match self {
            RestoreEvent::ItemMissing { .. }
            | RestoreEvent::DescribeFailed { .. }
            | RestoreEvent::ServiceError { .. } => TraceLevel::Warning,
            RestoreEvent::Failed { .. } => TraceLevel::Error,
            _ => TraceLevel::Info,
        }
    }
}

impl fmt::Display for RestoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreEvent::Parsed { items } => write!(f, "Found {items} entries in file."),
            RestoreEvent::Connected { host } => write!(f, "Connected to archive server {host}"),
            RestoreEvent::SelectionCreated {
                selection,
                archive_id,
            } => write!(
                f,
                "Created RestoreSelection {selection}, restoring from archive id {archive_id}"
            ),
            RestoreEvent::ItemFound { item, matches } => write!(f, "{item}: {matches}"),
            RestoreEvent::ItemMissing { item } => write!(f, "{item} not found in archive."),
            RestoreEvent::EntriesAdded { selection, entries } => {
                write!(f, "Added {entries} entries to {selection}")
            }
            RestoreEvent::VolumeResolved(volume) => {
                write!(f, "{}: {}", volume.id, volume.display_name())?;
                match (&volume.label, &volume.barcode) {
                    (Some(_), Some(barcode)) => write!(f, " ({barcode})"),
                    _ => Ok(()),
                }
            }
            RestoreEvent::Described { title } => write!(f, "Job title set to \"{title}\""),
            RestoreEvent::DescribeFailed { reason } => {
                write!(f, "Could not set job title: {reason}")
            }
            RestoreEvent::Submitted { job_id, title } => {
                write!(f, "Created restore job {job_id} named \"{title}\".")
            }
            RestoreEvent::DryRunFinished => f.write_str("Dry run finished."),
            RestoreEvent::SelectionDestroyed { selection } => {
                write!(f, "Destroyed RestoreSelection {selection}")
            }
            RestoreEvent::ServiceError { message } => write!(f, "Archive server reports: {message}"),
            RestoreEvent::Failed { reason, .. } => f.write_str(reason),
        }
    }
}
