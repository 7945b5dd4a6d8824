use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure to turn a metadata file into a list of restore items.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid media container: {0}")]
    Container(String),

    #[error("No \"Source File\" column found in column header")]
    MissingSourceColumn,

    #[error("No search items found: data section marker missing")]
    MissingDataSection,

    #[error("No search items found: data section is empty")]
    EmptyDataSection,

    #[error("No search items found")]
    NoItems,

    #[error("Unsupported metadata file: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Failure of a single round trip to the archive service.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Command `{command}` returned non UTF-8 output")]
    NotUtf8 { command: String },

    #[error("Command `{command}` returned no result")]
    EmptyResponse { command: String },

    #[error("Cannot search for {item:?}: quotes are not allowed in a search term")]
    UnsupportedItem { item: String },
}

/// Classified failure of one input file (or, for `Connection`, of the whole batch).
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Archive service unreachable: {0}")]
    Connection(#[source] ArchiveError),

    #[error("Could not create restore selection: {0}")]
    Selection(#[source] ArchiveError),

    #[error("No entries in restore selection {selection}")]
    EmptySelection { selection: String },

    #[error("No volumes found for restore selection {selection}")]
    Volume { selection: String },

    #[error("Could not submit restore selection {selection}: {source}")]
    Submit {
        selection: String,
        #[source]
        source: ArchiveError,
    },
}

impl RestoreError {
    /// Only an unreachable archive service stops the remaining files.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, RestoreError::Connection(_))
    }
}
