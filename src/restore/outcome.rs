use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::errors::RestoreError;
use crate::parsers::RestoreItem;

/// Position of one input file in the restore protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Init,
    Parsed,
    Connected,
    SelectionCreated,
    EntriesSearched,
    EntriesVerified,
    VolumesResolved,
    Described,
    Submitted,
    DryRunDone,
    FailedParse,
    FailedSelection,
    FailedEmpty,
    FailedVolumes,
    FailedSubmit,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        self.is_success()
            || matches!(
                self,
                FileState::FailedParse
                    | FileState::FailedSelection
                    | FileState::FailedEmpty
                    | FileState::FailedVolumes
                    | FileState::FailedSubmit
            )
    }

    pub fn is_success(self) -> bool {
        matches!(self, FileState::Submitted | FileState::DryRunDone)
    }
}

/// Coarse result category reported per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    ParseFailure,
    SelectionFailure,
    VolumeFailure,
}

/// What the caller should do with the input file afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Move to the finished directory.
    Finished,
    /// Move to the failed directory.
    Failed,
    /// Leave in the restore directory.
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub id: String,
    pub label: Option<String>,
    pub barcode: Option<String>,
}

impl VolumeInfo {
    /// Label if known, else barcode, else `-`.
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .or(self.barcode.as_deref())
            .unwrap_or("-")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TraceLevel::Info => "INFO",
            TraceLevel::Warning => "WARNING",
            TraceLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct TraceLine {
    pub at: DateTime<Local>,
    pub level: TraceLevel,
    pub message: String,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Result of running one input file through the restore protocol.
#[derive(Debug)]
pub struct BatchOutcome {
    pub source: PathBuf,
    /// Job monitor title, the file's base name.
    pub title: String,
    pub state: FileState,
    pub failure: Option<RestoreError>,
    pub items: Vec<RestoreItem>,
    /// Items the archive had no entry for.
    pub misses: Vec<RestoreItem>,
    pub selection: Option<String>,
    pub entries: u64,
    /// Sorted by volume id.
    pub volumes: Vec<VolumeInfo>,
    pub job_id: Option<String>,
    pub trace: Vec<TraceLine>,
}

impl BatchOutcome {
    pub fn new(source: &Path) -> Self {
        let title = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        Self {
            source: source.to_path_buf(),
            title,
            state: FileState::Init,
            failure: None,
            items: Vec::new(),
            misses: Vec::new(),
            selection: None,
            entries: 0,
            volumes: Vec::new(),
            job_id: None,
            trace: Vec::new(),
        }
    }

    /// `None` while the file has not reached a terminal state.
    pub fn classification(&self) -> Option<Classification> {
        match self.state {
            FileState::Submitted | FileState::DryRunDone => Some(Classification::Success),
            FileState::FailedParse => Some(Classification::ParseFailure),
            FileState::FailedSelection | FileState::FailedEmpty | FileState::FailedSubmit => {
                Some(Classification::SelectionFailure)
            }
            FileState::FailedVolumes => Some(Classification::VolumeFailure),
            _ => None,
        }
    }

    /// Only submitted files are finished; unreadable files are parked as failed and
    /// everything else stays in place for another run.
    pub fn relocation(&self) -> Relocation {
        match self.state {
            FileState::Submitted => Relocation::Finished,
            FileState::FailedParse => Relocation::Failed,
            _ => Relocation::Keep,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    pub fn trace_text(&self) -> String {
        self.trace
            .iter()
            .map(TraceLine::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcomes of one batch run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
    /// Set when the archive service became unreachable and the batch stopped.
    pub aborted: Option<RestoreError>,
    /// Files not processed because the batch stopped, starting with the one in flight.
    pub unprocessed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_in(state: FileState) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(Path::new("/srv/restore/Promo_v3.ale"));
        outcome.state = state;
        outcome
    }

    #[test]
    fn title_is_the_file_name() {
        assert_eq!(outcome_in(FileState::Init).title, "Promo_v3.ale");
    }

    #[test]
    fn only_submitted_files_are_finished() {
        assert_eq!(outcome_in(FileState::Submitted).relocation(), Relocation::Finished);
        assert_eq!(outcome_in(FileState::DryRunDone).relocation(), Relocation::Keep);
        assert_eq!(outcome_in(FileState::FailedSubmit).relocation(), Relocation::Keep);
        assert_eq!(outcome_in(FileState::FailedEmpty).relocation(), Relocation::Keep);
        assert_eq!(outcome_in(FileState::FailedParse).relocation(), Relocation::Failed);
    }

    #[test]
    fn terminal_states_are_classified() {
        assert_eq!(
            outcome_in(FileState::DryRunDone).classification(),
            Some(Classification::Success)
        );
        assert_eq!(
            outcome_in(FileState::FailedEmpty).classification(),
            Some(Classification::SelectionFailure)
        );
        assert_eq!(
            outcome_in(FileState::FailedVolumes).classification(),
            Some(Classification::VolumeFailure)
        );
        assert_eq!(outcome_in(FileState::EntriesSearched).classification(), None);
        assert!(!FileState::Described.is_terminal());
        assert!(FileState::FailedSubmit.is_terminal());
    }

    #[test]
    fn volume_name_falls_back_to_barcode() {
        let mut volume = VolumeInfo {
            id: "10003".to_string(),
            label: None,
            barcode: Some("000123L6".to_string()),
        };
        assert_eq!(volume.display_name(), "000123L6");
        volume.label = Some("Tape-0003".to_string());
        assert_eq!(volume.display_name(), "Tape-0003");
        volume.label = None;
        volume.barcode = None;
        assert_eq!(volume.display_name(), "-");
    }
}
