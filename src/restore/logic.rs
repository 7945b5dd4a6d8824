// p5restore/src/restore/logic.rs
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::archive::{ArchiveClient, MatchPolicy};
use crate::errors::{ParseError, RestoreError};
use crate::parsers::{self, RestoreItem};

use super::events::RestoreEvent;
use super::outcome::{BatchOutcome, BatchReport, FileState, TraceLevel, TraceLine, VolumeInfo};

/// Per-run settings of the restore protocol.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub archive_id: String,
    /// Client name passed to `RestoreSelection create`.
    pub client_host: String,
    pub destination: Option<String>,
    pub match_policy: MatchPolicy,
    /// Withhold the final submit.
    pub dry_run: bool,
    /// Search each distinct item once, keeping first occurrences in file order.
    pub deduplicate: bool,
    /// Destroy selections that will never be submitted.
    pub destroy_abandoned: bool,
}

type Observer<'a> = Box<dyn FnMut(&Path, &RestoreEvent) + 'a>;

/// Drives input files through parse, connect, create, search, verify, volume
/// resolution and submit, strictly one archive call at a time.
pub struct RestoreOrchestrator<'a, C: ArchiveClient + ?Sized> {
    client: &'a C,
    options: &'a RestoreOptions,
    observer: Option<Observer<'a>>,
}

impl<'a, C: ArchiveClient + ?Sized> RestoreOrchestrator<'a, C> {
    pub fn new(client: &'a C, options: &'a RestoreOptions) -> Self {
        Self {
            client,
            options,
            observer: None,
        }
    }

    /// Registers a callback that sees every event as soon as it happens.
    pub fn with_observer(mut self, observer: impl FnMut(&Path, &RestoreEvent) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Processes `files` in order, handing each outcome to `finished` as soon as
    /// the file reaches a terminal state. A file-local failure is recorded and the
    /// batch continues; an unreachable archive service stops the batch at that file.
    pub fn run_batch(
        &mut self,
        files: &[PathBuf],
        mut finished: impl FnMut(&BatchOutcome),
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, file) in files.iter().enumerate() {
            match self.process_file(file) {
                Ok(outcome) => {
                    debug_assert!(outcome.state.is_terminal());
                    finished(&outcome);
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    debug_assert!(err.is_batch_fatal());
                    tracing::error!(
                        "Aborting batch at {}: {}. {} file(s) left unprocessed.",
                        file.display(),
                        err,
                        files.len() - index
                    );
                    report.aborted = Some(err);
                    report.unprocessed = files[index..].to_vec();
                    break;
                }
            }
        }
        report
    }

    /// Parses `path` and runs its items through the protocol.
    ///
    /// Returns `Err` only for batch-fatal failures; every other outcome, failed or
    /// not, is an `Ok(BatchOutcome)`.
    pub fn process_file(&mut self, path: &Path) -> Result<BatchOutcome, RestoreError> {
        let mut outcome = BatchOutcome::new(path);
        match parsers::parse_file(path) {
            Ok(items) => outcome.items = items,
            Err(err) => return Ok(self.fail(outcome, FileState::FailedParse, err.into())),
        }
        self.restore_parsed(outcome)
    }

    /// Runs an already chosen item list, e.g. a subset picked by an operator.
    pub fn restore_items(
        &mut self,
        source: &Path,
        items: Vec<RestoreItem>,
    ) -> Result<BatchOutcome, RestoreError> {
        let mut outcome = BatchOutcome::new(source);
        outcome.items = items;
        self.restore_parsed(outcome)
    }

    fn restore_parsed(&mut self, mut outcome: BatchOutcome) -> Result<BatchOutcome, RestoreError> {
        if self.options.deduplicate {
            let mut seen = std::collections::HashSet::new();
            outcome.items.retain(|item| seen.insert(item.clone()));
        }
        if outcome.items.is_empty() {
            return Ok(self.fail(outcome, FileState::FailedParse, ParseError::NoItems.into()));
        }
        outcome.state = FileState::Parsed;
        let items = outcome.items.len();
        self.emit(&mut outcome, RestoreEvent::Parsed { items });

        let host = match self.client.check_connection() {
            Ok(host) => host,
            Err(err) => {
                let err = RestoreError::Connection(err);
                let event = RestoreEvent::Failed {
                    state: outcome.state,
                    reason: err.to_string(),
                };
                self.emit(&mut outcome, event);
                return Err(err);
            }
        };
        outcome.state = FileState::Connected;
        self.emit(&mut outcome, RestoreEvent::Connected { host });

        let selection = match self
            .client
            .create_selection(&self.options.client_host, self.options.destination.as_deref())
        {
            Ok(selection) => selection,
            Err(err) => {
                self.record_service_error(&mut outcome);
                return Ok(self.fail(outcome, FileState::FailedSelection, RestoreError::Selection(err)));
            }
        };
        outcome.selection = Some(selection.clone());
        outcome.state = FileState::SelectionCreated;
        self.emit(
            &mut outcome,
            RestoreEvent::SelectionCreated {
                selection: selection.clone(),
                archive_id: self.options.archive_id.clone(),
            },
        );

        self.search_entries(&mut outcome, &selection);
        outcome.state = FileState::EntriesSearched;

        outcome.entries = match self.client.count_entries(&selection) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Could not count entries of {}: {}", selection, err);
                0
            }
        };
        if outcome.entries == 0 {
            self.abandon(&mut outcome, &selection);
            return Ok(self.fail(outcome, FileState::FailedEmpty, RestoreError::EmptySelection { selection }));
        }
        outcome.state = FileState::EntriesVerified;
        let entries = outcome.entries;
        self.emit(
            &mut outcome,
            RestoreEvent::EntriesAdded {
                selection: selection.clone(),
                entries,
            },
        );

        let mut volume_ids = match self.client.list_volumes(&selection) {
            Ok(volumes) => volumes,
            Err(err) => {
                tracing::warn!("Could not list volumes of {}: {}", selection, err);
                Vec::new()
            }
        };
        if volume_ids.is_empty() {
            self.record_service_error(&mut outcome);
            self.abandon(&mut outcome, &selection);
            return Ok(self.fail(outcome, FileState::FailedVolumes, RestoreError::Volume { selection }));
        }
        volume_ids.sort();
        volume_ids.dedup();
        for id in volume_ids {
            let volume = VolumeInfo {
                label: self.volume_attribute(&id, C::volume_label),
                barcode: self.volume_attribute(&id, C::volume_barcode),
                id,
            };
            self.emit(&mut outcome, RestoreEvent::VolumeResolved(volume.clone()));
            outcome.volumes.push(volume);
        }
        outcome.state = FileState::VolumesResolved;

        let title = outcome.title.clone();
        match self.client.describe(&selection, &title) {
            Ok(_) => self.emit(&mut outcome, RestoreEvent::Described { title: title.clone() }),
            Err(err) => self.emit(
                &mut outcome,
                RestoreEvent::DescribeFailed {
                    reason: err.to_string(),
                },
            ),
        }
        outcome.state = FileState::Described;

        if self.options.dry_run {
            outcome.state = FileState::DryRunDone;
            self.emit(&mut outcome, RestoreEvent::DryRunFinished);
            self.abandon(&mut outcome, &selection);
            return Ok(outcome);
        }

        match self.client.submit(&selection) {
            Ok(job_id) => {
                outcome.job_id = Some(job_id.clone());
                outcome.state = FileState::Submitted;
                self.emit(&mut outcome, RestoreEvent::Submitted { job_id, title });
                Ok(outcome)
            }
            Err(source) => {
                self.abandon(&mut outcome, &selection);
                Ok(self.fail(outcome, FileState::FailedSubmit, RestoreError::Submit { selection, source }))
            }
        }
    }

    /// Searches every item in order. Misses, including failed calls, are noted and
    /// never stop the search.
    fn search_entries(&mut self, outcome: &mut BatchOutcome, selection: &str) {
        let items = std::mem::take(&mut outcome.items);
        for item in &items {
            if item.trim().is_empty() {
                self.miss(outcome, item);
                continue;
            }
            let result = self.client.find_entry(
                selection,
                &self.options.archive_id,
                item,
                self.options.match_policy,
            );
            match result {
                Ok(matches) if !matches.is_empty() && matches != "0" => {
                    let event = RestoreEvent::ItemFound {
                        item: item.clone(),
                        matches,
                    };
                    self.emit(outcome, event);
                }
                Ok(_) => self.miss(outcome, item),
                Err(err) => {
                    tracing::warn!("findentry for {} failed: {}", item, err);
                    self.miss(outcome, item);
                }
            }
        }
        outcome.items = items;
    }

    fn miss(&mut self, outcome: &mut BatchOutcome, item: &str) {
        outcome.misses.push(item.to_string());
        self.emit(outcome, RestoreEvent::ItemMissing { item: item.to_string() });
    }

    fn volume_attribute(
        &self,
        volume: &str,
        fetch: fn(&C, &str) -> Result<String, crate::errors::ArchiveError>,
    ) -> Option<String> {
        match fetch(self.client, volume) {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("Could not query volume {}: {}", volume, err);
                None
            }
        }
    }

    /// Adds the service's last error message to the trace, if it has one.
    fn record_service_error(&mut self, outcome: &mut BatchOutcome) {
        if let Ok(message) = self.client.last_error() {
            if !message.is_empty() {
                self.emit(outcome, RestoreEvent::ServiceError { message });
            }
        }
    }

    fn abandon(&mut self, outcome: &mut BatchOutcome, selection: &str) {
        if !self.options.destroy_abandoned {
            return;
        }
        match self.client.destroy(selection) {
            Ok(_) => self.emit(
                outcome,
                RestoreEvent::SelectionDestroyed {
                    selection: selection.to_string(),
                },
            ),
            Err(err) => tracing::warn!("Could not destroy {}: {}", selection, err),
        }
    }

    fn fail(&mut self, mut outcome: BatchOutcome, state: FileState, err: RestoreError) -> BatchOutcome {
        outcome.state = state;
        self.emit(
            &mut outcome,
            RestoreEvent::Failed {
                state,
                reason: err.to_string(),
            },
        );
        outcome.failure = Some(err);
        outcome
    }

    fn emit(&mut self, outcome: &mut BatchOutcome, event: RestoreEvent) {
        let level = event.level();
        match level {
            TraceLevel::Info => tracing::info!("{}: {}", outcome.title, event),
            TraceLevel::Warning => tracing::warn!("{}: {}", outcome.title, event),
            TraceLevel::Error => tracing::error!("{}: {}", outcome.title, event),
        }
        outcome.trace.push(TraceLine {
            at: Local::now(),
            level,
            message: event.to_string(),
        });
        if let Some(observer) = self.observer.as_mut() {
            observer(&outcome.source, &event);
        }
    }
}
