// p5restore/src/utils/files.rs
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::parsers::MetadataFormat;
use crate::restore::{BatchOutcome, Relocation};

/// Directory layout of a batch installation.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    pub restore: PathBuf,
    pub finished: PathBuf,
    pub failed: PathBuf,
    pub logs: PathBuf,
}

impl WorkDirs {
    pub fn new(base: &Path) -> Self {
        Self {
            restore: base.join("restore"),
            finished: base.join("finished"),
            failed: base.join("failed"),
            logs: base.join("logs"),
        }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.restore, &self.finished, &self.failed, &self.logs] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Target directory for `relocation`, `None` when the file stays put.
    pub fn destination(&self, relocation: Relocation) -> Option<&Path> {
        match relocation {
            Relocation::Finished => Some(self.finished.as_path()),
            Relocation::Failed => Some(self.failed.as_path()),
            Relocation::Keep => None,
        }
    }
}

/// ALE, AAF and EDL files directly inside `dir`, sorted by name.
pub fn collect_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        if entry.file_type().is_file() && MetadataFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Moves `file` into `dest_dir`, copying across file systems when needed.
pub fn relocate(file: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .with_context(|| format!("Cannot relocate {}: no file name", file.display()))?;
    let target = dest_dir.join(name);

    if fs::rename(file, &target).is_err() {
        fs::copy(file, &target).with_context(|| {
            format!("Failed to copy {} to {}", file.display(), target.display())
        })?;
        fs::remove_file(file)
            .with_context(|| format!("Failed to remove {} after copy", file.display()))?;
    }
    tracing::info!("Moved {} to {}", file.display(), dest_dir.display());
    Ok(target)
}

/// Appends the outcome's trace to `<logs_dir>/<file name>.log`.
pub fn write_trace_log(logs_dir: &Path, outcome: &BatchOutcome) -> Result<PathBuf> {
    let path = logs_dir.join(format!("{}.log", outcome.title));
    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    writeln!(log, "{}", outcome.trace_text())
        .with_context(|| format!("Failed to write log file {}", path.display()))?;
    Ok(path)
}
