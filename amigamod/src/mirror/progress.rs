use super::Entry;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use thiserror::Error;

/// The checkpoint of a mirror run
///
/// Holds the full list of files to download, and the remote paths of those that finished.
/// It is written to disk after every completed download, so an interrupted run can pick up
/// where it left off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    to_download: Vec<Entry>,
    completed: BTreeSet<String>,
}

impl Progress {
    /// Start tracking a fresh list of files, none of them completed
    pub fn new(to_download: Vec<Entry>) -> Self {
        Self {
            to_download,
            completed: BTreeSet::new(),
        }
    }

    /// Load a checkpoint from disk, or `None` if there is none yet
    pub fn load(path: &Path) -> Result<Option<Self>, ProgressError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut progress: Self = serde_json::from_reader(BufReader::new(file))?;
        progress.prune();

        Ok(Some(progress))
    }

    /// Write the checkpoint to disk
    ///
    /// The file is replaced in one go, so a crash mid-write leaves the previous checkpoint intact.
    pub fn save(&self, path: &Path) -> Result<(), ProgressError> {
        let folder = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(folder)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        file.persist(path).map_err(|err| err.error)?;

        Ok(())
    }

    /// Every file in the list
    pub fn entries(&self) -> &[Entry] {
        &self.to_download
    }

    /// The files that still need downloading, in list order
    pub fn pending(&self) -> Vec<Entry> {
        self.to_download
            .iter()
            .filter(|entry| !self.completed.contains(&entry.remote_path))
            .cloned()
            .collect()
    }

    /// The number of completed files
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Has the file at this remote path been downloaded?
    pub fn is_completed(&self, remote_path: &str) -> bool {
        self.completed.contains(remote_path)
    }

    /// Record a finished download
    ///
    /// Paths that are not in the list are ignored. Returns whether the path was newly marked.
    pub fn mark_completed(&mut self, remote_path: &str) -> bool {
        if self
            .to_download
            .iter()
            .any(|entry| entry.remote_path == remote_path)
        {
            self.completed.insert(remote_path.to_owned())
        } else {
            false
        }
    }

    // Drop completions for paths that are no longer in the list
    fn prune(&mut self) {
        let known: BTreeSet<_> = self
            .to_download
            .iter()
            .map(|entry| entry.remote_path.as_str())
            .collect();
        self.completed.retain(|path| known.contains(path.as_str()));
    }
}

/// Errors that might occur loading or saving a [`Progress`] checkpoint
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Any failure that has to do with I/O
    #[error("Something failed with I/O")]
    Io(#[from] io::Error),

    /// The checkpoint is not valid JSON of the expected shape
    #[error("The checkpoint is malformed")]
    Json(#[from] serde_json::Error),
}
