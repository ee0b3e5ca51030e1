//! Mirroring a remote archive of `.lha` files to disk
//!
//! The mirror works in two phases. First the remote tree is walked and every `.lha` file is
//! recorded, together with where it should end up locally: `<download dir>/<author>/<file>`,
//! where the author is the name of the folder the file lives in. That list is saved as a
//! [`Progress`] checkpoint. Then the files are downloaded on a handful of parallel
//! connections, and the checkpoint is updated after every finished file.
//!
//! Running the mirror again picks up where the last run stopped. Completed files are skipped
//! outright, and partially downloaded files are continued from their current size.

mod download;
mod ftp;
mod progress;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use download::{DownloadError, Resume, RetryPolicy, Transfer, download};
pub use ftp::{FtpConnector, FtpSession};
pub use progress::{Progress, ProgressError};
pub use session::{Connector, Session, SessionError};

use crate::interrupt::Interrupt;
use parking_lot::Mutex;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{info, warn};

/// The server mirrored unless configured otherwise
pub const DEFAULT_HOST: &str = "ftp.exotica.org.uk";

/// The remote folder mirrored unless configured otherwise
pub const DEFAULT_BASE_PATH: &str = "/pub/exotica/media/audio/UnExoticA/Game/";

/// The local folder files are downloaded into unless configured otherwise
pub const DEFAULT_DOWNLOAD_DIR: &str = "amiga_music_by_author";

/// Where the checkpoint is kept unless configured otherwise
pub const DEFAULT_PROGRESS_FILE: &str = "progress.json";

/// The number of simultaneous downloads unless configured otherwise
pub const DEFAULT_PARALLEL: usize = 3;

/// The connection timeout unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The suffix of the remote files that get mirrored
pub const REMOTE_SUFFIX: &str = ".lha";

/// A remote file and where it is downloaded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The absolute path on the server
    pub remote_path: String,

    /// The path on disk
    pub local_path: PathBuf,
}

impl Entry {
    /// Create an entry for a remote file, placing it in `download_dir/<author>/<file>`
    pub fn new(remote_path: String, download_dir: &Path) -> Self {
        let (folder, filename) = split_remote(&remote_path);
        let author = folder.rsplit('/').find(|part| !part.is_empty()).unwrap_or_default();
        let local_path = download_dir.join(author).join(filename);

        Self {
            remote_path,
            local_path,
        }
    }

    /// The remote folder and file name
    pub fn remote_parts(&self) -> (&str, &str) {
        split_remote(&self.remote_path)
    }
}

fn split_remote(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", filename)) => ("/", filename),
        Some(parts) => parts,
        None => (".", path),
    }
}

fn join_remote(folder: &str, name: &str) -> String {
    format!("{}/{name}", folder.trim_end_matches('/'))
}

/// Walk the remote tree below `base` and list every `.lha` file
///
/// Anything that can be entered is treated as a folder, and anything that is refused with a
/// permanent error as a file. Folders that cannot be listed are treated as empty.
pub fn collect<S>(session: &mut S, base: &str, download_dir: &Path) -> Result<Vec<Entry>, SessionError>
where
    S: Session,
{
    session.enter(base)?;

    let mut entries = Vec::new();
    collect_into(session, base, download_dir, &mut entries)?;

    Ok(entries)
}

fn collect_into<S>(
    session: &mut S,
    folder: &str,
    download_dir: &Path,
    entries: &mut Vec<Entry>,
) -> Result<(), SessionError>
where
    S: Session,
{
    let names = match session.list() {
        Ok(names) => names,
        Err(err) if err.code() == Some(550) => return Ok(()),
        Err(err) => return Err(err),
    };

    for name in names {
        if name == "." || name == ".." {
            continue;
        }

        match session.enter(&name) {
            Ok(()) => {
                collect_into(session, &join_remote(folder, &name), download_dir, entries)?;
                session.leave()?;
            }
            Err(err) if err.is_permanent() => {
                if name.ends_with(REMOTE_SUFFIX) {
                    entries.push(Entry::new(join_remote(folder, &name), download_dir));
                }
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

/// Settings for a [`Mirror`]
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// The remote folder to mirror
    pub base_path: String,

    /// The local folder to download into
    pub download_dir: PathBuf,

    /// Where to keep the checkpoint
    pub progress_file: PathBuf,

    /// The number of simultaneous downloads
    pub parallel: usize,

    /// How failed downloads are retried
    pub retry: RetryPolicy,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_owned(),
            download_dir: DEFAULT_DOWNLOAD_DIR.into(),
            progress_file: DEFAULT_PROGRESS_FILE.into(),
            parallel: DEFAULT_PARALLEL,
            retry: RetryPolicy::default(),
        }
    }
}

/// Mirrors a remote folder, checkpointing along the way
pub struct Mirror<C> {
    connector: C,
    config: MirrorConfig,
    interrupt: Interrupt,
}

impl<C> Mirror<C>
where
    C: Connector,
{
    /// Create a new mirror
    pub fn new(connector: C, config: MirrorConfig, interrupt: Interrupt) -> Self {
        Self {
            connector,
            config,
            interrupt,
        }
    }

    /// The settings in use
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Load the checkpoint of an earlier run, if there is one
    pub fn load(&self) -> Result<Option<Progress>, MirrorError> {
        Ok(Progress::load(&self.config.progress_file)?)
    }

    /// Walk the remote tree and save the result as a fresh checkpoint
    pub fn collect(&self) -> Result<Progress, MirrorError> {
        let mut session = self.connector.connect()?;
        let entries = collect(
            &mut session,
            &self.config.base_path,
            &self.config.download_dir,
        )?;

        let progress = Progress::new(entries);
        progress.save(&self.config.progress_file)?;

        Ok(progress)
    }

    /// Download every pending file in the checkpoint
    ///
    /// A file that fails after all retries does not stop the others. Failures are returned
    /// in the [`Outcome`] instead.
    pub fn download(&self, progress: Progress) -> Result<Outcome, MirrorError> {
        let pending = progress.pending();
        let progress = Mutex::new(progress);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.parallel.max(1))
            .build()?;

        let results: Vec<_> = pool.install(|| {
            pending
                .par_iter()
                .map(|entry| {
                    let result =
                        download(&self.connector, entry, &self.config.retry, &self.interrupt);

                    if result.is_ok() {
                        let mut progress = progress.lock();
                        progress.mark_completed(&entry.remote_path);
                        if let Err(err) = progress.save(&self.config.progress_file) {
                            warn!("Could not save the checkpoint: {err}");
                        }
                    }

                    (entry, result)
                })
                .collect()
        });

        let mut outcome = Outcome {
            interrupted: self.interrupt.is_triggered(),
            ..Outcome::default()
        };

        for (entry, result) in results {
            match result {
                Ok(_) => outcome.completed += 1,
                Err(DownloadError::Interrupted) => (),
                Err(err) => outcome.failures.push((entry.clone(), err)),
            }
        }

        info!(
            "{} of {} pending files completed",
            outcome.completed,
            pending.len()
        );

        Ok(outcome)
    }
}

/// The result of [`Mirror::download()`]
#[derive(Debug, Default)]
pub struct Outcome {
    /// Files that are now complete on disk
    pub completed: usize,

    /// Files that failed after all retries
    pub failures: Vec<(Entry, DownloadError)>,

    /// Was the run cut short by Ctrl-C?
    pub interrupted: bool,
}

/// Errors that might occur mirroring
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Talking to the server failed
    #[error("Could not list the remote files")]
    Session(#[from] SessionError),

    /// The checkpoint could not be read or written
    #[error("Could not access the checkpoint")]
    Progress(#[from] ProgressError),

    /// The worker pool could not be set up
    #[error("Could not start the download workers")]
    Pool(#[from] ThreadPoolBuildError),
}
