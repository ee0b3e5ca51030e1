use super::{
    Entry,
    session::{Connector, Session, SessionError},
};
use crate::interrupt::Interrupt;
use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{info, warn};

/// What to do with a local file, given the size of its remote counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Nothing on disk yet, download from the start
    Fresh,

    /// A partial download is on disk, continue from this byte offset
    Continue(u64),

    /// The local file is already as large as the remote one
    Complete,

    /// The local file is larger than the remote one, so it cannot be a prefix of it
    Restart,
}

impl Resume {
    /// Decide based on the local and remote sizes in bytes
    pub fn plan(local: u64, remote: u64) -> Self {
        if local == remote {
            Self::Complete
        } else if local > remote {
            Self::Restart
        } else if local > 0 {
            Self::Continue(local)
        } else {
            Self::Fresh
        }
    }
}

/// How often, and after how long, a failed download is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// The total number of attempts per file
    pub attempts: u32,

    /// The shortest pause between attempts
    pub min_delay: Duration,

    /// The longest pause between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A random pause in `[min_delay, max_delay)`, so parallel workers don't retry in lockstep
    pub fn delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }

        let mut bytes = [0; 4];
        let fraction = match getrandom::getrandom(&mut bytes) {
            Ok(()) => u32::from_le_bytes(bytes) as f64 / (u32::MAX as f64 + 1.0),
            Err(_) => 0.0,
        };

        self.min_delay + (self.max_delay - self.min_delay).mul_f64(fraction)
    }
}

/// How a successful call to [`download()`] went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// The local file was already complete
    AlreadyComplete,

    /// Bytes were transferred, starting at `offset`
    Downloaded { offset: u64, bytes: u64 },
}

/// Download a single file, resuming a partial copy and retrying on failure
pub fn download<C>(
    connector: &C,
    entry: &Entry,
    policy: &RetryPolicy,
    interrupt: &Interrupt,
) -> Result<Transfer, DownloadError>
where
    C: Connector,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        if interrupt.is_triggered() {
            return Err(DownloadError::Interrupted);
        }

        let err = match try_download(connector, entry, interrupt) {
            Ok(transfer) => return Ok(transfer),
            Err(_) if interrupt.is_triggered() => return Err(DownloadError::Interrupted),
            Err(err) => err,
        };

        if attempt == attempts {
            warn!("Error downloading {}: {err}", entry.remote_path);
            return Err(err);
        }

        let delay = policy.delay();
        if err.is_connection_limit() {
            info!(
                "Connection limit reached ({err}), retrying in {:.2} seconds...",
                delay.as_secs_f64()
            );
        } else {
            warn!("Error downloading {}: {err}", entry.remote_path);
            info!("Retrying in {:.2} seconds...", delay.as_secs_f64());
        }

        pause(delay, interrupt);
        attempt += 1;
    }
}

fn try_download<C>(
    connector: &C,
    entry: &Entry,
    interrupt: &Interrupt,
) -> Result<Transfer, DownloadError>
where
    C: Connector,
{
    let (folder, filename) = entry.remote_parts();

    let mut session = connector.connect()?;
    session.enter(folder)?;
    let remote_size = session.size(filename)?;

    let local_path = &entry.local_path;
    let local_size = fs::metadata(local_path).map(|meta| meta.len()).unwrap_or(0);

    let offset = match Resume::plan(local_size, remote_size) {
        Resume::Complete => {
            info!("Skipping complete file: {}", local_path.display());
            return Ok(Transfer::AlreadyComplete);
        }
        Resume::Restart => {
            info!(
                "Local file larger than remote, deleting and restarting: {}",
                local_path.display()
            );
            fs::remove_file(local_path)?;
            0
        }
        Resume::Continue(offset) => offset,
        Resume::Fresh => 0,
    };

    info!(
        "{} {} to {} from byte {offset}",
        if offset > 0 { "Resuming" } else { "Downloading" },
        entry.remote_path,
        local_path.display()
    );

    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(offset > 0)
        .truncate(offset == 0)
        .open(local_path)?;

    let mut sink = Interruptible {
        inner: BufWriter::new(file),
        interrupt,
    };
    let bytes = session.retrieve(filename, offset, &mut sink)?;
    sink.flush()?;

    Ok(Transfer::Downloaded { offset, bytes })
}

/// Sleep for `delay`, waking up early on Ctrl-C
fn pause(delay: Duration, interrupt: &Interrupt) {
    const STEP: Duration = Duration::from_millis(100);

    let mut remaining = delay;
    while !remaining.is_zero() && !interrupt.is_triggered() {
        let step = remaining.min(STEP);
        thread::sleep(step);
        remaining -= step;
    }
}

/// A writer that refuses further writes once Ctrl-C has been pressed
///
/// This cuts a transfer short at the next chunk. Whatever was written so far stays on disk,
/// and is resumed from on the next run.
struct Interruptible<'a, W> {
    inner: W,
    interrupt: &'a Interrupt,
}

impl<W: Write> Write for Interruptible<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.interrupt.is_triggered() {
            // Not ErrorKind::Interrupted, which io::copy would simply retry
            return Err(io::Error::other("download paused"));
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Errors that might occur downloading a file
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The server or connection failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The local file could not be written
    #[error("Could not write the local file")]
    Io(#[from] io::Error),

    /// The user pressed Ctrl-C
    #[error("Download paused")]
    Interrupted,
}

impl DownloadError {
    /// Did the server turn us away because too many clients are connected?
    pub fn is_connection_limit(&self) -> bool {
        match self {
            Self::Session(err) => err.is_connection_limit(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::testing::FakeServer;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const SONG: &[u8] = b"LHA archive with a tracker module inside";

    fn no_delay(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn entry(local: PathBuf) -> Entry {
        Entry {
            remote_path: "/Game/Huelsbeck/turrican.lha".to_owned(),
            local_path: local,
        }
    }

    #[test]
    fn plan() {
        assert_eq!(Resume::plan(0, 10), Resume::Fresh);
        assert_eq!(Resume::plan(4, 10), Resume::Continue(4));
        assert_eq!(Resume::plan(10, 10), Resume::Complete);
        assert_eq!(Resume::plan(12, 10), Resume::Restart);
        assert_eq!(Resume::plan(0, 0), Resume::Complete);
    }

    #[test]
    fn delay_stays_in_range() {
        let policy = RetryPolicy::default();

        for _ in 0..32 {
            let delay = policy.delay();
            assert!(delay >= policy.min_delay && delay < policy.max_delay);
        }

        assert_eq!(no_delay(1).delay(), Duration::ZERO);
    }

    #[test]
    fn fresh_download() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("Huelsbeck/turrican.lha"));

        let transfer = download(&server, &entry, &no_delay(1), &Interrupt::new()).unwrap();

        assert_eq!(
            transfer,
            Transfer::Downloaded {
                offset: 0,
                bytes: SONG.len() as u64
            }
        );
        assert_eq!(fs::read(&entry.local_path).unwrap(), SONG);
    }

    #[test]
    fn resumes_partial_download() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));
        fs::write(&entry.local_path, &SONG[..10]).unwrap();

        let transfer = download(&server, &entry, &no_delay(1), &Interrupt::new()).unwrap();

        assert_eq!(
            transfer,
            Transfer::Downloaded {
                offset: 10,
                bytes: SONG.len() as u64 - 10
            }
        );
        assert_eq!(fs::read(&entry.local_path).unwrap(), SONG);
    }

    #[test]
    fn skips_complete_file() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));
        fs::write(&entry.local_path, SONG).unwrap();

        let transfer = download(&server, &entry, &no_delay(1), &Interrupt::new()).unwrap();

        assert_eq!(transfer, Transfer::AlreadyComplete);
    }

    #[test]
    fn restarts_oversized_file() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));
        fs::write(&entry.local_path, [SONG, &b"garbage"[..]].concat()).unwrap();

        download(&server, &entry, &no_delay(1), &Interrupt::new()).unwrap();

        assert_eq!(fs::read(&entry.local_path).unwrap(), SONG);
    }

    #[test]
    fn retries_connection_limit() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        server.refuse_connections(2);
        let entry = entry(dir.path().join("turrican.lha"));

        download(&server, &entry, &no_delay(3), &Interrupt::new()).unwrap();
        assert_eq!(fs::read(&entry.local_path).unwrap(), SONG);
    }

    #[test]
    fn gives_up_after_last_attempt() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        server.refuse_connections(3);
        let entry = entry(dir.path().join("turrican.lha"));

        let err = download(&server, &entry, &no_delay(3), &Interrupt::new()).unwrap_err();
        assert!(err.is_connection_limit());
        assert!(!entry.local_path.exists());
    }

    #[test]
    fn missing_remote_file() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/other.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));

        let err = download(&server, &entry, &no_delay(2), &Interrupt::new()).unwrap_err();
        assert!(matches!(err, DownloadError::Session(ref err) if err.code() == Some(550)));
    }

    #[test]
    fn interrupted_before_start() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));
        let interrupt = Interrupt::new();
        interrupt.trigger();

        assert!(matches!(
            download(&server, &entry, &no_delay(3), &interrupt),
            Err(DownloadError::Interrupted)
        ));
    }

    #[test]
    fn interrupted_mid_transfer_resumes() {
        let dir = tempdir().unwrap();
        let server = FakeServer::with_files([("/Game/Huelsbeck/turrican.lha", SONG)]);
        let entry = entry(dir.path().join("turrican.lha"));

        let interrupt = Interrupt::new();
        server.interrupt_after(12, interrupt.clone());

        assert!(matches!(
            download(&server, &entry, &no_delay(3), &interrupt),
            Err(DownloadError::Interrupted)
        ));
        assert_eq!(fs::read(&entry.local_path).unwrap(), &SONG[..12]);

        let transfer = download(&server, &entry, &no_delay(1), &Interrupt::new()).unwrap();
        assert_eq!(
            transfer,
            Transfer::Downloaded {
                offset: 12,
                bytes: SONG.len() as u64 - 12
            }
        );
        assert_eq!(fs::read(&entry.local_path).unwrap(), SONG);
    }
}
