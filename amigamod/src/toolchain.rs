//! Invocation of the external `lha`, `uade123` and `lame` binaries

use crate::{
    info::{ModuleInfo, ParseError},
    interrupt::Interrupt,
};
use std::{
    io,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

/// The set of external programs used for extracting, decoding and encoding
///
/// By default every program is looked up on the `PATH`, but each can be pointed at a specific
/// binary instead.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// The LHA extractor
    pub lha: PathBuf,

    /// The UADE command-line player/decoder
    pub uade: PathBuf,

    /// The LAME MP3 encoder
    pub lame: PathBuf,

    /// LAME's VBR quality setting (0 = best, 9 = worst)
    pub quality: u8,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            lha: "lha".into(),
            uade: "uade123".into(),
            lame: "lame".into(),
            quality: Self::DEFAULT_QUALITY,
        }
    }
}

/// How a call to [`Toolchain::play()`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The player ran until the end of the subsong
    Finished,

    /// The user pressed Ctrl-C and the player was terminated
    Interrupted,
}

impl Toolchain {
    /// The VBR quality passed to LAME unless configured otherwise
    pub const DEFAULT_QUALITY: u8 = 2;

    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Extract an archive into a destination folder
    pub fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ToolError> {
        let mut dest_arg = std::ffi::OsString::from("xw=");
        dest_arg.push(dest);

        let mut command = Command::new(&self.lha);
        command.arg(dest_arg).arg(archive).stdout(Stdio::null());

        let status = run(&self.lha, &mut command)?;
        check(&self.lha, status)
    }

    /// Ask UADE what it knows about a module
    ///
    /// Returns [`ToolError::Status`] when UADE does not recognize the file.
    pub fn info(&self, file: &Path) -> Result<ModuleInfo, ToolError> {
        let mut command = Command::new(&self.uade);
        command.arg("--get-info").arg(file).stdin(Stdio::null());
        debug!("Running {command:?}");

        let output = command.output().map_err(|source| spawn_error(&self.uade, source))?;
        check(&self.uade, output.status)?;

        Ok(ModuleInfo::parse(&String::from_utf8_lossy(&output.stdout))?)
    }

    /// Decode a subsong to raw PCM and pipe it straight into the MP3 encoder
    pub fn encode(&self, file: &Path, subsong: u32, output: &Path) -> Result<(), ToolError> {
        let mut decoder = Command::new(&self.uade);
        decoder
            .args(["-f", "-", "-e", "raw", "-s"])
            .arg(subsong.to_string())
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped());
        debug!("Running {decoder:?}");

        let mut decoder = decoder
            .spawn()
            .map_err(|source| spawn_error(&self.uade, source))?;

        // Moving the pipe into the encoder leaves no handle on our side, so the decoder gets a
        // broken pipe as soon as the encoder goes away
        let pcm = match decoder.stdout.take() {
            Some(pcm) => pcm,
            None => {
                reap(&mut decoder);
                return Err(ToolError::Io(io::Error::other("decoder output was not captured")));
            }
        };

        let mut encoder = Command::new(&self.lame);
        encoder
            .args(["-r", "-s", "44.1", "-m", "s", "-V"])
            .arg(self.quality.to_string())
            .arg("-")
            .arg(output)
            .stdin(Stdio::from(pcm));
        debug!("Running {encoder:?}");

        let mut encoder = match encoder.spawn() {
            Ok(encoder) => encoder,
            Err(source) => {
                reap(&mut decoder);
                return Err(spawn_error(&self.lame, source));
            }
        };

        let decoded = decoder.wait()?;
        if !decoded.success() {
            reap(&mut encoder);
            return check(&self.uade, decoded);
        }

        let encoded = encoder.wait()?;
        check(&self.lame, encoded)
    }

    /// Play a subsong through the speakers, returning early when `interrupt` is triggered
    pub fn play(
        &self,
        file: &Path,
        subsong: u32,
        interrupt: &Interrupt,
    ) -> Result<PlayOutcome, ToolError> {
        let mut command = Command::new(&self.uade);
        command.arg("-s").arg(subsong.to_string()).arg(file);
        debug!("Running {command:?}");

        let mut player = command
            .spawn()
            .map_err(|source| spawn_error(&self.uade, source))?;

        loop {
            if let Some(status) = player.try_wait()? {
                // The terminal delivers Ctrl-C to the player as well, so it may have exited on
                // its own before we noticed the flag
                if interrupt.is_triggered() {
                    return Ok(PlayOutcome::Interrupted);
                }

                check(&self.uade, status)?;
                return Ok(PlayOutcome::Finished);
            }

            if interrupt.is_triggered() {
                reap(&mut player);
                return Ok(PlayOutcome::Interrupted);
            }

            thread::sleep(Self::POLL_INTERVAL);
        }
    }
}

fn run(program: &Path, command: &mut Command) -> Result<ExitStatus, ToolError> {
    debug!("Running {command:?}");
    command
        .status()
        .map_err(|source| spawn_error(program, source))
}

fn spawn_error(program: &Path, source: io::Error) -> ToolError {
    ToolError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

fn check(program: &Path, status: ExitStatus) -> Result<(), ToolError> {
    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Status {
            program: program.display().to_string(),
            status,
        })
    }
}

/// Kill a child that is no longer wanted and collect its exit status
fn reap(child: &mut Child) {
    // Both calls fail only if the child already exited, which is what we want anyway
    let _ = child.kill();
    let _ = child.wait();
}

/// Errors that might occur running one of the external tools
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started (it is probably not installed)
    #[error("Could not run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The program ran, but reported failure
    #[error("{program} failed with {status}")]
    Status { program: String, status: ExitStatus },

    /// UADE's info output could not be understood
    #[error("Could not parse the module info")]
    Parse(#[from] ParseError),

    /// Any other failure that has to do with I/O
    #[error("Something failed with I/O")]
    Io(#[from] io::Error),
}
