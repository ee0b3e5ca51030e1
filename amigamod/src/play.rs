//! Sequential playback of archives through `uade123`

use crate::{
    archive::{ExtractError, Extraction},
    interrupt::Interrupt,
    toolchain::{PlayOutcome, ToolError, Toolchain},
};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Plays every subsong of every module in an archive, one after the other
pub struct Player {
    toolchain: Toolchain,
    interrupt: Interrupt,
}

impl Player {
    /// Create a player that stops as soon as `interrupt` is triggered
    pub fn new(toolchain: Toolchain, interrupt: Interrupt) -> Self {
        Self {
            toolchain,
            interrupt,
        }
    }

    /// Play a list of archives in order
    ///
    /// Returns [`PlayOutcome::Interrupted`] if playback was stopped by the user.
    pub fn play_all<I>(&self, archives: I) -> Result<PlayOutcome, PlayError>
    where
        I: IntoIterator,
        <I as IntoIterator>::Item: AsRef<Path>,
    {
        for archive in archives {
            if self.interrupt.is_triggered() {
                return Ok(PlayOutcome::Interrupted);
            }

            if self.play_archive(archive.as_ref())? == PlayOutcome::Interrupted {
                return Ok(PlayOutcome::Interrupted);
            }
        }

        Ok(PlayOutcome::Finished)
    }

    /// Play all subsongs in a single archive
    ///
    /// Ctrl-C also reaches `lha` and `uade123`, so a failure while preparing the archive counts
    /// as an interruption once the flag is up.
    pub fn play_archive(&self, archive: &Path) -> Result<PlayOutcome, PlayError> {
        let extraction = match Extraction::new(&self.toolchain, archive) {
            Ok(extraction) => extraction,
            Err(_) if self.interrupt.is_triggered() => return Ok(PlayOutcome::Interrupted),
            Err(err) => return Err(err.into()),
        };

        let modules = match extraction.modules(&self.toolchain) {
            Ok(modules) => modules,
            Err(_) if self.interrupt.is_triggered() => return Ok(PlayOutcome::Interrupted),
            Err(err) => return Err(err.into()),
        };

        for module in modules {
            let name = module.name();
            let multiple = module.subsong_count() > 1;

            for task in module.tasks() {
                if self.interrupt.is_triggered() {
                    return Ok(PlayOutcome::Interrupted);
                }

                if multiple {
                    info!("Playing: {name} (subsong {})", task.subsong);
                } else {
                    info!("Playing: {name}");
                }

                match self.toolchain.play(&module.path, task.subsong, &self.interrupt) {
                    Ok(PlayOutcome::Finished) => (),
                    Ok(PlayOutcome::Interrupted) => return Ok(PlayOutcome::Interrupted),
                    Err(err @ ToolError::Spawn { .. }) => return Err(err.into()),
                    Err(err) => {
                        warn!(
                            "Skipping {} - not a valid music file for uade123 ({err})",
                            module.path.display()
                        );
                        break;
                    }
                }
            }

            module.remove();
        }

        Ok(PlayOutcome::Finished)
    }
}

/// Errors that might occur during playback
#[derive(Debug, Error)]
pub enum PlayError {
    /// The archive could not be extracted
    #[error("Could not extract the archive")]
    Extract(#[from] ExtractError),

    /// The player could not be run
    #[error("Could not run the player")]
    Tool(#[from] ToolError),
}
