//! Batch conversion of archives to MP3

use crate::{
    archive::{ExtractError, Extraction, Module, Task},
    interrupt::Interrupt,
    naming::{ArchiveNaming, ModuleNaming},
    toolchain::{ToolError, Toolchain},
};
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder, prelude::*};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

/// How converted songs are named, and where they end up
#[derive(Debug, Clone)]
pub enum Naming {
    /// Next to the archive, named after it (see [`ArchiveNaming`])
    Archive,

    /// In a chosen folder, named after the module (see [`ModuleNaming`])
    Module(ModuleNaming),
}

/// Converts every subsong of every module in a set of archives to MP3
///
/// Archives are converted in parallel, each on its own worker. The subsongs of a single
/// archive are converted one after the other.
#[derive(Debug, Clone)]
pub struct Converter {
    toolchain: Toolchain,
    naming: Naming,
    stop_on_error: bool,
    interrupt: Interrupt,
}

impl Converter {
    /// Create a converter that logs failed songs and carries on with the rest
    pub fn new(toolchain: Toolchain, naming: Naming, interrupt: Interrupt) -> Self {
        Self {
            toolchain,
            naming,
            stop_on_error: false,
            interrupt,
        }
    }

    /// Give up on the rest of an archive as soon as one of its songs fails to convert
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Convert a batch of archives on a pool of `jobs` workers
    ///
    /// `None` sizes the pool to the number of CPUs. A failing archive does not stop the
    /// others, failures are collected in the returned [`Summary`] instead.
    pub fn run(&self, archives: &[PathBuf], jobs: Option<usize>) -> Result<Summary, ConvertError> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(jobs) = jobs {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build()?;

        let outcomes: Vec<_> = pool.install(|| {
            archives
                .par_iter()
                .map(|archive| (archive, self.convert_archive(archive)))
                .collect()
        });

        let mut summary = Summary {
            interrupted: self.interrupt.is_triggered(),
            ..Summary::default()
        };

        for (archive, outcome) in outcomes {
            match outcome {
                Ok(report) => summary.add(&report),
                Err(err) => summary.failures.push((archive.clone(), err)),
            }
        }

        Ok(summary)
    }

    /// Convert all songs in a single archive
    pub fn convert_archive(&self, archive: &Path) -> Result<Report, ConvertError> {
        let mut report = Report::default();
        if self.interrupt.is_triggered() {
            return Ok(report);
        }

        let extraction = Extraction::new(&self.toolchain, archive)?;
        let modules = extraction.modules(&self.toolchain)?;
        let tasks: Vec<_> = modules.iter().flat_map(Module::tasks).collect();
        let archive_naming = ArchiveNaming::new(archive, tasks.len());

        for (index, task) in tasks.iter().enumerate() {
            if self.interrupt.is_triggered() {
                break;
            }

            let output = match &self.naming {
                Naming::Archive => archive_naming.path(index),
                Naming::Module(naming) => naming.path(
                    &task.module.name(),
                    task.subsong,
                    task.module.subsong_count(),
                ),
            };

            if is_converted(&output) {
                info!(
                    "Skipping {} as it already exists and is not empty",
                    output.display()
                );
                report.skipped += 1;
                continue;
            }

            let label = self.label(&extraction, task);
            info!("Converting: {label} to {}", output.display());

            match self.toolchain.encode(&task.module.path, task.subsong, &output) {
                Ok(()) => report.converted += 1,
                Err(source) => {
                    discard(&output);

                    if self.stop_on_error {
                        return Err(ConvertError::Encode { output, source });
                    }

                    warn!("Failed to convert {label} to {}: {source}", output.display());
                    report.failed += 1;
                }
            }
        }

        for module in &modules {
            module.remove();
        }

        Ok(report)
    }

    fn label(&self, extraction: &Extraction, task: &Task) -> String {
        match self.naming {
            Naming::Archive => format!(
                "{} (subsong {})",
                extraction.relative(&task.module.path).display(),
                task.subsong
            ),
            Naming::Module(_) if task.module.subsong_count() > 1 => {
                format!("{} (subsong {})", task.module.name(), task.subsong)
            }
            Naming::Module(_) => task.module.name(),
        }
    }
}

/// Has this output been written by an earlier run?
fn is_converted(output: &Path) -> bool {
    fs::metadata(output)
        .map(|metadata| metadata.len() > 0)
        .unwrap_or(false)
}

/// Remove a partially written output
fn discard(output: &Path) {
    if output.exists() {
        if let Err(err) = fs::remove_file(output) {
            warn!("Could not remove partial output {}: {err}", output.display());
        }
    }
}

/// What happened to the songs of a single archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Songs that were encoded
    pub converted: usize,

    /// Songs that already had a non-empty output
    pub skipped: usize,

    /// Songs that failed to encode
    pub failed: usize,
}

/// What happened to a whole batch of archives
#[derive(Debug, Default)]
pub struct Summary {
    /// Songs that were encoded
    pub converted: usize,

    /// Songs that already had a non-empty output
    pub skipped: usize,

    /// Songs that failed to encode (in archives that were processed to the end)
    pub failed: usize,

    /// Archives that could not be processed
    pub failures: Vec<(PathBuf, ConvertError)>,

    /// Was the batch cut short by Ctrl-C?
    pub interrupted: bool,
}

impl Summary {
    fn add(&mut self, report: &Report) {
        self.converted += report.converted;
        self.skipped += report.skipped;
        self.failed += report.failed;
    }

    /// Did every song of every archive end up converted?
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed == 0 && self.failures.is_empty()
    }
}

/// Errors that might occur converting an archive
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The worker pool could not be set up
    #[error("Could not start the worker pool")]
    Pool(#[from] ThreadPoolBuildError),

    /// The archive could not be extracted
    #[error("Could not extract the archive")]
    Extract(#[from] ExtractError),

    /// The extracted files could not be inspected
    #[error("Could not inspect the extracted files")]
    Inspect(#[from] ToolError),

    /// A song failed to encode
    #[error("Could not convert to {}", .output.display())]
    Encode {
        output: PathBuf,
        #[source]
        source: ToolError,
    },
}
