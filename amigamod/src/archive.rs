//! Extracting archives and finding the playable modules inside

use crate::{
    info::ModuleInfo,
    toolchain::{ToolError, Toolchain},
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// The contents of an archive, extracted into a temporary folder
///
/// The folder (and anything left inside it) is removed when the [`Extraction`] is dropped.
pub struct Extraction {
    dir: TempDir,
}

impl Extraction {
    /// Extract an archive into a fresh temporary folder
    pub fn new(toolchain: &Toolchain, archive: &Path) -> Result<Self, ExtractError> {
        let dir = TempDir::new().map_err(ExtractError::TempDir)?;
        toolchain.extract(archive, dir.path())?;

        Ok(Self { dir })
    }

    /// The folder the archive was extracted into
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Go over all extracted files and return those UADE can play
    ///
    /// Files UADE rejects are deleted straight away. Files it accepts but reports no subsongs
    /// for are left alone, and not returned. Only failing to run UADE at all is an error.
    pub fn modules(&self, toolchain: &Toolchain) -> Result<Vec<Module>, ToolError> {
        let mut modules = Vec::new();

        let files = WalkDir::new(self.path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file());

        for entry in files {
            let path = entry.into_path();

            match toolchain.info(&path) {
                Ok(info) => {
                    if let Some(subsongs) = info.subsongs {
                        info!("File: {} has {} subsongs", path.display(), subsongs.len());
                        modules.push(Module { path, info });
                    }
                }
                Err(err @ ToolError::Spawn { .. }) => return Err(err),
                Err(err) => {
                    warn!(
                        "Skipping {} - not a valid music file for uade123 ({err})",
                        path.display()
                    );
                    remove(&path);
                }
            }
        }

        Ok(modules)
    }

    /// Express a path inside the extraction relative to its root
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(self.path()).unwrap_or(path)
    }
}

/// A playable file extracted from an archive
#[derive(Debug, Clone)]
pub struct Module {
    /// Where the module was extracted to
    pub path: PathBuf,

    /// What UADE reported about the module
    pub info: ModuleInfo,
}

impl Module {
    /// The module name, falling back to the file name when UADE did not report one
    pub fn name(&self) -> String {
        match &self.info.name {
            Some(name) => name.clone(),
            None => self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// The number of subsongs in the module
    pub fn subsong_count(&self) -> usize {
        self.info.subsongs.map(|subsongs| subsongs.len()).unwrap_or(0)
    }

    /// Every subsong of this module, as a unit of work
    pub fn tasks(&self) -> impl Iterator<Item = Task<'_>> + '_ {
        self.info
            .subsongs
            .into_iter()
            .flatten()
            .map(move |subsong| Task {
                module: self,
                subsong,
            })
    }

    /// Delete the extracted file, now that it is no longer needed
    pub fn remove(&self) {
        remove(&self.path);
    }
}

/// A single subsong of a [`Module`]
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    /// The module the subsong belongs to
    pub module: &'a Module,

    /// The subsong number, as understood by `uade123 -s`
    pub subsong: u32,
}

fn remove(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {}: {err}", path.display());
        }
    }
}

/// Errors that might occur extracting an archive
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The temporary folder to extract into could not be created
    #[error("Could not create a temporary folder")]
    TempDir(#[source] io::Error),

    /// The extractor failed
    #[error("Extraction failed")]
    Extract(#[from] ToolError),
}
