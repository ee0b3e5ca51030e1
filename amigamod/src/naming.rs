//! Output filenames for converted subsongs

use std::path::{Path, PathBuf};

/// The extension of everything the encoder writes
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Strip a name down to characters that are safe in filenames
///
/// Alphanumerics, `-`, `_` and spaces are kept, and spaces are then replaced by underscores.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Name outputs after the archive they came from, placed right next to it
///
/// A single-song archive becomes `<archive>.mp3`. Otherwise every song is numbered by its
/// position within the archive: `<archive>_1.mp3`, `<archive>_2.mp3`, and so on.
#[derive(Debug, Clone)]
pub struct ArchiveNaming {
    folder: PathBuf,
    base: String,
    total: usize,
}

impl ArchiveNaming {
    /// Set up naming for an archive that produces `total` songs
    pub fn new(archive: &Path, total: usize) -> Self {
        let folder = archive.parent().map(Path::to_owned).unwrap_or_default();
        let stem = archive
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();

        Self {
            folder,
            base: sanitize(&stem),
            total,
        }
    }

    /// The output path for the song at `index` (0-based) among all songs of the archive
    pub fn path(&self, index: usize) -> PathBuf {
        let filename = if self.total == 1 {
            format!("{}.{OUTPUT_EXTENSION}", self.base)
        } else {
            format!("{}_{}.{OUTPUT_EXTENSION}", self.base, index + 1)
        };

        self.folder.join(filename)
    }
}

/// Name outputs after the module name UADE reports, placed in a chosen folder
///
/// Modules with several subsongs get the subsong number appended: `<module>_sub<n>.mp3`.
#[derive(Debug, Clone)]
pub struct ModuleNaming {
    folder: PathBuf,
}

impl ModuleNaming {
    /// Place every output in `folder`
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// The output path for `subsong` of a module
    ///
    /// `name` is the module name, or the file name of the module when it has none.
    pub fn path(&self, name: &str, subsong: u32, subsong_count: usize) -> PathBuf {
        let base = sanitize(name);
        let filename = if subsong_count > 1 {
            format!("{base}_sub{subsong}.{OUTPUT_EXTENSION}")
        } else {
            format!("{base}.{OUTPUT_EXTENSION}")
        };

        self.folder.join(filename)
    }
}
