//! Finding `.lha` archives on disk

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// The file extension of LHA archives (compared case-insensitively)
pub const ARCHIVE_EXTENSION: &str = "lha";

/// Directories ending with this suffix are left alone by the recursive converter
pub const SKIP_SUFFIX: &str = "-skipthis";

/// How [`find_archives()`] should treat directories
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Walk directories recursively instead of only listing their direct children
    pub recursive: bool,

    /// Directories whose name ends with this suffix are not searched
    pub skip_suffix: Option<String>,
}

impl DiscoverOptions {
    /// Only list the direct children of directories, without skipping anything
    pub fn flat() -> Self {
        Self::default()
    }

    /// Walk directories recursively, pruning those ending in [`SKIP_SUFFIX`]
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            skip_suffix: Some(SKIP_SUFFIX.to_owned()),
        }
    }

    fn is_skipped(&self, name: &OsStr) -> bool {
        match &self.skip_suffix {
            Some(suffix) => name.to_string_lossy().ends_with(suffix.as_str()),
            None => false,
        }
    }
}

/// Collect all archives among a set of files and directories
///
/// Files are accepted as-is when they carry the `.lha` extension. Directories are searched
/// for archives, either recursively or one level deep depending on `options`. Any other
/// path is an error, and no archives are returned at all in that case.
pub fn find_archives<I>(paths: I, options: &DiscoverOptions) -> Result<Vec<PathBuf>, DiscoverError>
where
    I: IntoIterator,
    <I as IntoIterator>::Item: AsRef<Path>,
{
    let mut archives = Vec::new();

    for path in paths {
        let path = path.as_ref();

        if path.is_dir() {
            if path.file_name().is_some_and(|name| options.is_skipped(name)) {
                continue;
            }

            archives.extend(walk(path, options));
        } else if path.is_file() && is_archive(path) {
            archives.push(path.to_owned());
        } else {
            return Err(DiscoverError::InvalidPath(path.to_owned()));
        }
    }

    Ok(archives)
}

fn walk<'a>(root: &Path, options: &'a DiscoverOptions) -> impl Iterator<Item = PathBuf> + 'a {
    let mut walk_dir = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !options.recursive {
        walk_dir = walk_dir.max_depth(1);
    }

    walk_dir
        .into_iter()
        .filter_entry(move |entry| !(entry.file_type().is_dir() && options.is_skipped(entry.file_name())))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Could not read directory entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_archive(entry.path()))
        .map(DirEntry::into_path)
}

/// Does the path carry the `.lha` extension (in any casing)?
pub fn is_archive(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION),
        None => false,
    }
}

/// Errors that might be returned from [`find_archives()`]
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// The path exists as neither a directory nor an `.lha` file
    #[error("Invalid path: {} is neither a directory nor an .lha file", .0.display())]
    InvalidPath(PathBuf),
}
