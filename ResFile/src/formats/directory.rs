//! A plain file system directory presented as an archive

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::ArchiveBackend;
use crate::entry::{Entry, EntryFlags};
use crate::error::{Error, Result};
use crate::io::EntryReader;
use crate::names::{FallbackCodepage, normalize_pooled};
use crate::pool::PoolHandle;

/// Opens each entry from its own file.
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    /// Absolute file paths, indexed by `Entry::resource_id`.
    files: Vec<PathBuf>,
}

impl DirectoryBackend {
    pub fn file_path(&self, entry: &Entry) -> Option<&Path> {
        self.files.get(entry.resource_id as usize).map(PathBuf::as_path)
    }
}

impl ArchiveBackend for DirectoryBackend {
    fn open_entry(&self, entry: &Entry) -> Option<Result<EntryReader>> {
        let path = self.file_path(entry)?;
        Some(
            File::open(path)
                .map_err(Error::from)
                .and_then(|file| EntryReader::at(Box::new(BufReader::new(file)), 0, entry)),
        )
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Collect every regular file below `root`, skipping hidden files and
/// folders.
pub(crate) fn scan_directory(root: &Path, pool: &PoolHandle) -> Result<(Vec<Entry>, DirectoryBackend)> {
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    let mut files = Vec::new();
    for dir_entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| !is_hidden(e)) {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type().is_file() {
            continue;
        }

        let path = dir_entry.path();
        let relative_path = path
            .strip_prefix(root)
            .map_err(|e| Error::WalkDirError(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        let length = dir_entry.metadata()?.len();

        let name = normalize_pooled(pool, relative_path.as_bytes(), FallbackCodepage::Placeholder);
        entries.push(
            Entry::new(name, 0, length)
                .with_flags(EntryFlags::FULLPATH)
                .with_resource_id(files.len() as u32),
        );
        files.push(path.to_path_buf());
    }

    tracing::debug!("scanned {} files below {}", entries.len(), root.display());
    Ok((entries, DirectoryBackend { files }))
}
