//! The entry directory of an archive
//!
//! Format probes fill a [`Directory`] in whatever order the archive stores
//! its entries. Once populated, [`Directory::post_process`] sorts full-path
//! directories by name and applies the `filter/<tag>/` rules from a
//! [`FilterInfo`](crate::FilterInfo).

mod filter;
mod search;

use std::ops::Range;

pub use search::find_prefix_range;

use crate::entry::Entry;
use crate::names::{FallbackCodepage, normalize_name};

/// Ordered entries of one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<Entry>,
    processed: bool,
}

impl Directory {
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            processed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Whether [`post_process`](Self::post_process) has already run.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Sort by canonical name, byte-wise. The sort is stable, so duplicate
    /// names keep their archive order.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    }

    /// Entries in `[0, max_entry)` whose names start with `prefix`.
    pub fn find_prefix_range(&self, prefix: &str, max_entry: usize) -> Option<Range<usize>> {
        find_prefix_range(&self.entries, prefix, max_entry)
    }

    /// Linear, case-insensitive exact lookup. Purged entries never match.
    pub fn find_entry(&self, name: &str) -> Option<usize> {
        let wanted = normalize_name(name.as_bytes(), FallbackCodepage::Placeholder);
        if wanted.is_empty() {
            return None;
        }
        self.entries.iter().position(|e| *e.name == *wanted)
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
