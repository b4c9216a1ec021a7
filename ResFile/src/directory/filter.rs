//! Sorting and `filter/` handling applied after a directory is populated

use std::cmp::Ordering;

use super::Directory;
use super::search::compare_prefix;
use crate::config::FilterInfo;
use crate::pool::PoolHandle;

const FILTER_ROOT: &str = "filter/";

impl Directory {
    /// Sort the directory and apply filter rules.
    ///
    /// Only directories whose entries carry full paths are touched; other
    /// formats keep their stored order. Entries under `filter/<tag>/` for every
    /// dot-prefix of every rule are renamed without that prefix and moved to
    /// the end, after ordinary content, in rule order. Anything still under
    /// `filter/` afterwards is purged.
    ///
    /// Runs at most once per directory.
    pub fn post_process(&mut self, filter: Option<&FilterInfo>, pool: &PoolHandle) {
        if self.processed {
            return;
        }
        self.processed = true;

        if self.entries.len() < 2 || !self.entries[0].has_full_path() {
            return;
        }

        self.sort();
        let Some(filter) = filter else {
            return;
        };

        // Shrink the searched range after every pass so relocated entries
        // are never filtered twice.
        let mut max = self.entries.len();
        for rule in &filter.game_type_filters {
            for (dot, _) in rule.match_indices('.') {
                max -= self.filter_entries(&rule[..dot], max, pool);
            }
            max -= self.filter_entries(rule, max, pool);
        }

        self.junk_leftover_filters(max, pool);
    }

    /// Move entries in `[0, max)` named `filter/<filter_name>/*` to the end of
    /// the directory, stripping the prefix. Returns how many moved.
    pub fn filter_entries(&mut self, filter_name: &str, max: usize, pool: &PoolHandle) -> usize {
        if filter_name.is_empty() {
            return 0;
        }
        let prefix = format!("{FILTER_ROOT}{filter_name}/");
        let Some(range) = self.find_prefix_range(&prefix, max) else {
            return 0;
        };

        for entry in &mut self.entries[range.clone()] {
            debug_assert_eq!(compare_prefix(&entry.name, &prefix), Ordering::Equal);
            entry.name = pool.intern(&entry.name[prefix.len()..]);
        }

        // Stable partition of everything from the block onward: the block
        // lands at the very end, in order, and the rest shifts left.
        let count = range.len();
        self.entries[range.start..].rotate_left(count);

        tracing::debug!("filter '{filter_name}': moved {count} entries to the end");
        count
    }

    /// Purge entries in `[0, max)` still named `filter/*`. Their slots stay so
    /// indices remain valid, but they can no longer be found. Returns how many
    /// were purged.
    pub fn junk_leftover_filters(&mut self, max: usize, pool: &PoolHandle) -> usize {
        let Some(range) = self.find_prefix_range(FILTER_ROOT, max) else {
            return 0;
        };
        let empty = pool.intern("");
        for entry in &mut self.entries[range.clone()] {
            tracing::trace!("purging unmatched filter entry '{}'", entry.name);
            entry.name = empty.clone();
        }
        range.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, EntryFlags};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn directory(names: &[&str]) -> Directory {
        Directory::new(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    Entry::new(Rc::from(*n), i as u64 * 16, i as u64 + 1).with_flags(EntryFlags::FULLPATH)
                })
                .collect(),
        )
    }

    fn names(dir: &Directory) -> Vec<&str> {
        dir.iter().map(|e| &*e.name).collect()
    }

    fn filters(rules: &[&str]) -> FilterInfo {
        rules.iter().fold(FilterInfo::new(), |info, r| info.with_filter(*r))
    }

    #[test]
    fn test_matching_filter_is_promoted() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&["filter/doom2/foo.txt", "bar.txt"]);
        dir.post_process(Some(&filters(&["doom2"])), &pool);

        assert_eq!(names(&dir), ["bar.txt", "foo.txt"]);
        assert_eq!(dir.find_entry("foo.txt"), Some(1));
        assert_eq!(dir.find_entry("bar.txt"), Some(0));
    }

    #[test]
    fn test_unmatched_filter_is_purged() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&["filter/unknown/foo.txt", "bar.txt"]);
        dir.post_process(Some(&filters(&["doom2"])), &pool);

        assert_eq!(dir.len(), 2);
        assert_eq!(names(&dir), ["bar.txt", ""]);
        assert_eq!(dir.find_entry("foo.txt"), None);
        assert_eq!(dir.find_entry("filter/unknown/foo.txt"), None);
        assert_eq!(dir.find_entry("bar.txt"), Some(0));
    }

    #[test]
    fn test_dotted_rule_applies_every_prefix_in_order() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&[
            "filter/doom.id.doom2/map.txt",
            "filter/doom/base.txt",
            "filter/doom.id/id.txt",
            "filter/heretic/other.txt",
            "plain.txt",
        ]);
        dir.post_process(Some(&filters(&["doom.id.doom2"])), &pool);

        // General tags first, the most specific tag last so it wins on lookup.
        // The heretic entry sorted ahead of plain.txt and was purged in place.
        assert_eq!(names(&dir), ["", "plain.txt", "base.txt", "id.txt", "map.txt"]);
    }

    #[test]
    fn test_tail_follows_rule_declaration_order() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&[
            "filter/a/2.txt",
            "filter/a/1.txt",
            "filter/b/1.txt",
            "x.txt",
        ]);
        dir.post_process(Some(&filters(&["b", "a"])), &pool);

        assert_eq!(names(&dir), ["x.txt", "1.txt", "1.txt", "2.txt"]);
        // The "b" group comes first, then the sorted "a" group.
        let lengths: Vec<u64> = dir.iter().map(|e| e.length).collect();
        assert_eq!(lengths, [4, 3, 2, 1]);
    }

    #[test]
    fn test_relocation_preserves_records() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&["filter/doom2/b.txt", "a.txt", "filter/doom2/c.txt", "z.txt"]);
        let mut before: Vec<(String, u64, u64)> = dir
            .iter()
            .map(|e| {
                let stripped = e.name.strip_prefix("filter/doom2/").unwrap_or(&e.name).to_string();
                (stripped, e.length, e.position())
            })
            .collect();
        dir.post_process(Some(&filters(&["doom2"])), &pool);

        let mut after: Vec<(String, u64, u64)> =
            dir.iter().map(|e| (e.name.to_string(), e.length, e.position())).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert_eq!(names(&dir), ["a.txt", "z.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_post_process_runs_once() {
        let pool = PoolHandle::owned();
        let rules = filters(&["doom2"]);
        let mut dir = directory(&["filter/doom2/foo.txt", "filter/x/y.txt", "bar.txt", "abc.txt"]);
        dir.post_process(Some(&rules), &pool);
        let first = dir.clone();

        dir.post_process(Some(&rules), &pool);
        assert_eq!(dir, first);
        assert!(dir.is_processed());
    }

    #[test]
    fn test_same_input_gives_same_result() {
        let input = ["filter/doom2/foo.txt", "c.txt", "filter/x/y.txt", "bar.txt"];
        let rules = filters(&["doom2"]);

        let mut first = directory(&input);
        first.post_process(Some(&rules), &PoolHandle::owned());
        let mut second = directory(&input);
        second.post_process(Some(&rules), &PoolHandle::owned());

        assert_eq!(first, second);
    }

    #[test]
    fn test_no_filter_only_sorts() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&["filter/doom2/foo.txt", "b.txt", "a.txt"]);
        dir.post_process(None, &pool);
        assert_eq!(names(&dir), ["a.txt", "b.txt", "filter/doom2/foo.txt"]);
    }

    #[test]
    fn test_flat_directories_keep_order() {
        let pool = PoolHandle::owned();
        let mut dir = Directory::new(vec![
            Entry::new(Rc::from("things"), 0, 1),
            Entry::new(Rc::from("linedefs"), 1, 1),
        ]);
        dir.post_process(Some(&filters(&["doom2"])), &pool);
        assert_eq!(names(&dir), ["things", "linedefs"]);
    }

    #[test]
    fn test_empty_rule_moves_nothing() {
        let pool = PoolHandle::owned();
        let mut dir = directory(&["filter//a.txt", "b.txt"]);
        dir.sort();
        assert_eq!(dir.filter_entries("", 2, &pool), 0);
    }
}
