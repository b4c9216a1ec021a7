//! Prefix-range lookup over a sorted directory

use std::cmp::Ordering;
use std::ops::Range;

use crate::entry::Entry;

/// Compare the first `prefix.len()` bytes of `name` against `prefix`,
/// ignoring ASCII case. A name that ends early sorts before the prefix.
pub(crate) fn compare_prefix(name: &str, prefix: &str) -> Ordering {
    let name = name.as_bytes();
    for (i, &p) in prefix.as_bytes().iter().enumerate() {
        let Some(&n) = name.get(i) else {
            return Ordering::Less;
        };
        match n.to_ascii_lowercase().cmp(&p.to_ascii_lowercase()) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Find the contiguous run of entries in `entries[..max_entry]` whose names
/// start with `prefix`.
///
/// `entries` must be sorted by name. Returns `None` when nothing matches.
pub fn find_prefix_range(entries: &[Entry], prefix: &str, max_entry: usize) -> Option<Range<usize>> {
    let max_entry = max_entry.min(entries.len());

    // Indices below are 1-based so that `hi = mid - 1` cannot wrap when the
    // match begins at the first entry.
    let cmp_at = |i: usize| compare_prefix(&entries[i - 1].name, prefix);

    // Any match at all.
    let (mut lo, mut hi) = (1, max_entry);
    let mut mid = 1;
    let mut found = false;
    while lo <= hi {
        mid = lo + (hi - lo) / 2;
        match cmp_at(mid) {
            Ordering::Equal => {
                found = true;
                break;
            }
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid - 1,
        }
    }
    if !found {
        return None;
    }
    let inside = mid;

    // First match: go left on matches, right on misses.
    let (mut lo, mut hi) = (1, inside);
    let mut cmp = Ordering::Equal;
    while lo <= hi {
        mid = lo + (hi - lo) / 2;
        cmp = cmp_at(mid);
        if cmp == Ordering::Equal {
            hi = mid - 1;
        } else {
            lo = mid + 1;
        }
    }
    let start = mid + usize::from(cmp != Ordering::Equal) - 1;

    // One past the last match: go right on matches, left on misses.
    let (mut lo, mut hi) = (inside, max_entry);
    while lo <= hi {
        mid = lo + (hi - lo) / 2;
        cmp = cmp_at(mid);
        if cmp == Ordering::Equal {
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    let end = mid - usize::from(cmp != Ordering::Equal);

    Some(start..end)
}
