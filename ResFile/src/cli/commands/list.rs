//! CLI command for listing archive contents

use serde::Serialize;

use crate::{Entry, EntryFlags, ResourceFile};

/// One row of the JSON listing
#[derive(Debug, Serialize)]
struct EntryInfo<'a> {
    index: usize,
    name: &'a str,
    length: u64,
    compressed_size: u64,
    method: &'static str,
    flags: Vec<&'static str>,
}

impl<'a> EntryInfo<'a> {
    fn new(index: usize, entry: &'a Entry) -> Self {
        Self {
            index,
            name: &entry.name,
            length: entry.length,
            compressed_size: entry.compressed_size,
            method: entry.method.as_str(),
            flags: flag_names(entry.flags()),
        }
    }
}

fn flag_names(flags: EntryFlags) -> Vec<&'static str> {
    [
        (EntryFlags::FULLPATH, "fullpath"),
        (EntryFlags::COMPRESSED, "compressed"),
        (EntryFlags::NEEDS_ADDRESS, "needs-address"),
        (EntryFlags::EMBEDDED, "embedded"),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .map(|(_, name)| name)
    .collect()
}

/// Format byte size for human-readable output
fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(archive: &ResourceFile, detailed: bool, json: bool) -> anyhow::Result<()> {
    // Purged entries keep their slot but have no name
    let visible: Vec<(usize, &Entry)> = archive
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_purged())
        .collect();

    if json {
        let rows: Vec<EntryInfo<'_>> = visible.iter().map(|&(i, e)| EntryInfo::new(i, e)).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if !detailed {
        for (_, entry) in &visible {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!("{:>10}  {:>10}  {:>8}  {:<5}  NAME", "SIZE", "COMPRESSED", "METHOD", "FLAGS");
    for (_, entry) in &visible {
        let flags = entry.flags();
        let marks: String = [
            (EntryFlags::FULLPATH, 'F'),
            (EntryFlags::COMPRESSED, 'C'),
            (EntryFlags::NEEDS_ADDRESS, 'A'),
            (EntryFlags::EMBEDDED, 'E'),
        ]
        .iter()
        .map(|(flag, mark)| if flags.contains(*flag) { *mark } else { '-' })
        .collect();

        println!(
            "{:>10}  {:>10}  {:>8}  {marks:<5}  {}",
            format_size(entry.length),
            format_size(entry.compressed_size),
            entry.method,
            entry.name
        );
    }

    let total: u64 = visible.iter().map(|(_, e)| e.length).sum();
    println!();
    println!("{} entries, {} total ({})", visible.len(), format_size(total), archive.format_name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_names() {
        let flags = EntryFlags::FULLPATH | EntryFlags::EMBEDDED;
        assert_eq!(flag_names(flags), ["fullpath", "embedded"]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512");
        assert_eq!(format_size(2048), "2.0K");
        assert_eq!(format_size(3 * 1_048_576), "3.0M");
    }
}
