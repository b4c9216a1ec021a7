//! CLI command for archive summaries

use crate::ResourceFile;

pub fn execute(archive: &ResourceFile) -> anyhow::Result<()> {
    let entries = archive.entries();
    let purged = entries.iter().filter(|e| e.is_purged()).count();
    let compressed = entries.iter().filter(|e| e.is_compressed()).count();

    println!("File:       {}", archive.file_name());
    println!("Format:     {}", archive.format_name());
    println!("Entries:    {} ({purged} filtered out, {compressed} compressed)", entries.len());
    println!("Identity:   {}", archive.hash());

    let embedded: Vec<&str> = entries.iter().filter(|e| e.is_embedded()).map(|e| &*e.name).collect();
    if !embedded.is_empty() {
        println!("Embedded archives:");
        for name in embedded {
            println!("  {name}");
        }
    }
    Ok(())
}
