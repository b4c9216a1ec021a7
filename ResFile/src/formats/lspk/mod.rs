//! SPDX-FileCopyrightText: 2025 CyberDeco, 2015 Norbyte (LSLib, MIT), 2023 saghm (xiba, Apache-2.0)
//!
//! SPDX-License-Identifier: MIT AND Apache-2.0
//!
//! LSPK PAK archives (Larian Studios, versions 15-18)
//!
//! Large archives are split into parts: `Game.pak` holds the file table and
//! `Game_1.pak`, `Game_2.pak`, ... hold the rest of the data. Entries in
//! part 0 live in the archive's own stream; entries in other parts are
//! opened from their part file next to the main archive.

mod reader;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{ArchiveBackend, ArchiveFormat, Catalog, ProbeContext};
use crate::entry::{CompressionMethod, Entry, EntryFlags};
use crate::error::{Error, Result};
use crate::io::EntryReader;
use crate::message::MessageLevel;
use crate::names::FallbackCodepage;

pub(crate) const FORMAT: &str = "lspk";

/// LSPK magic bytes
pub const MAGIC: [u8; 4] = [b'L', b'S', b'P', b'K'];

/// Minimum supported PAK version
pub const MIN_VERSION: u32 = 15;

/// Maximum supported PAK version
pub const MAX_VERSION: u32 = 18;

/// Length of file path in table entry
pub const PATH_LENGTH: usize = 256;

/// Size of a decompressed table entry
pub const TABLE_ENTRY_SIZE: usize = 272;

/// Parse compression method from the low nibble of the flags byte
fn compression_from_flags(flags: u8) -> Option<CompressionMethod> {
    match flags & 0x0F {
        0 => Some(CompressionMethod::Stored),
        1 => Some(CompressionMethod::Zlib),
        2 => Some(CompressionMethod::Lz4),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lspk;

impl ArchiveFormat for Lspk {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        if ctx.stream_len < 16 {
            return Ok(None);
        }
        let Some(header) = reader::read_header(ctx.stream)? else {
            return Ok(None);
        };
        let footer = reader::read_footer(ctx.stream, &header)?;
        let table = reader::read_file_table(ctx.stream, &footer, ctx.stream_len)?;
        tracing::debug!(
            "LSPK v{} with {} files, footer at {}",
            header.version,
            footer.num_files,
            header.footer_offset
        );

        let mut entries = Vec::with_capacity(table.len());
        for record in table {
            let name = ctx.name(&record.path, FallbackCodepage::Placeholder);
            let Some(method) = compression_from_flags(record.flags) else {
                ctx.message(
                    MessageLevel::Warning,
                    &format!(
                        "{}: '{name}' uses unsupported compression flags {:#04x}.",
                        ctx.file_name, record.flags
                    ),
                );
                continue;
            };

            // Stored or empty entries are read as-is, compressed size included.
            let entry = if method == CompressionMethod::Stored || record.size_decompressed == 0 {
                Entry::new(name, record.offset, u64::from(record.size_compressed))
            } else {
                Entry::new(name, record.offset, u64::from(record.size_decompressed))
                    .with_compression(method, u64::from(record.size_compressed))
            };
            entries.push(
                entry
                    .with_flags(EntryFlags::FULLPATH)
                    .with_resource_id(u32::from(record.archive_part)),
            );
        }

        let backend = LspkBackend {
            pak_path: ctx.path.map(Path::to_path_buf),
            file_name: ctx.file_name.to_string(),
        };
        Ok(Some(Catalog::with_backend(entries, backend)))
    }
}

/// Opens entries stored in secondary archive parts.
#[derive(Debug, Clone)]
pub struct LspkBackend {
    /// Base path for the main PAK file (used to find part files)
    pak_path: Option<PathBuf>,
    file_name: String,
}

impl LspkBackend {
    /// Get the path for a specific archive part
    fn get_part_path(&self, part: u8) -> Option<PathBuf> {
        let base_path = self.pak_path.as_ref()?;
        if part == 0 {
            return Some(base_path.clone());
        }

        let stem = base_path.file_stem()?.to_str()?;
        let ext = base_path.extension()?.to_str()?;
        let parent = base_path.parent()?;

        Some(parent.join(format!("{stem}_{part}.{ext}")))
    }

    fn open_part(&self, part: u8, entry: &Entry) -> Result<EntryReader> {
        let part_path = self.get_part_path(part).ok_or_else(|| Error::NoBackingFile {
            name: self.file_name.clone(),
        })?;
        if !part_path.exists() {
            return Err(Error::ArchivePartMissing { path: part_path });
        }

        tracing::trace!("opening '{}' from {}", entry.name, part_path.display());
        let file = BufReader::new(File::open(&part_path)?);
        EntryReader::open(Box::new(file), entry)
    }
}

impl ArchiveBackend for LspkBackend {
    fn open_entry(&self, entry: &Entry) -> Option<Result<EntryReader>> {
        let part = u8::try_from(entry.resource_id).ok()?;
        if part == 0 {
            return None;
        }
        Some(self.open_part(part, entry))
    }
}

/// Assemble an LSPK v18 image. Files are `(path, stored bytes, flags,
/// decompressed size, part)`; part 0 data is laid out after the header.
#[cfg(test)]
pub(crate) fn build(files: &[(&str, &[u8], u8, u32, u8)]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut table = Vec::new();
    let mut part_offsets = std::collections::HashMap::new();
    for (path, bytes, flags, size, part) in files {
        let offset = if *part == 0 {
            let at = 16 + data.len() as u64;
            data.extend_from_slice(bytes);
            at
        } else {
            let next = part_offsets.entry(*part).or_insert(0u64);
            let at = *next;
            *next += bytes.len() as u64;
            at
        };
        let mut record = vec![0u8; TABLE_ENTRY_SIZE];
        record[..path.len()].copy_from_slice(path.as_bytes());
        record[256..262].copy_from_slice(&offset.to_le_bytes()[..6]);
        record[262] = *part;
        record[263] = *flags;
        record[264..268].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        record[268..272].copy_from_slice(&size.to_le_bytes());
        table.extend_from_slice(&record);
    }

    let compressed = lz4_flex::block::compress(&table);
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&18u32.to_le_bytes());
    out.extend_from_slice(&(16 + data.len() as u64).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&(files.len() as u32).to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{names, probe_bytes};

    #[test]
    fn test_reads_file_table() {
        let text = b"<save/>".repeat(20);
        let packed = lz4_flex::block::compress(&text);
        let bytes = build(&[
            ("Mods/Gustav/meta.lsx", b"<meta/>", 0, 0, 0),
            ("Public/Game/Stats.txt", &packed, 2, text.len() as u32, 0),
        ]);
        let catalog = probe_bytes(&Lspk, "Gustav.pak", bytes).unwrap().unwrap();

        assert_eq!(names(&catalog), ["mods/gustav/meta.lsx", "public/game/stats.txt"]);
        let stored = &catalog.entries[0];
        assert_eq!(stored.method, CompressionMethod::Stored);
        assert_eq!((stored.position(), stored.length), (16, 7));
        let lz4 = &catalog.entries[1];
        assert_eq!(lz4.method, CompressionMethod::Lz4);
        assert_eq!(lz4.length, text.len() as u64);
        assert_eq!(lz4.compressed_size, packed.len() as u64);
        assert!(lz4.has_full_path());
    }

    #[test]
    fn test_unknown_compression_is_skipped() {
        let bytes = build(&[("a.txt", b"a", 0x03, 1, 0), ("b.txt", b"b", 0, 0, 0)]);
        let catalog = probe_bytes(&Lspk, "x.pak", bytes).unwrap().unwrap();
        assert_eq!(names(&catalog), ["b.txt"]);
    }

    #[test]
    fn test_part_path() {
        let backend = LspkBackend {
            pak_path: Some(PathBuf::from("/data/Textures.pak")),
            file_name: "Textures.pak".to_string(),
        };
        assert_eq!(backend.get_part_path(0), Some(PathBuf::from("/data/Textures.pak")));
        assert_eq!(backend.get_part_path(3), Some(PathBuf::from("/data/Textures_3.pak")));
    }

    #[test]
    fn test_part_zero_uses_shared_stream() {
        let bytes = build(&[("a.txt", b"a", 0, 0, 0), ("b.txt", b"b", 0, 0, 1)]);
        let catalog = probe_bytes(&Lspk, "x.pak", bytes).unwrap().unwrap();

        assert!(catalog.backend.open_entry(&catalog.entries[0]).is_none());
        // No path on disk, so the part cannot be located.
        assert!(matches!(
            catalog.backend.open_entry(&catalog.entries[1]),
            Some(Err(Error::NoBackingFile { .. }))
        ));
    }

    #[test]
    fn test_missing_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LspkBackend {
            pak_path: Some(dir.path().join("Game.pak")),
            file_name: "Game.pak".to_string(),
        };
        let entry = Entry::new(std::rc::Rc::from("a.txt"), 0, 1).with_resource_id(1);
        assert!(matches!(
            backend.open_entry(&entry),
            Some(Err(Error::ArchivePartMissing { .. }))
        ));
    }
}
