//! SPDX-FileCopyrightText: 2025 CyberDeco, 2015 Norbyte (LSLib, MIT), 2023 saghm (xiba, Apache-2.0)
//!
//! SPDX-License-Identifier: MIT AND Apache-2.0
//!
//! LSPK header, footer and file table parsing

use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use super::{FORMAT, MAGIC, MAX_VERSION, MIN_VERSION, PATH_LENGTH, TABLE_ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::io::ReadSeek;

/// Header of an LSPK PAK file
#[derive(Debug, Clone, Copy)]
pub(super) struct LspkHeader {
    pub version: u32,
    /// Offset to the footer from the start of the file
    pub footer_offset: u64,
}

/// Footer/metadata of an LSPK PAK file
#[derive(Debug, Clone, Copy)]
pub(super) struct LspkFooter {
    pub num_files: u32,
    /// Size of the LZ4-compressed file table that follows
    pub table_size_compressed: u32,
}

/// Entry in the file table describing a file in the PAK
#[derive(Debug, Clone)]
pub(super) struct FileTableEntry {
    /// Raw NUL-padded path bytes
    pub path: Vec<u8>,
    /// Offset of the data from the start of the archive part
    pub offset: u64,
    pub size_compressed: u32,
    pub size_decompressed: u32,
    /// Raw flags byte; the low nibble is the compression method
    pub flags: u8,
    /// Archive part number (0 = main .pak, 1+ = _1.pak, _2.pak, etc.)
    pub archive_part: u8,
}

/// Read the header, or `None` when the magic does not match.
pub(super) fn read_header(reader: &mut dyn ReadSeek) -> Result<Option<LspkHeader>> {
    reader.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Ok(None);
    }

    let version = reader.read_u32::<LittleEndian>()?;
    if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
        return Err(Error::MalformedArchive {
            format: FORMAT,
            message: format!("unsupported PAK version: {version} (supported: {MIN_VERSION}-{MAX_VERSION})"),
        });
    }

    let footer_offset = reader.read_u64::<LittleEndian>()?;
    Ok(Some(LspkHeader { version, footer_offset }))
}

/// Read the footer at the offset named by the header.
pub(super) fn read_footer(reader: &mut dyn ReadSeek, header: &LspkHeader) -> Result<LspkFooter> {
    reader.seek(SeekFrom::Start(header.footer_offset))?;
    let num_files = reader.read_u32::<LittleEndian>()?;
    let table_size_compressed = reader.read_u32::<LittleEndian>()?;
    Ok(LspkFooter {
        num_files,
        table_size_compressed,
    })
}

/// Read and decompress the file table that directly follows the footer.
pub(super) fn read_file_table(
    reader: &mut dyn ReadSeek,
    footer: &LspkFooter,
    stream_len: u64,
) -> Result<Vec<FileTableEntry>> {
    let num_files = u64::from(footer.num_files);
    if num_files == 0 {
        return Ok(Vec::new());
    }
    let table_size_compressed = u64::from(footer.table_size_compressed);

    let position = reader.stream_position()?;
    if position.saturating_add(table_size_compressed) > stream_len {
        return Err(Error::MalformedArchive {
            format: FORMAT,
            message: format!("file table of {table_size_compressed} bytes runs past end of stream"),
        });
    }
    // LZ4 cannot expand data by more than a factor of 255.
    let table_size_decompressed = num_files * TABLE_ENTRY_SIZE as u64;
    if table_size_decompressed > table_size_compressed.saturating_mul(255) {
        return Err(Error::TooManyEntries {
            format: FORMAT,
            count: num_files,
        });
    }

    let mut compressed_table = vec![0u8; table_size_compressed as usize];
    reader.read_exact(&mut compressed_table)?;

    let decompressed_table = lz4_flex::block::decompress(&compressed_table, table_size_decompressed as usize)
        .map_err(|e| Error::DecompressionError(format!("Failed to decompress file table: {e}")))?;
    if decompressed_table.len() < table_size_decompressed as usize {
        return Err(Error::MalformedArchive {
            format: FORMAT,
            message: format!(
                "file table holds {} bytes, {num_files} entries need {table_size_decompressed}",
                decompressed_table.len()
            ),
        });
    }

    Ok(decompressed_table
        .chunks_exact(TABLE_ENTRY_SIZE)
        .take(num_files as usize)
        .map(parse_file_entry)
        .collect())
}

/// Parse a single 272-byte file table entry
fn parse_file_entry(bytes: &[u8]) -> FileTableEntry {
    // Path: bytes 0-255 (NUL-terminated)
    let path = bytes[..PATH_LENGTH].to_vec();

    // Offset: bytes 256-261, stored as a 48-bit value
    let offset_low = LittleEndian::read_u32(&bytes[256..260]);
    let offset_high = LittleEndian::read_u16(&bytes[260..262]);
    let offset = u64::from(offset_low) | (u64::from(offset_high) << 32);

    FileTableEntry {
        path,
        offset,
        archive_part: bytes[262],
        flags: bytes[263],
        size_compressed: LittleEndian::read_u32(&bytes[264..268]),
        size_decompressed: LittleEndian::read_u32(&bytes[268..272]),
    }
}
