//! ZIP archives (PKZIP, including ZIP64)
//!
//! The directory comes from the central directory found through the
//! end-of-central-directory record. Central records only point at each
//! member's local header, whose variable-length name and extra field sit in
//! front of the data, so data offsets are resolved on first access.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use super::{ArchiveBackend, ArchiveFormat, Catalog, ProbeContext};
use crate::entry::{CompressionMethod, Entry, EntryFlags};
use crate::error::{Error, Result};
use crate::io::ReadSeek;
use crate::message::MessageLevel;
use crate::names::FallbackCodepage;

const FORMAT: &str = "zip";

const LOCAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
const CENTRAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x01\x02";
const EOCD_SIGNATURE: [u8; 4] = *b"PK\x05\x06";
const ZIP64_EOCD_SIGNATURE: [u8; 4] = *b"PK\x06\x06";
const ZIP64_LOCATOR_SIGNATURE: [u8; 4] = *b"PK\x06\x07";

const LOCAL_HEADER_SIZE: u64 = 30;
const CENTRAL_HEADER_SIZE: usize = 46;
const EOCD_SIZE: usize = 22;
const ZIP64_LOCATOR_SIZE: u64 = 20;
const ZIP64_EOCD_SIZE: usize = 56;
const MAX_COMMENT: usize = 65535;

const ZIP64_EXTRA_ID: u16 = 0x0001;

const FLAG_ENCRYPTED: u16 = 1 << 0;
const FLAG_UTF8: u16 = 1 << 11;

#[derive(Debug, Clone, Copy, Default)]
pub struct Zip;

/// Where the central directory is and how many records it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CentralDirectory {
    offset: u64,
    size: u64,
    entries: u64,
}

impl ArchiveFormat for Zip {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        if ctx.stream_len < EOCD_SIZE as u64 {
            return Ok(None);
        }
        let mut head = [0u8; 4];
        ctx.stream.read_exact(&mut head)?;
        if head != LOCAL_HEADER_SIGNATURE && head != EOCD_SIGNATURE {
            return Ok(None);
        }

        let central = find_central_directory(ctx)?;
        if central.offset.checked_add(central.size).is_none_or(|end| end > ctx.stream_len) {
            return Err(malformed(format!(
                "central directory ({} bytes at {}) runs past end of stream",
                central.size, central.offset
            )));
        }
        if central.entries.saturating_mul(CENTRAL_HEADER_SIZE as u64) > central.size {
            return Err(Error::TooManyEntries {
                format: FORMAT,
                count: central.entries,
            });
        }

        let mut records = vec![0u8; central.size as usize];
        ctx.stream.seek(SeekFrom::Start(central.offset))?;
        ctx.stream.read_exact(&mut records)?;

        let entries = read_central_records(ctx, &records, central.entries)?;
        Ok(Some(Catalog::with_backend(entries, ZipBackend)))
    }
}

fn malformed(message: String) -> Error {
    Error::MalformedArchive { format: FORMAT, message }
}

/// Scan backwards from the end of the stream for the end-of-central-directory
/// record, skipping over a trailing comment of up to 64 KiB.
fn find_central_directory(ctx: &mut ProbeContext<'_>) -> Result<CentralDirectory> {
    let tail_len = ctx.stream_len.min((MAX_COMMENT + EOCD_SIZE) as u64);
    let tail_start = ctx.stream_len - tail_len;
    let mut tail = vec![0u8; tail_len as usize];
    ctx.stream.seek(SeekFrom::Start(tail_start))?;
    ctx.stream.read_exact(&mut tail)?;

    let eocd_at = (0..=tail.len() - EOCD_SIZE)
        .rev()
        .find(|&i| tail[i..i + 4] == EOCD_SIGNATURE)
        .ok_or_else(|| malformed("end of central directory not found".to_string()))?;
    let eocd = &tail[eocd_at..];

    let central = CentralDirectory {
        entries: u64::from(LittleEndian::read_u16(&eocd[10..12])),
        size: u64::from(LittleEndian::read_u32(&eocd[12..16])),
        offset: u64::from(LittleEndian::read_u32(&eocd[16..20])),
    };
    if central.entries != 0xFFFF && central.size != 0xFFFF_FFFF && central.offset != 0xFFFF_FFFF {
        return Ok(central);
    }

    read_zip64_end(ctx, tail_start + eocd_at as u64)
}

/// Follow the ZIP64 locator that sits right in front of the classic record.
fn read_zip64_end(ctx: &mut ProbeContext<'_>, eocd_offset: u64) -> Result<CentralDirectory> {
    let locator_at = eocd_offset
        .checked_sub(ZIP64_LOCATOR_SIZE)
        .ok_or_else(|| malformed("ZIP64 locator missing".to_string()))?;
    let mut locator = [0u8; ZIP64_LOCATOR_SIZE as usize];
    ctx.stream.seek(SeekFrom::Start(locator_at))?;
    ctx.stream.read_exact(&mut locator)?;
    if locator[..4] != ZIP64_LOCATOR_SIGNATURE {
        return Err(malformed("ZIP64 locator missing".to_string()));
    }

    let record_at = LittleEndian::read_u64(&locator[8..16]);
    if record_at.saturating_add(ZIP64_EOCD_SIZE as u64) > ctx.stream_len {
        return Err(malformed(format!("ZIP64 end record offset {record_at} out of range")));
    }
    let mut record = [0u8; ZIP64_EOCD_SIZE];
    ctx.stream.seek(SeekFrom::Start(record_at))?;
    ctx.stream.read_exact(&mut record)?;
    if record[..4] != ZIP64_EOCD_SIGNATURE {
        return Err(malformed("bad ZIP64 end record signature".to_string()));
    }

    Ok(CentralDirectory {
        entries: LittleEndian::read_u64(&record[32..40]),
        size: LittleEndian::read_u64(&record[40..48]),
        offset: LittleEndian::read_u64(&record[48..56]),
    })
}

fn read_central_records(ctx: &ProbeContext<'_>, records: &[u8], count: u64) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(count as usize);
    let mut pos = 0usize;

    for index in 0..count {
        let header = records
            .get(pos..pos + CENTRAL_HEADER_SIZE)
            .filter(|h| h[..4] == CENTRAL_HEADER_SIGNATURE)
            .ok_or_else(|| malformed(format!("bad central directory record {index}")))?;

        let flags = LittleEndian::read_u16(&header[8..10]);
        let method = LittleEndian::read_u16(&header[10..12]);
        let mut compressed_size = u64::from(LittleEndian::read_u32(&header[20..24]));
        let mut size = u64::from(LittleEndian::read_u32(&header[24..28]));
        let name_len = usize::from(LittleEndian::read_u16(&header[28..30]));
        let extra_len = usize::from(LittleEndian::read_u16(&header[30..32]));
        let comment_len = usize::from(LittleEndian::read_u16(&header[32..34]));
        let mut local_offset = u64::from(LittleEndian::read_u32(&header[42..46]));

        let name_start = pos + CENTRAL_HEADER_SIZE;
        let extra_start = name_start + name_len;
        let next = extra_start + extra_len + comment_len;
        if next > records.len() {
            return Err(malformed(format!("central directory record {index} is truncated")));
        }
        let raw_name = &records[name_start..extra_start];
        let extra = &records[extra_start..extra_start + extra_len];
        pos = next;

        apply_zip64_extra(extra, &mut size, &mut compressed_size, &mut local_offset);

        if raw_name.last().is_some_and(|&b| b == b'/' || b == b'\\') {
            continue;
        }

        let fallback = if flags & FLAG_UTF8 != 0 {
            FallbackCodepage::Placeholder
        } else {
            FallbackCodepage::Ibm437
        };
        let name = ctx.name(raw_name, fallback);

        if flags & FLAG_ENCRYPTED != 0 {
            ctx.message(
                MessageLevel::Warning,
                &format!("{}: '{name}' is encrypted. Encryption is not supported.", ctx.file_name),
            );
            continue;
        }
        let Some(method) = CompressionMethod::from_zip(method) else {
            ctx.message(
                MessageLevel::Warning,
                &format!("{}: '{name}' uses unsupported compression method {method}.", ctx.file_name),
            );
            continue;
        };
        if method == CompressionMethod::Stored && compressed_size != size {
            tracing::debug!("stored member '{name}' has mismatched sizes {compressed_size}/{size}");
        }

        entries.push(
            Entry::new(name, local_offset, size)
                .with_compression(method, compressed_size)
                .with_deferred_address()
                .with_flags(EntryFlags::FULLPATH)
                .with_resource_id(index as u32),
        );
    }

    Ok(entries)
}

/// Replace saturated 32-bit fields with their ZIP64 values. The extra field
/// only carries the fields that overflowed, in this fixed order.
fn apply_zip64_extra(mut extra: &[u8], size: &mut u64, compressed_size: &mut u64, offset: &mut u64) {
    while extra.len() >= 4 {
        let id = LittleEndian::read_u16(&extra[0..2]);
        let len = usize::from(LittleEndian::read_u16(&extra[2..4]));
        let Some(body) = extra.get(4..4 + len) else {
            return;
        };

        if id == ZIP64_EXTRA_ID {
            let mut fields = body.chunks_exact(8).map(LittleEndian::read_u64);
            for field in [size, compressed_size, offset] {
                if *field == 0xFFFF_FFFF {
                    match fields.next() {
                        Some(value) => *field = value,
                        None => return,
                    }
                }
            }
            return;
        }
        extra = &extra[4 + len..];
    }
}

/// Resolves member data offsets from local file headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBackend;

impl ArchiveBackend for ZipBackend {
    fn resolve_address(&self, stream: &mut dyn ReadSeek, entry: &Entry, deferred: u64) -> Result<u64> {
        let mut header = [0u8; LOCAL_HEADER_SIZE as usize];
        stream.seek(SeekFrom::Start(deferred))?;
        stream.read_exact(&mut header).map_err(|e| Error::AddressResolution {
            name: entry.name.to_string(),
            message: format!("local header at {deferred}: {e}"),
        })?;
        if header[..4] != LOCAL_HEADER_SIGNATURE {
            return Err(Error::AddressResolution {
                name: entry.name.to_string(),
                message: format!("no local header at {deferred}"),
            });
        }

        let name_len = u64::from(LittleEndian::read_u16(&header[26..28]));
        let extra_len = u64::from(LittleEndian::read_u16(&header[28..30]));
        Ok(deferred + LOCAL_HEADER_SIZE + name_len + extra_len)
    }
}
