//! Doom WAD archives (`IWAD` / `PWAD`)
//!
//! ```text
//! header:  magic[4] num_lumps:i32 dir_offset:i32
//! record:  position:i32 size:i32 name[8]
//! ```
//!
//! Lump names are flat 8-byte short names, so the directory keeps its
//! stored order (map lumps rely on it).

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{ArchiveFormat, Catalog, ProbeContext};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::names::FallbackCodepage;

const FORMAT: &str = "wad";
const HEADER_SIZE: u64 = 12;
const RECORD_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct Wad;

impl ArchiveFormat for Wad {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        if ctx.stream_len < HEADER_SIZE {
            return Ok(None);
        }
        let mut magic = [0u8; 4];
        ctx.stream.read_exact(&mut magic)?;
        if &magic != b"IWAD" && &magic != b"PWAD" {
            return Ok(None);
        }

        let num_lumps = ctx.stream.read_i32::<LittleEndian>()?;
        let dir_offset = ctx.stream.read_i32::<LittleEndian>()?;
        let (Ok(num_lumps), Ok(dir_offset)) = (u64::try_from(num_lumps), u64::try_from(dir_offset)) else {
            return Err(Error::MalformedArchive {
                format: FORMAT,
                message: format!("negative header field (lumps {num_lumps}, directory {dir_offset})"),
            });
        };

        let table = ctx.read_table(FORMAT, dir_offset, num_lumps, RECORD_SIZE)?;
        let mut entries = Vec::with_capacity(table.len() / RECORD_SIZE as usize);
        for (i, record) in table.chunks_exact(RECORD_SIZE as usize).enumerate() {
            let mut fields = &record[..8];
            let position = u64::from(fields.read_u32::<LittleEndian>()?);
            let size = u64::from(fields.read_u32::<LittleEndian>()?);

            if position.saturating_add(size) > ctx.stream_len {
                tracing::debug!("wad lump {i} extends past end of {}", ctx.file_name);
            }
            let name = ctx.name(&record[8..16], FallbackCodepage::Placeholder);
            entries.push(Entry::new(name, position, size).with_resource_id(i as u32));
        }

        Ok(Some(Catalog::new(entries)))
    }
}

/// Assemble a WAD image from `(name, data)` lumps.
#[cfg(test)]
pub(crate) fn build(magic: &[u8; 4], lumps: &[(&str, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut records = Vec::new();
    for (name, bytes) in lumps {
        let pos = HEADER_SIZE as usize + data.len();
        records.extend_from_slice(&(pos as u32).to_le_bytes());
        records.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        let mut short = [0u8; 8];
        short[..name.len()].copy_from_slice(name.as_bytes());
        records.extend_from_slice(&short);
        data.extend_from_slice(bytes);
    }

    let mut out = magic.to_vec();
    out.extend_from_slice(&(lumps.len() as i32).to_le_bytes());
    out.extend_from_slice(&((HEADER_SIZE as usize + data.len()) as i32).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&records);
    out
}
