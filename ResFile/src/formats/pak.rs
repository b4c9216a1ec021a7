//! Quake PAK archives (`PACK`)
//!
//! ```text
//! header:  "PACK" dir_offset:u32 dir_length:u32
//! record:  name[56] position:u32 length:u32
//! ```

use byteorder::{LittleEndian, ReadBytesExt};

use super::{ArchiveFormat, Catalog, ProbeContext, starts_with_magic};
use crate::entry::{Entry, EntryFlags};
use crate::error::{Error, Result};
use crate::names::FallbackCodepage;

const FORMAT: &str = "pak";
const MAGIC: &[u8; 4] = b"PACK";
const NAME_LENGTH: usize = 56;
const RECORD_SIZE: u64 = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct Pak;

impl ArchiveFormat for Pak {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        if ctx.stream_len < 12 || !starts_with_magic(ctx, MAGIC)? {
            return Ok(None);
        }
        let dir_offset = u64::from(ctx.stream.read_u32::<LittleEndian>()?);
        let dir_length = u64::from(ctx.stream.read_u32::<LittleEndian>()?);
        if dir_length % RECORD_SIZE != 0 {
            return Err(Error::MalformedArchive {
                format: FORMAT,
                message: format!("directory length {dir_length} is not a multiple of {RECORD_SIZE}"),
            });
        }

        let table = ctx.read_table(FORMAT, dir_offset, dir_length / RECORD_SIZE, RECORD_SIZE)?;
        let entries = table
            .chunks_exact(RECORD_SIZE as usize)
            .enumerate()
            .map(|(i, record)| {
                let mut fields = &record[NAME_LENGTH..];
                let position = u64::from(fields.read_u32::<LittleEndian>()?);
                let length = u64::from(fields.read_u32::<LittleEndian>()?);
                let name = ctx.name(&record[..NAME_LENGTH], FallbackCodepage::Placeholder);
                Ok(Entry::new(name, position, length)
                    .with_flags(EntryFlags::FULLPATH)
                    .with_resource_id(i as u32))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Catalog::new(entries)))
    }
}

/// Assemble a PAK image with the directory at the end.
#[cfg(test)]
pub(crate) fn build(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut records = Vec::new();
    for (name, bytes) in files {
        let mut raw = [0u8; NAME_LENGTH];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        records.extend_from_slice(&raw);
        records.extend_from_slice(&((12 + data.len()) as u32).to_le_bytes());
        records.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(bytes);
    }

    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&((12 + data.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&records);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{names, probe_bytes};

    #[test]
    fn test_reads_full_path_entries() {
        let bytes = build(&[("Maps\\E1M1.bsp", b"bsp!"), ("progs.dat", b"qc")]);
        let catalog = probe_bytes(&Pak, "pak0.pak", bytes).unwrap().unwrap();

        assert_eq!(names(&catalog), ["maps/e1m1.bsp", "progs.dat"]);
        assert!(catalog.entries.iter().all(Entry::has_full_path));
        assert_eq!(catalog.entries[1].position(), 16);
    }

    #[test]
    fn test_ragged_directory_is_malformed() {
        let mut bytes = build(&[("a", b"1")]);
        bytes[8..12].copy_from_slice(&63u32.to_le_bytes());
        assert!(matches!(probe_bytes(&Pak, "x", bytes), Err(Error::MalformedArchive { .. })));
    }

    #[test]
    fn test_declines_other_magic() {
        assert!(probe_bytes(&Pak, "x", b"LSPK\0\0\0\0\0\0\0\0".to_vec()).unwrap().is_none());
    }
}
