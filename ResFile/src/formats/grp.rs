//! Build engine GRP archives (`KenSilverman`)
//!
//! ```text
//! header:  "KenSilverman" num_files:u32
//! record:  name[12] size:u32
//! ```
//!
//! File data follows the directory back to back, in record order.

use byteorder::{LittleEndian, ReadBytesExt};

use super::{ArchiveFormat, Catalog, ProbeContext, starts_with_magic};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::names::FallbackCodepage;

const FORMAT: &str = "grp";
const MAGIC: &[u8; 12] = b"KenSilverman";
const RECORD_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct Grp;

impl ArchiveFormat for Grp {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
        if ctx.stream_len < RECORD_SIZE || !starts_with_magic(ctx, MAGIC)? {
            return Ok(None);
        }
        let num_files = u64::from(ctx.stream.read_u32::<LittleEndian>()?);
        let table = ctx.read_table(FORMAT, RECORD_SIZE, num_files, RECORD_SIZE)?;

        let mut position = RECORD_SIZE * (num_files + 1);
        let mut entries = Vec::with_capacity(table.len() / RECORD_SIZE as usize);
        for (i, record) in table.chunks_exact(RECORD_SIZE as usize).enumerate() {
            let size = u64::from((&record[12..]).read_u32::<LittleEndian>()?);
            let name = ctx.name(&record[..12], FallbackCodepage::Placeholder);
            entries.push(Entry::new(name, position, size).with_resource_id(i as u32));
            position += size;
        }

        if position > ctx.stream_len {
            return Err(Error::MalformedArchive {
                format: FORMAT,
                message: format!("files need {position} bytes, stream has {}", ctx.stream_len),
            });
        }
        Ok(Some(Catalog::new(entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{names, probe_bytes};

    fn build(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&(files.len() as u32).to_le_bytes());
        for (name, data) in files {
            let mut raw = [0u8; 12];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&raw);
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        for (_, data) in files {
            out.extend_from_slice(data);
        }
        out
    }

    #[test]
    fn test_sequential_layout() {
        let bytes = build(&[("TILES000.ART", b"tiles"), ("GAME.CON", b"define")]);
        let catalog = probe_bytes(&Grp, "duke3d.grp", bytes).unwrap().unwrap();

        assert_eq!(names(&catalog), ["tiles000.art", "game.con"]);
        assert_eq!(catalog.entries[0].position(), 48);
        assert_eq!(catalog.entries[1].position(), 53);
        assert_eq!(catalog.entries[1].length, 6);
    }

    #[test]
    fn test_truncated_data_is_malformed() {
        let mut bytes = build(&[("A.TXT", b"abc")]);
        bytes.pop();
        assert!(matches!(probe_bytes(&Grp, "x", bytes), Err(Error::MalformedArchive { .. })));
    }
}
