//! Directory identity hash
//!
//! A fingerprint of an archive's logical directory, used for mod-wide
//! compatibility settings and localization add-ons. Only names and sizes are
//! hashed, never content, and the directory is taken as it is at call time
//! (sorted and filtered), so two archives with the same logical directory
//! hash the same regardless of physical layout.

use std::fmt::Write;

use crate::directory::Directory;

/// Compute the identity string for a directory read from a stream of
/// `stream_len` bytes.
///
/// Format: `LLLLLLLL-CCCC-DDDDDDDDDDDDDDDDDDDDDDDDDDDDDDDD`, where `L` is the
/// stream length (low 32 bits), `C` the entry count and `D` an MD5 digest
/// over each entry's name (with a NUL terminator) and its decompressed length
/// as little-endian `u64`.
#[must_use]
pub fn directory_hash(stream_len: u64, directory: &Directory) -> String {
    let mut hasher = md5::Context::new();
    for entry in directory {
        hasher.consume(entry.name.as_bytes());
        hasher.consume([0u8]);
        hasher.consume(entry.length.to_le_bytes());
    }
    let digest = hasher.compute();

    let mut hash = format!("{:08X}-{:04X}-", stream_len as u32, directory.len());
    for b in digest.iter() {
        let _ = write!(hash, "{b:02X}");
    }
    hash
}
