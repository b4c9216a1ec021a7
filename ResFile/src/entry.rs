//! Directory entry record

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

bitflags! {
    /// Per-entry property bits.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct EntryFlags: u32 {
        /// Name is a full path, so the directory gets sorted and filtered.
        const FULLPATH = 1 << 0;
        /// Data is stored compressed; see [`Entry::method`].
        const COMPRESSED = 1 << 1;
        /// Data offset is still the format-specific placeholder.
        const NEEDS_ADDRESS = 1 << 2;
        /// Entry looks like a nested archive.
        const EMBEDDED = 1 << 3;
    }
}

/// Compression method of an entry's on-stream bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CompressionMethod {
    #[default]
    Stored,
    /// Raw DEFLATE (ZIP method 8)
    Deflate,
    /// DEFLATE with zlib framing
    Zlib,
    /// LZ4 block
    Lz4,
}

impl CompressionMethod {
    /// Map a ZIP compression method number.
    #[must_use]
    pub fn from_zip(method: u16) -> Option<Self> {
        match method {
            0 => Some(Self::Stored),
            8 => Some(Self::Deflate),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Deflate => "deflate",
            Self::Zlib => "zlib",
            Self::Lz4 => "lz4",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where an entry's data begins.
///
/// Some formats only know the offset of a per-entry header when the
/// directory is read; the real data offset is worked out on first access and
/// remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Resolved(u64),
    /// Offset of the format-specific record to resolve from.
    Deferred(u64),
}

/// One named item inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Canonical pooled name; empty once purged.
    pub name: Rc<str>,
    pub address: Address,
    /// Decompressed size.
    pub length: u64,
    /// On-stream size; equals `length` when stored.
    pub compressed_size: u64,
    pub method: CompressionMethod,
    flags: EntryFlags,
    /// Backend-private index (original record number, archive part, ...).
    pub resource_id: u32,
}

impl Entry {
    /// A stored entry at a known offset.
    #[must_use]
    pub fn new(name: Rc<str>, position: u64, length: u64) -> Self {
        Self {
            name,
            address: Address::Resolved(position),
            length,
            compressed_size: length,
            method: CompressionMethod::Stored,
            flags: EntryFlags::empty(),
            resource_id: 0,
        }
    }

    #[must_use]
    pub fn with_compression(mut self, method: CompressionMethod, compressed_size: u64) -> Self {
        self.method = method;
        self.compressed_size = compressed_size;
        self.flags.set(EntryFlags::COMPRESSED, method != CompressionMethod::Stored);
        self
    }

    /// Mark the position as the offset of a record still to be resolved.
    #[must_use]
    pub fn with_deferred_address(mut self) -> Self {
        self.address = Address::Deferred(self.position());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: EntryFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_resource_id(mut self, id: u32) -> Self {
        self.resource_id = id;
        self
    }

    /// Data offset, or the pending record offset while unresolved.
    pub fn position(&self) -> u64 {
        match self.address {
            Address::Resolved(pos) | Address::Deferred(pos) => pos,
        }
    }

    pub fn needs_address(&self) -> bool {
        matches!(self.address, Address::Deferred(_))
    }

    pub fn flags(&self) -> EntryFlags {
        let mut flags = self.flags;
        flags.set(EntryFlags::NEEDS_ADDRESS, self.needs_address());
        flags
    }

    pub(crate) fn set_flag(&mut self, flag: EntryFlags) {
        self.flags |= flag;
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.contains(EntryFlags::COMPRESSED)
    }

    pub fn is_embedded(&self) -> bool {
        self.flags.contains(EntryFlags::EMBEDDED)
    }

    pub fn has_full_path(&self) -> bool {
        self.flags.contains(EntryFlags::FULLPATH)
    }

    /// Purged entries keep their slot but can no longer be found by name.
    pub fn is_purged(&self) -> bool {
        self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_sets_flag() {
        let entry = Entry::new(Rc::from("a.txt"), 10, 100).with_compression(CompressionMethod::Deflate, 40);
        assert!(entry.is_compressed());
        assert_eq!(entry.compressed_size, 40);

        let stored = Entry::new(Rc::from("b.txt"), 0, 5).with_compression(CompressionMethod::Stored, 5);
        assert!(!stored.is_compressed());
    }

    #[test]
    fn test_deferred_address_reports_flag() {
        let entry = Entry::new(Rc::from("a.txt"), 64, 1).with_deferred_address();
        assert!(entry.flags().contains(EntryFlags::NEEDS_ADDRESS));
        assert_eq!(entry.position(), 64);

        let mut resolved = entry.clone();
        resolved.address = Address::Resolved(100);
        assert!(!resolved.flags().contains(EntryFlags::NEEDS_ADDRESS));
    }

    #[test]
    fn test_zip_method_mapping() {
        assert_eq!(CompressionMethod::from_zip(0), Some(CompressionMethod::Stored));
        assert_eq!(CompressionMethod::from_zip(8), Some(CompressionMethod::Deflate));
        assert_eq!(CompressionMethod::from_zip(14), None);
    }
}
