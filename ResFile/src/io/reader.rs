//! Readers over a single archive entry

use std::io::{self, Read, Seek, SeekFrom};

use super::decompress::Decompressor;
use super::stream::{ReadSeek, SliceReader};
use crate::entry::{CompressionMethod, Entry};
use crate::error::Result;

/// A seekable view of one entry's (decompressed) bytes.
pub enum EntryReader {
    /// Stored data, read straight from the source stream.
    Raw(SliceReader<Box<dyn ReadSeek>>),
    /// Compressed data, decoded on the fly.
    Decompressing(Decompressor),
}

impl EntryReader {
    /// Build a reader for `entry` over `source`.
    ///
    /// The entry's address must already be resolved; `source` is positioned
    /// by the reader itself.
    pub fn open(source: Box<dyn ReadSeek>, entry: &Entry) -> Result<Self> {
        Self::at(source, entry.position(), entry)
    }

    /// Like [`open`](Self::open), with the data starting at `offset` within
    /// `source` rather than at the entry's recorded position.
    pub fn at(source: Box<dyn ReadSeek>, offset: u64, entry: &Entry) -> Result<Self> {
        if entry.method == CompressionMethod::Stored {
            return Ok(Self::Raw(SliceReader::new(source, offset, entry.length)));
        }
        let compressed = SliceReader::new(source, offset, entry.compressed_size);
        Ok(Self::Decompressing(Decompressor::new(entry.method, compressed, entry.length)?))
    }

    /// Number of bytes the reader yields.
    pub fn len(&self) -> u64 {
        match self {
            Self::Raw(r) => r.len(),
            Self::Decompressing(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Decompressing(_))
    }
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Raw(r) => r.read(buf),
            Self::Decompressing(d) => d.read(buf),
        }
    }
}

impl Seek for EntryReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Raw(r) => r.seek(pos),
            Self::Decompressing(d) => d.seek(pos),
        }
    }
}

impl std::fmt::Debug for EntryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Raw(_) => "Raw".to_string(),
            Self::Decompressing(d) => format!("Decompressing({})", d.method()),
        };
        f.debug_struct("EntryReader")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::rc::Rc;

    #[test]
    fn test_stored_entry_is_raw() {
        let entry = Entry::new(Rc::from("a.txt"), 4, 3);
        let mut reader = EntryReader::open(Box::new(Cursor::new(b"headabcrest".to_vec())), &entry).unwrap();

        assert!(!reader.is_compressed());
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_compressed_entry_decodes() {
        let data = b"hello hello hello hello".repeat(10);
        let compressed = lz4_flex::block::compress(&data);
        let mut stream = b"XX".to_vec();
        stream.extend_from_slice(&compressed);

        let entry = Entry::new(Rc::from("b.bin"), 2, data.len() as u64)
            .with_compression(CompressionMethod::Lz4, compressed.len() as u64);
        let mut reader = EntryReader::open(Box::new(Cursor::new(stream)), &entry).unwrap();

        assert!(reader.is_compressed());
        assert_eq!(reader.len(), data.len() as u64);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
