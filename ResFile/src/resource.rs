//! Opened archives
//!
//! [`ResourceFile`] ties together the stream an archive was read from, its
//! post-processed [`Directory`] and the format backend that produced it.
//!
//! # Example
//!
//! ```no_run
//! use resfile::{FilterInfo, OpenOptions, ResourceFile};
//!
//! let options = OpenOptions::new().filter(FilterInfo::new().with_filter("doom.id.doom2"));
//! let Some(mut archive) = ResourceFile::open_with("mods/project.pk3", &options)? else {
//!     return Ok(());
//! };
//! if let Some(index) = archive.find_entry("mapinfo.txt") {
//!     let text = archive.read_entry(index)?;
//!     println!("{} bytes, archive {}", text.len(), archive.hash());
//! }
//! # Ok::<(), resfile::Error>(())
//! ```

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::FilterInfo;
use crate::directory::Directory;
use crate::embedded::is_embedded_name;
use crate::entry::{Address, CompressionMethod, Entry, EntryFlags};
use crate::error::{Error, Result};
use crate::formats::{ArchiveBackend, Catalog, FormatRegistry, ProbeContext, scan_directory};
use crate::identity::directory_hash;
use crate::io::{EntryReader, ReadSeek, SharedStream, stream_length};
use crate::message::MessageSink;
use crate::pool::{PoolHandle, StringPool};

/// Settings used while opening an archive.
#[derive(Clone, Default)]
pub struct OpenOptions {
    filter: Option<FilterInfo>,
    container_only: bool,
    sink: MessageSink,
    pool: Option<PoolHandle>,
    formats: Rc<FormatRegistry>,
}

impl OpenOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter rules and embedded-archive hints.
    #[must_use]
    pub fn filter(mut self, filter: FilterInfo) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Refuse to open loose files as one-entry archives.
    #[must_use]
    pub fn container_only(mut self, container_only: bool) -> Self {
        self.container_only = container_only;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: MessageSink) -> Self {
        self.sink = sink;
        self
    }

    /// Intern names into a pool that outlives the archive. Without this,
    /// every archive gets a pool of its own.
    #[must_use]
    pub fn shared_pool(mut self, pool: &Rc<RefCell<StringPool>>) -> Self {
        self.pool = Some(PoolHandle::shared(pool));
        self
    }

    /// Replace the format probes and their priority order.
    #[must_use]
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Rc::new(formats);
        self
    }

    fn pool_handle(&self) -> PoolHandle {
        self.pool.clone().unwrap_or_else(PoolHandle::owned)
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("filter", &self.filter)
            .field("container_only", &self.container_only)
            .field("formats", &self.formats)
            .finish_non_exhaustive()
    }
}

/// An entry's bytes read in one go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntryData {
    pub size: u64,
    pub compressed_size: u64,
    /// Always [`CompressionMethod::Stored`]: `data` is already decompressed.
    pub method: CompressionMethod,
    /// CRC32 of `data`, 0 when empty.
    pub crc32: u32,
    pub data: Vec<u8>,
}

impl RawEntryData {
    fn from_bytes(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            size,
            compressed_size: size,
            method: CompressionMethod::Stored,
            crc32: if data.is_empty() { 0 } else { crc32fast::hash(&data) },
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An opened archive.
pub struct ResourceFile {
    file_name: String,
    path: Option<PathBuf>,
    /// `None` for directories, whose entries are separate files.
    stream: Option<SharedStream>,
    stream_len: u64,
    directory: Directory,
    backend: Box<dyn ArchiveBackend>,
    format: &'static str,
    filter: Option<FilterInfo>,
    pool: PoolHandle,
    sink: MessageSink,
    hash: OnceCell<String>,
}

impl ResourceFile {
    /// Open the file at `path` with default options.
    ///
    /// Returns `Ok(None)` when no format recognises the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Option<Self>> {
        Self::open_with(path, &OpenOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let file_name = path.to_string_lossy().into_owned();
        Self::open_inner(file_name, Some(path.to_path_buf()), Box::new(file), options)
    }

    /// Open an archive from an arbitrary stream, such as an embedded entry's
    /// reader. The stream is moved into the archive.
    ///
    /// Such archives cannot hand out independent readers.
    pub fn open_stream(
        file_name: impl Into<String>,
        stream: Box<dyn ReadSeek>,
        options: &OpenOptions,
    ) -> Result<Option<Self>> {
        Self::open_inner(file_name.into(), None, stream, options)
    }

    /// Present a file system directory as an archive.
    pub fn open_directory(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let pool = options.pool_handle();
        let (entries, backend) = scan_directory(path, &pool)?;

        Ok(Self::from_catalog(
            path.to_string_lossy().into_owned(),
            Some(path.to_path_buf()),
            None,
            0,
            "directory",
            Catalog::with_backend(entries, backend),
            options,
            pool,
        ))
    }

    fn open_inner(
        file_name: String,
        path: Option<PathBuf>,
        mut stream: Box<dyn ReadSeek>,
        options: &OpenOptions,
    ) -> Result<Option<Self>> {
        let stream_len = stream_length(stream.as_mut())?;
        let pool = options.pool_handle();

        let mut ctx = ProbeContext {
            file_name: &file_name,
            path: path.as_deref(),
            stream: stream.as_mut(),
            stream_len,
            pool: &pool,
            sink: &options.sink,
            filter: options.filter.as_ref(),
        };
        let Some((format, catalog)) = options.formats.probe(&mut ctx, options.container_only)? else {
            return Ok(None);
        };

        Ok(Some(Self::from_catalog(
            file_name,
            path,
            Some(SharedStream::new(stream)),
            stream_len,
            format,
            catalog,
            options,
            pool,
        )))
    }

    #[allow(clippy::too_many_arguments)]
    fn from_catalog(
        file_name: String,
        path: Option<PathBuf>,
        stream: Option<SharedStream>,
        stream_len: u64,
        format: &'static str,
        catalog: Catalog,
        options: &OpenOptions,
        pool: PoolHandle,
    ) -> Self {
        let mut directory = Directory::new(catalog.entries);
        directory.post_process(options.filter.as_ref(), &pool);

        let mut archive = Self {
            file_name,
            path,
            stream,
            stream_len,
            directory,
            backend: catalog.backend,
            format,
            filter: options.filter.clone(),
            pool,
            sink: options.sink.clone(),
            hash: OnceCell::new(),
        };
        if archive.directory.get(0).is_some_and(Entry::has_full_path) {
            archive.check_all_embedded();
        }
        archive
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Name of the format that recognised the archive.
    pub fn format_name(&self) -> &'static str {
        self.format
    }

    pub fn filter(&self) -> Option<&FilterInfo> {
        self.filter.as_ref()
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub fn sink(&self) -> &MessageSink {
        &self.sink
    }

    /// Length of the archive's stream; 0 for directories.
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn entries(&self) -> &[Entry] {
        self.directory.entries()
    }

    pub fn entry_count(&self) -> usize {
        self.directory.len()
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.directory.get(index)
    }

    pub fn entry_name(&self, index: usize) -> Option<&str> {
        self.entry(index).map(|e| &*e.name)
    }

    pub fn entry_length(&self, index: usize) -> Option<u64> {
        self.entry(index).map(|e| e.length)
    }

    pub fn entry_compressed_size(&self, index: usize) -> Option<u64> {
        self.entry(index).map(|e| e.compressed_size)
    }

    pub fn entry_flags(&self, index: usize) -> Option<EntryFlags> {
        self.entry(index).map(Entry::flags)
    }

    /// Index of the entry called `name` (case-insensitive, either slash).
    pub fn find_entry(&self, name: &str) -> Option<usize> {
        self.directory.find_entry(name)
    }

    /// Identity string of the directory, computed on first use.
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| directory_hash(self.stream_len, &self.directory))
    }

    /// Flag the entry as embedded if it looks like a nested archive.
    /// Returns whether the entry is flagged.
    pub fn check_embedded(&mut self, index: usize) -> bool {
        let Some(entry) = self.directory.get(index) else {
            return false;
        };
        if entry.is_embedded() {
            return true;
        }
        if !is_embedded_name(&entry.name, &self.file_name, self.filter.as_ref()) {
            return false;
        }

        tracing::debug!("'{}' in {} is an embedded archive", entry.name, self.file_name);
        if let Some(entry) = self.directory.get_mut(index) {
            entry.set_flag(EntryFlags::EMBEDDED);
        }
        true
    }

    /// Run [`check_embedded`](Self::check_embedded) over every entry and
    /// return how many are flagged.
    pub fn check_all_embedded(&mut self) -> usize {
        (0..self.directory.len()).filter(|&i| self.check_embedded(i)).count()
    }

    fn entry_or_err(&self, index: usize) -> Result<&Entry> {
        self.directory.get(index).ok_or(Error::InvalidEntryIndex {
            index,
            count: self.directory.len(),
        })
    }

    fn no_backing_file(&self) -> Error {
        Error::NoBackingFile {
            name: self.file_name.clone(),
        }
    }

    /// Turn a deferred data address into a real one. Happens once per entry.
    fn resolve_address(&mut self, index: usize) -> Result<Entry> {
        let entry = self.entry_or_err(index)?.clone();
        let Address::Deferred(record) = entry.address else {
            return Ok(entry);
        };

        let stream = self.stream.as_ref().ok_or_else(|| self.no_backing_file())?;
        let position = stream.with(|s| self.backend.resolve_address(s, &entry, record))?;
        tracing::trace!("resolved '{}' from {record} to {position}", entry.name);

        let count = self.directory.len();
        let slot = self.directory.get_mut(index).ok_or(Error::InvalidEntryIndex { index, count })?;
        slot.address = Address::Resolved(position);
        Ok(slot.clone())
    }

    /// A reader over the entry's decompressed bytes.
    ///
    /// By default the reader shares the archive's stream and must not be
    /// used at the same time as other readers of this archive. With
    /// `independent` it works on a freshly opened handle instead, which
    /// needs the archive to have been opened from a path.
    pub fn entry_reader(&mut self, index: usize, independent: bool) -> Result<EntryReader> {
        let entry = self.resolve_address(index)?;

        if let Some(reader) = self.backend.open_entry(&entry) {
            return reader;
        }

        if independent {
            let path = self.path.as_ref().ok_or_else(|| self.no_backing_file())?;
            let file = BufReader::new(File::open(path)?);
            return EntryReader::open(Box::new(file), &entry);
        }

        let stream = self.stream.clone().ok_or_else(|| self.no_backing_file())?;
        EntryReader::open(Box::new(stream), &entry)
    }

    /// Buffer size to reserve for `declared` bytes. Sizes come from the
    /// archive, so the reservation never exceeds what the stream holds.
    fn read_capacity(&self, declared: u64) -> usize {
        usize::try_from(declared.min(self.stream_len)).unwrap_or(0)
    }

    /// The entry's full decompressed contents.
    pub fn read_entry(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut reader = self.entry_reader(index, false)?;
        let mut data = Vec::with_capacity(self.read_capacity(reader.len()));
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// The entry's bytes with a CRC32, or an empty result when fewer bytes
    /// are available than the entry declares.
    pub fn raw_data(&mut self, index: usize) -> Result<RawEntryData> {
        let entry = self.entry_or_err(index)?;
        let (length, name) = (entry.length, Rc::clone(&entry.name));
        if length == 0 {
            return Ok(RawEntryData::default());
        }

        let mut reader = self.entry_reader(index, false)?;
        let mut data = Vec::with_capacity(self.read_capacity(length));
        match reader.by_ref().take(length).read_to_end(&mut data) {
            Ok(n) if n as u64 == length => Ok(RawEntryData::from_bytes(data)),
            Ok(n) => {
                tracing::debug!("short read on '{name}': {n} of {length} bytes");
                Ok(RawEntryData::default())
            }
            Err(e) => {
                tracing::debug!("read of '{name}' failed: {e}");
                Ok(RawEntryData::default())
            }
        }
    }
}

impl fmt::Debug for ResourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFile")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("entries", &self.directory.len())
            .field("stream_len", &self.stream_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{build_lspk, build_pak, build_wad};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Seek, SeekFrom};

    fn open_bytes(name: &str, bytes: Vec<u8>, options: &OpenOptions) -> ResourceFile {
        ResourceFile::open_stream(name, Box::new(Cursor::new(bytes)), options)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_wad_keeps_stored_order() {
        let archive = open_bytes(
            "doom.wad",
            build_wad(b"IWAD", &[("MAP01", b""), ("THINGS", b"t"), ("LINEDEFS", b"l")]),
            &OpenOptions::new(),
        );
        assert_eq!(archive.format_name(), "wad");
        let names: Vec<_> = (0..archive.entry_count()).filter_map(|i| archive.entry_name(i)).collect();
        assert_eq!(names, ["map01", "things", "linedefs"]);
    }

    #[test]
    fn test_pak_is_sorted_and_filtered() {
        let options = OpenOptions::new().filter(FilterInfo::new().with_filter("doom2"));
        let archive = open_bytes(
            "mod.pak",
            build_pak(&[
                ("filter/doom2/foo.txt", b"doom2 foo"),
                ("filter/heretic/foo.txt", b"heretic foo"),
                ("bar.txt", b"bar"),
            ]),
            &options,
        );

        let names: Vec<&str> = archive.entries().iter().map(|e| &*e.name).collect();
        assert_eq!(names, ["bar.txt", "", "foo.txt"]);
        assert_eq!(archive.find_entry("foo.txt"), Some(2));
        assert_eq!(archive.entry_length(2), Some(9));
    }

    #[test]
    fn test_raw_data_has_crc() {
        let mut archive = open_bytes("a.pak", build_pak(&[("hello.txt", b"hello world")]), &OpenOptions::new());
        let raw = archive.raw_data(0).unwrap();
        assert_eq!(raw.data, b"hello world");
        assert_eq!(raw.size, 11);
        assert_eq!(raw.compressed_size, 11);
        assert_eq!(raw.method, CompressionMethod::Stored);
        assert_eq!(raw.crc32, crc32fast::hash(b"hello world"));
    }

    #[test]
    fn test_raw_data_short_read_is_empty() {
        // Directory first, then an entry declaring 100 bytes with only 50 left.
        let mut bytes = b"PACK".to_vec();
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(&64u32.to_le_bytes());
        let mut name = [0u8; 56];
        name[..7].copy_from_slice(b"big.bin");
        bytes.extend_from_slice(&name);
        bytes.extend_from_slice(&76u32.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[7u8; 50]);
        let mut archive = open_bytes("short.pak", bytes, &OpenOptions::new());

        assert_eq!(archive.entry_length(0), Some(100));
        let raw = archive.raw_data(0).unwrap();
        assert_eq!(raw, RawEntryData::default());
        assert_eq!((raw.size, raw.crc32), (0, 0));
        assert!(raw.is_empty());
    }

    /// One stored entry at offset 0 that claims to be `u64::MAX` bytes long.
    struct Oversized;

    impl crate::formats::ArchiveFormat for Oversized {
        fn name(&self) -> &'static str {
            "oversized"
        }

        fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>> {
            let name = ctx.pool.intern("huge.bin");
            Ok(Some(Catalog::new(vec![Entry::new(name, 0, u64::MAX)])))
        }
    }

    #[test]
    fn test_huge_declared_length_does_not_preallocate() {
        let options = OpenOptions::new().formats(FormatRegistry::empty().with_format(Oversized));
        let mut archive = open_bytes("huge.dat", vec![3u8; 40], &options);
        assert_eq!(archive.entry_length(0), Some(u64::MAX));

        let raw = archive.raw_data(0).unwrap();
        assert_eq!(raw, RawEntryData::default());
        assert_eq!(archive.read_entry(0).unwrap(), vec![3u8; 40]);
    }

    #[test]
    fn test_raw_data_bad_index() {
        let mut archive = open_bytes("a.pak", build_pak(&[("a", b"1")]), &OpenOptions::new());
        assert!(matches!(
            archive.raw_data(5),
            Err(Error::InvalidEntryIndex { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_shared_readers_interleave() {
        let mut archive = open_bytes(
            "a.pak",
            build_pak(&[("a.txt", b"aaaa"), ("b.txt", b"bbbb")]),
            &OpenOptions::new(),
        );
        let mut a = archive.entry_reader(0, false).unwrap();
        let mut b = archive.entry_reader(1, false).unwrap();

        let mut buf = [0u8; 2];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"aa");
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"bb");
        a.seek(SeekFrom::Start(3)).unwrap();
        let mut rest = Vec::new();
        a.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"a");
    }

    #[test]
    fn test_independent_reader_needs_a_path() {
        let mut archive = open_bytes("a.pak", build_pak(&[("a.txt", b"a")]), &OpenOptions::new());
        assert!(matches!(archive.entry_reader(0, true), Err(Error::NoBackingFile { .. })));
    }

    #[test]
    fn test_lspk_compressed_entries_decode() {
        let text = b"Larian ".repeat(40);
        let packed = lz4_flex::block::compress(&text);
        let mut archive = open_bytes(
            "Mod.pak",
            build_lspk(&[("Public/a.txt", &packed, 2, text.len() as u32, 0), ("meta.lsx", b"<m/>", 0, 0, 0)]),
            &OpenOptions::new(),
        );

        assert_eq!(archive.format_name(), "lspk");
        let index = archive.find_entry("public/a.txt").unwrap();
        assert!(archive.entry_flags(index).unwrap().contains(EntryFlags::COMPRESSED));
        assert_eq!(archive.read_entry(index).unwrap(), text);
        assert_eq!(archive.raw_data(index).unwrap().crc32, crc32fast::hash(&text));
    }

    #[test]
    fn test_hash_is_memoized_and_stable() {
        let bytes = build_pak(&[("b.txt", b"bb"), ("a.txt", b"a")]);
        let first = open_bytes("x.pak", bytes.clone(), &OpenOptions::new());
        let second = open_bytes("y.pak", bytes, &OpenOptions::new());

        assert_eq!(first.hash(), second.hash());
        assert!(std::ptr::eq(first.hash(), first.hash()));
        assert!(first.hash().starts_with(&format!("{:08X}-0002-", first.stream_len())));
    }

    #[test]
    fn test_embedded_entries_flagged_on_open() {
        let archive = open_bytes(
            "project.pak",
            build_pak(&[("project/project.wad", b"PWAD"), ("maps/other.wad", b"PWAD")]),
            &OpenOptions::new(),
        );
        let flagged = |name: &str| {
            archive
                .entry_flags(archive.find_entry(name).unwrap())
                .unwrap()
                .contains(EntryFlags::EMBEDDED)
        };
        assert!(flagged("project/project.wad"));
        assert!(!flagged("maps/other.wad"));
    }

    #[test]
    fn test_shared_pool_outlives_archive() {
        let pool = Rc::new(RefCell::new(StringPool::new()));
        let options = OpenOptions::new().shared_pool(&pool);
        {
            let archive = open_bytes("a.pak", build_pak(&[("shared.txt", b"x")]), &options);
            assert!(archive.pool().is_shared());
        }
        assert_eq!(pool.borrow().len(), 1);
    }

    #[test]
    fn test_owned_pools_are_per_archive() {
        let options = OpenOptions::new();
        let a = open_bytes("a.pak", build_pak(&[("one.txt", b"x")]), &options);
        let b = open_bytes("b.pak", build_pak(&[("two.txt", b"x")]), &options);
        assert!(!a.pool().is_shared());
        assert_eq!(a.pool().len(), 1);
        assert_eq!(b.pool().len(), 1);
    }

    #[test]
    fn test_unrecognised_stream_in_container_mode() {
        let options = OpenOptions::new().container_only(true);
        let result = ResourceFile::open_stream("notes.txt", Box::new(Cursor::new(b"just text".to_vec())), &options);
        assert!(result.unwrap().is_none());
    }
}
