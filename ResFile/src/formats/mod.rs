//! Archive format probes
//!
//! Each supported format implements [`ArchiveFormat`]. A [`FormatRegistry`]
//! holds the probes in priority order and hands a stream to each in turn;
//! the first probe that recognises the stream wins.
//!
//! A successful probe returns a [`Catalog`]: the raw directory plus the
//! [`ArchiveBackend`] that knows how to finish locating or opening entries
//! after the probe is gone.

mod directory;
mod grp;
mod lspk;
mod lump;
mod pak;
mod wad;
mod zip;

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

pub use directory::DirectoryBackend;
pub use grp::Grp;
pub use lspk::Lspk;
pub use lump::Lump;
pub use pak::Pak;
pub use wad::Wad;
pub use zip::Zip;

pub(crate) use directory::scan_directory;

use crate::config::FilterInfo;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::io::{EntryReader, ReadSeek};
use crate::message::{MessageLevel, MessageSink};
use crate::names::{FallbackCodepage, normalize_pooled};
use crate::pool::PoolHandle;

/// Everything a probe may look at while deciding whether it owns a stream.
pub struct ProbeContext<'a> {
    /// Name the archive was opened under (used for lump names and
    /// embedded-archive checks).
    pub file_name: &'a str,
    /// On-disk path, when there is one.
    pub path: Option<&'a Path>,
    pub stream: &'a mut dyn ReadSeek,
    pub stream_len: u64,
    pub pool: &'a PoolHandle,
    pub sink: &'a MessageSink,
    pub filter: Option<&'a FilterInfo>,
}

impl ProbeContext<'_> {
    /// Normalize and intern a raw entry name.
    pub fn name(&self, raw: &[u8], fallback: FallbackCodepage) -> Rc<str> {
        normalize_pooled(self.pool, raw, fallback)
    }

    /// Report a user-facing problem through the message sink.
    pub fn message(&self, level: MessageLevel, text: &str) {
        self.sink.emit(level, text);
    }

    /// Read `count` fixed-size records starting at `offset`, making sure the
    /// table fits in the stream first.
    pub fn read_table(
        &mut self,
        format: &'static str,
        offset: u64,
        count: u64,
        record_size: u64,
    ) -> Result<Vec<u8>> {
        let size = count
            .checked_mul(record_size)
            .filter(|&size| size <= self.stream_len)
            .ok_or(Error::TooManyEntries { format, count })?;
        if offset.checked_add(size).is_none_or(|end| end > self.stream_len) {
            return Err(Error::MalformedArchive {
                format,
                message: format!("directory at {offset} runs past end of stream ({} bytes)", self.stream_len),
            });
        }

        let mut table = vec![0u8; usize::try_from(size).map_err(|_| Error::TooManyEntries { format, count })?];
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.read_exact(&mut table)?;
        Ok(table)
    }
}

/// Result of a successful probe.
pub struct Catalog {
    pub entries: Vec<Entry>,
    pub backend: Box<dyn ArchiveBackend>,
}

impl Catalog {
    /// Entries that all live in the archive's own stream at known or
    /// deferred offsets.
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            backend: Box::new(StreamBackend),
        }
    }

    #[must_use]
    pub fn with_backend(entries: Vec<Entry>, backend: impl ArchiveBackend + 'static) -> Self {
        Self {
            entries,
            backend: Box::new(backend),
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("entries", &self.entries).finish_non_exhaustive()
    }
}

/// Format-specific behaviour needed after the directory has been read.
pub trait ArchiveBackend {
    /// Work out the real data offset of an entry whose address was deferred.
    /// `deferred` is the record offset the probe stored.
    fn resolve_address(&self, stream: &mut dyn ReadSeek, entry: &Entry, deferred: u64) -> Result<u64> {
        let _ = (stream, deferred);
        Err(Error::AddressResolution {
            name: entry.name.to_string(),
            message: "format does not defer addresses".to_string(),
        })
    }

    /// Open an entry whose bytes are not in the archive's shared stream.
    /// `None` means "use the shared stream".
    fn open_entry(&self, entry: &Entry) -> Option<Result<EntryReader>> {
        let _ = entry;
        None
    }
}

/// Backend for formats whose entries sit at fixed offsets in the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamBackend;

impl ArchiveBackend for StreamBackend {}

/// One archive format.
pub trait ArchiveFormat {
    /// Short lowercase format name.
    fn name(&self) -> &'static str;

    /// Whether the format is a genuine multi-entry container. Non-containers
    /// are skipped when only containers are wanted.
    fn is_container(&self) -> bool {
        true
    }

    /// Recognise the stream and read its directory.
    ///
    /// `Ok(None)` declines the stream. An `Err` means the signature matched
    /// but the archive is unreadable; no partial directory is returned.
    /// [`Error::MalformedArchive`] and [`Error::TooManyEntries`] let the
    /// registry move on to the next format.
    fn probe(&self, ctx: &mut ProbeContext<'_>) -> Result<Option<Catalog>>;
}

/// Ordered list of format probes.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ArchiveFormat>>,
}

impl FormatRegistry {
    /// A registry with no formats.
    #[must_use]
    pub fn empty() -> Self {
        Self { formats: Vec::new() }
    }

    /// Append a probe at the lowest priority.
    #[must_use]
    pub fn with_format(mut self, format: impl ArchiveFormat + 'static) -> Self {
        self.formats.push(Box::new(format));
        self
    }

    pub fn push(&mut self, format: Box<dyn ArchiveFormat>) {
        self.formats.push(format);
    }

    /// Format names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.formats.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Try every probe in order and return the first match with the name of
    /// the format that produced it.
    ///
    /// The stream is rewound before and after every probe, so a declining
    /// probe never leaves it somewhere the next one does not expect. A format
    /// that finds its signature but a broken directory is reported to the
    /// sink as a warning and counts as a decline. I/O errors end the search.
    pub fn probe(
        &self,
        ctx: &mut ProbeContext<'_>,
        container_only: bool,
    ) -> Result<Option<(&'static str, Catalog)>> {
        for format in &self.formats {
            if container_only && !format.is_container() {
                tracing::trace!("skipping non-container format {}", format.name());
                continue;
            }

            ctx.stream.seek(SeekFrom::Start(0))?;
            let result = format.probe(ctx);
            ctx.stream.seek(SeekFrom::Start(0))?;

            match result {
                Ok(Some(catalog)) => {
                    tracing::debug!(
                        "{} recognised as {} ({} entries)",
                        ctx.file_name,
                        format.name(),
                        catalog.entries.len()
                    );
                    return Ok(Some((format.name(), catalog)));
                }
                Ok(None) => {}
                // A damaged container falls through to the remaining formats.
                Err(e @ (Error::MalformedArchive { .. } | Error::TooManyEntries { .. })) => {
                    tracing::debug!("{} rejected by {}: {e}", ctx.file_name, format.name());
                    ctx.message(MessageLevel::Warning, &format!("{}: {e}", ctx.file_name));
                }
                Err(e) => return Err(e),
            }
        }
        tracing::debug!("no format recognised {}", ctx.file_name);
        Ok(None)
    }
}

impl Default for FormatRegistry {
    /// WAD, ZIP, LSPK, PAK, GRP, then the single-lump fallback.
    fn default() -> Self {
        Self::empty()
            .with_format(Wad)
            .with_format(Zip)
            .with_format(Lspk)
            .with_format(Pak)
            .with_format(Grp)
            .with_format(Lump)
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Whether the stream starts with `magic`. Leaves the position after the
/// magic on a match.
pub(crate) fn starts_with_magic(ctx: &mut ProbeContext<'_>, magic: &[u8]) -> Result<bool> {
    if ctx.stream_len < magic.len() as u64 {
        return Ok(false);
    }
    let mut buf = vec![0u8; magic.len()];
    ctx.stream.read_exact(&mut buf)?;
    Ok(buf == magic)
}
