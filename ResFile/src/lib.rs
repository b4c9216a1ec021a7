//! # ResFile
//!
//! A format-agnostic resource archive layer. Whatever the container, an
//! opened archive is a sorted, filtered directory of named entries with
//! seekable (and transparently decompressing) readers for each one.
//!
//! ## Supported Formats
//!
//! - **WAD** - Doom `IWAD`/`PWAD` lump directories
//! - **ZIP** - stored and deflated members, ZIP64
//! - **LSPK** - Larian PAK v15-18, including multi-part archives
//! - **PAK** - Quake `PACK` archives
//! - **GRP** - Build engine group files
//! - **Directories** - plain folders on disk
//! - **Loose files** - any other file as a one-entry archive
//!
//! ## Quick Start
//!
//! ```no_run
//! use resfile::ResourceFile;
//!
//! let Some(mut archive) = ResourceFile::open("gzdoom.pk3")? else {
//!     panic!("not an archive");
//! };
//! println!("{} entries, identity {}", archive.entry_count(), archive.hash());
//!
//! if let Some(index) = archive.find_entry("mapinfo/doom2.txt") {
//!     let raw = archive.raw_data(index)?;
//!     println!("{} bytes, crc {:08x}", raw.size, raw.crc32);
//! }
//! # Ok::<(), resfile::Error>(())
//! ```
//!
//! ### Filters
//!
//! Entries under `filter/<tag>/` only apply when `<tag>` is one of the
//! active filter rules (or a dot-prefix of one):
//!
//! ```no_run
//! use resfile::prelude::*;
//!
//! let options = OpenOptions::new()
//!     .filter(FilterInfo::new().with_filter("doom.id.doom2"))
//!     .container_only(true);
//! let archive = ResourceFile::open_with("mod.pk3", &options)?;
//! # Ok::<(), resfile::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `resfile` command-line binary

pub mod config;
pub mod directory;
pub mod embedded;
pub mod entry;
pub mod error;
pub mod formats;
pub mod identity;
pub mod io;
pub mod message;
pub mod names;
pub mod pool;
pub mod resource;
pub mod utils;

// Re-exports for convenience
pub use config::FilterInfo;
pub use directory::{Directory, find_prefix_range};
pub use entry::{Address, CompressionMethod, Entry, EntryFlags};
pub use error::{Error, Result};
pub use formats::{ArchiveBackend, ArchiveFormat, Catalog, FormatRegistry, ProbeContext};
pub use io::{EntryReader, ReadSeek};
pub use message::{MessageLevel, MessageSink};
pub use pool::{PoolHandle, StringPool};
pub use resource::{OpenOptions, RawEntryData, ResourceFile};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::FilterInfo;
    pub use crate::entry::{CompressionMethod, Entry, EntryFlags};
    pub use crate::error::{Error, Result};
    pub use crate::formats::{ArchiveFormat, FormatRegistry};
    pub use crate::io::EntryReader;
    pub use crate::message::{MessageLevel, MessageSink};
    pub use crate::resource::{OpenOptions, RawEntryData, ResourceFile};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
