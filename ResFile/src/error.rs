//! Error types for `ResFile`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `ResFile` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from stream or file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Archive Structure Errors ====================
    /// A format probe recognised the signature but the directory is inconsistent.
    #[error("malformed {format} archive: {message}")]
    MalformedArchive {
        /// Name of the format whose probe rejected the stream.
        format: &'static str,
        /// What was inconsistent.
        message: String,
    },

    /// Archive declares more entries than the stream could possibly hold.
    #[error("{format} archive declares too many entries: {count}")]
    TooManyEntries {
        /// Name of the format.
        format: &'static str,
        /// The declared entry count.
        count: u64,
    },

    /// A multi-part archive part file does not exist on disk.
    #[error("archive part file not found: {path}")]
    ArchivePartMissing {
        /// The expected path to the archive part.
        path: PathBuf,
    },

    /// The path handed to `open_directory` is not a readable directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    // ==================== Entry Access Errors ====================
    /// Entry index outside the directory.
    #[error("entry index {index} out of range ({count} entries)")]
    InvalidEntryIndex {
        /// The requested index.
        index: usize,
        /// Number of entries in the directory.
        count: usize,
    },

    /// An independent reader was requested but the archive has no backing file.
    #[error("archive '{name}' has no backing file to reopen")]
    NoBackingFile {
        /// Name of the archive.
        name: String,
    },

    /// The lazily-resolved data offset of an entry could not be determined.
    #[error("cannot resolve data address of '{name}': {message}")]
    AddressResolution {
        /// Entry name.
        name: String,
        /// Why resolution failed.
        message: String,
    },

    // ==================== Compression/Decompression Errors ====================
    /// Unsupported compression method.
    #[error("unsupported compression method: {method}")]
    UnsupportedCompressionMethod {
        /// The compression method identifier as stored in the archive.
        method: u16,
    },

    /// Decompression failed.
    #[error("decompression failed: {0}")]
    DecompressionError(String),

    // ==================== Configuration Errors ====================
    /// Filter configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `ResFile` operations.
pub type Result<T> = std::result::Result<T, Error>;
