//! Byte streams and per-entry readers

mod decompress;
mod reader;
mod stream;

pub use decompress::{Decompressor, decompress_lz4};
pub use reader::EntryReader;
pub use stream::{ReadSeek, SharedStream, SliceReader, stream_length};
