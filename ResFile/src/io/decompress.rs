//! Decompressing entry streams

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::{DeflateDecoder, ZlibDecoder};

use super::stream::{ReadSeek, SliceReader, resolve_seek};
use crate::entry::CompressionMethod;
use crate::error::{Error, Result};

type Source = SliceReader<Box<dyn ReadSeek>>;

/// LZ4 cannot expand data by more than this factor.
const MAX_LZ4_RATIO: usize = 255;

/// LZ4 block decompression that tolerates the variants found in the wild.
///
/// Tries a plain block of the expected size first, then a roomier block,
/// then size-prepended data and finally the frame format. No output buffer
/// is ever sized beyond what `compressed` could expand to.
pub fn decompress_lz4(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let max_size = compressed.len().saturating_mul(MAX_LZ4_RATIO);
    if expected_size > max_size {
        return Err(Error::DecompressionError(format!(
            "LZ4 data of {} bytes cannot expand to {expected_size} bytes",
            compressed.len()
        )));
    }

    if let Ok(data) = lz4_flex::block::decompress(compressed, expected_size) {
        return Ok(data);
    }

    let larger_size = expected_size.saturating_mul(2).max(65536).min(max_size);
    if larger_size > expected_size
        && let Ok(data) = lz4_flex::block::decompress(compressed, larger_size)
    {
        return Ok(data);
    }

    let prepended = compressed.get(..4).map(LittleEndian::read_u32);
    if prepended.is_some_and(|size| size as usize <= max_size)
        && let Ok(data) = lz4_flex::decompress_size_prepended(compressed)
    {
        return Ok(data);
    }

    let mut decoder = lz4_flex::frame::FrameDecoder::new(compressed);
    let mut decompressed = Vec::with_capacity(expected_size);
    if decoder.read_to_end(&mut decompressed).is_ok() && !decompressed.is_empty() {
        return Ok(decompressed);
    }

    Err(Error::DecompressionError(format!(
        "Failed to decompress LZ4 data: all methods failed (compressed: {} bytes, expected: {} bytes)",
        compressed.len(),
        expected_size
    )))
}

enum DecoderState {
    Deflate(DeflateDecoder<Source>),
    Zlib(ZlibDecoder<Source>),
    /// Whole entry decoded up front (block formats).
    Buffered(Cursor<Vec<u8>>),
}

impl DecoderState {
    fn start(method: CompressionMethod, source: Source, length: u64) -> Result<Self> {
        match method {
            CompressionMethod::Deflate => Ok(Self::Deflate(DeflateDecoder::new(source))),
            CompressionMethod::Zlib => Ok(Self::Zlib(ZlibDecoder::new(source))),
            CompressionMethod::Lz4 => {
                let mut source = source;
                let mut compressed = Vec::new();
                source.read_to_end(&mut compressed)?;
                let expected = usize::try_from(length).map_err(|_| {
                    Error::DecompressionError(format!("entry too large to buffer: {length} bytes"))
                })?;
                Ok(Self::Buffered(Cursor::new(decompress_lz4(&compressed, expected)?)))
            }
            CompressionMethod::Stored => {
                let mut source = source;
                let mut data = Vec::new();
                source.read_to_end(&mut data)?;
                Ok(Self::Buffered(Cursor::new(data)))
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Deflate(d) => d.read(buf),
            Self::Zlib(d) => d.read(buf),
            Self::Buffered(c) => c.read(buf),
        }
    }
}

/// Presents the decompressed bytes of an entry as a seekable stream of
/// exactly `length` bytes.
///
/// Streaming decoders cannot seek backwards, so a backwards seek restarts
/// decoding from the beginning of the compressed data.
pub struct Decompressor {
    method: CompressionMethod,
    length: u64,
    pos: u64,
    state: Option<DecoderState>,
}

impl Decompressor {
    /// Start decoding `source`, which holds the compressed bytes, into
    /// `length` output bytes.
    pub fn new(method: CompressionMethod, source: Source, length: u64) -> Result<Self> {
        let state = DecoderState::start(method, source, length)?;
        Ok(Self {
            method,
            length,
            pos: 0,
            state: Some(state),
        })
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// Decompressed length.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn rewind(&mut self) -> io::Result<()> {
        let state = match self.state.take() {
            Some(DecoderState::Buffered(mut cursor)) => {
                cursor.set_position(0);
                DecoderState::Buffered(cursor)
            }
            Some(DecoderState::Deflate(d)) => {
                let mut source = d.into_inner();
                source.seek(SeekFrom::Start(0))?;
                DecoderState::Deflate(DeflateDecoder::new(source))
            }
            Some(DecoderState::Zlib(d)) => {
                let mut source = d.into_inner();
                source.seek(SeekFrom::Start(0))?;
                DecoderState::Zlib(ZlibDecoder::new(source))
            }
            None => return Err(broken()),
        };
        self.state = Some(state);
        self.pos = 0;
        Ok(())
    }

    fn skip(&mut self, mut count: u64) -> io::Result<()> {
        if let Some(DecoderState::Buffered(cursor)) = &mut self.state {
            cursor.set_position(self.pos + count);
            self.pos += count;
            return Ok(());
        }

        let mut scratch = [0u8; 8192];
        while count > 0 {
            let want = scratch.len().min(usize::try_from(count).unwrap_or(usize::MAX));
            let n = self.read(&mut scratch[..want])?;
            if n == 0 {
                break;
            }
            count -= n as u64;
        }
        Ok(())
    }
}

fn broken() -> io::Error {
    io::Error::other("decompressor left in a failed state")
}

impl Read for Decompressor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.length || buf.is_empty() {
            return Ok(0);
        }
        let remaining = self.length - self.pos;
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let state = self.state.as_mut().ok_or_else(broken)?;
        let n = state.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} stream ended after {} of {} bytes",
                    self.method, self.pos, self.length
                ),
            ));
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for Decompressor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = resolve_seek(pos, self.pos, self.length)?;
        if target < self.pos {
            self.rewind()?;
        }
        let reachable = target.min(self.length);
        if reachable > self.pos {
            self.skip(reachable - self.pos)?;
        }
        self.pos = target;
        Ok(self.pos)
    }
}
