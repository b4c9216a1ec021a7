//! Seekable byte streams

use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom};
use std::rc::Rc;

/// Trait for types that can Read and Seek
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Total length of a stream. Leaves the stream positioned at the start.
pub fn stream_length(stream: &mut dyn ReadSeek) -> io::Result<u64> {
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// An archive's stream, shared by the archive and the readers it hands out.
///
/// Every consumer seeks before it reads, so sharing one cursor is fine as
/// long as they are not used from several threads at once (the handle is
/// `!Send`, which rules that out).
#[derive(Clone)]
pub struct SharedStream(Rc<RefCell<Box<dyn ReadSeek>>>);

impl SharedStream {
    pub fn new(inner: Box<dyn ReadSeek>) -> Self {
        Self(Rc::new(RefCell::new(inner)))
    }

    /// Run `f` with exclusive access to the underlying stream.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn ReadSeek) -> T) -> T {
        let mut inner = self.0.borrow_mut();
        f(&mut **inner)
    }
}

impl Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(buf)
    }
}

impl Seek for SharedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.borrow_mut().seek(pos)
    }
}

/// A window `[start, start + len)` of an underlying stream.
///
/// Reads stop at the window's end or at the end of the underlying stream,
/// whichever comes first.
pub struct SliceReader<S> {
    inner: S,
    start: u64,
    len: u64,
    pos: u64,
}

impl<S: Read + Seek> SliceReader<S> {
    pub fn new(inner: S, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            pos: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Seek> Read for SliceReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let remaining = self.len - self.pos;
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Read + Seek> Seek for SliceReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(pos, self.pos, self.len)?;
        Ok(self.pos)
    }
}

/// Apply a `SeekFrom` to a cursor over `len` bytes. Seeking past the end is
/// allowed; seeking before the start is not.
pub(crate) fn resolve_seek(pos: SeekFrom, current: u64, len: u64) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::End(delta) => len.checked_add_signed(delta),
        SeekFrom::Current(delta) => current.checked_add_signed(delta),
    };
    target.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start of entry"))
}
