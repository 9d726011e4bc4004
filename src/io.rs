//! Chunk sources and sinks.
//!
//! The codec never sees files, paths or buffers directly. Input arrives from a
//! [`ChunkSource`], pulled one chunk at a time, and output leaves through a
//! [`ChunkSink`], pushed one chunk at a time. Chunk boundaries carry no meaning:
//! a source that yields one byte per chunk produces the same result as one that
//! yields the whole input at once.
//!
//! Provided sources:
//!
//! - `&[u8]`: the whole slice as a single chunk
//! - [`ReadSource`]: any [`std::io::Read`], read in fixed-size chunks
//! - [`IterSource`]: any iterator of byte chunks
//!
//! Every [`std::io::Write`] is a sink.

use std::io::{self, Read, Write};

use crate::options::DEFAULT_CHUNK_SIZE;

/// A producer of raw byte chunks.
pub trait ChunkSource {
    /// Replaces the contents of `buf` with the next chunk.
    ///
    /// Returns `Ok(false)` at end of stream, in which case `buf` is left empty.
    /// An `Ok(true)` with an empty `buf` is allowed and simply means "pull again".
    fn fill_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<bool>;
}

/// A consumer of raw byte chunks. Each push is final once it returns.
pub trait ChunkSink {
    fn push_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn fill_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        (**self).fill_chunk(buf)
    }
}

impl ChunkSource for &[u8] {
    fn fill_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        if self.is_empty() {
            return Ok(false);
        }
        buf.extend_from_slice(self);
        *self = &[];
        Ok(true)
    }
}

impl<W: Write> ChunkSink for W {
    fn push_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_all(chunk)
    }
}

/// Reads a [`std::io::Read`] in chunks of a fixed size.
///
/// # Examples
///
/// ```rust
/// use bncsv::{decode_to_vec, encode, ReadSource};
/// use std::io::Cursor;
///
/// let reader = Cursor::new(b"1,2\n3,4\n".to_vec());
/// let mut binary = Vec::new();
/// encode(ReadSource::with_chunk_size(reader, 3), &mut binary).unwrap();
/// assert_eq!(decode_to_vec(&binary).unwrap(), b"1,2\n3,4\n");
/// ```
pub struct ReadSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ReadSource {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ChunkSource for ReadSource<R> {
    fn fill_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        buf.resize(self.chunk_size, 0);
        loop {
            match self.reader.read(buf) {
                Ok(0) => {
                    buf.clear();
                    return Ok(false);
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    buf.clear();
                    return Err(e);
                }
            }
        }
    }
}

/// Adapts an iterator of byte chunks into a [`ChunkSource`].
///
/// # Examples
///
/// ```rust
/// use bncsv::{encode_to_vec, encode, IterSource};
///
/// let chunks = vec![&b"1.5,"[..], &b"2"[..], &b".5\n"[..]];
/// let mut binary = Vec::new();
/// encode(IterSource::new(chunks), &mut binary).unwrap();
/// assert_eq!(binary, encode_to_vec(b"1.5,2.5\n").unwrap());
/// ```
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        IterSource {
            iter: iter.into_iter(),
        }
    }
}

impl<I> ChunkSource for IterSource<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    fn fill_chunk(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        match self.iter.next() {
            Some(chunk) => {
                buf.extend_from_slice(chunk.as_ref());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Buffers output and pushes it to a sink one chunk at a time.
pub(crate) struct ChunkWriter<K> {
    sink: K,
    buf: Vec<u8>,
    chunk_size: usize,
    written: u64,
}

impl<K: ChunkSink> ChunkWriter<K> {
    pub(crate) fn new(sink: K, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        ChunkWriter {
            sink,
            buf: Vec::with_capacity(chunk_size.min(64 * 1024)),
            chunk_size,
            written: 0,
        }
    }

    #[inline]
    pub(crate) fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(bytes);
        self.written += bytes.len() as u64;
        self.drain_full_chunks()
    }

    /// Bytes accepted so far, including those still buffered.
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    /// Pushes whatever is buffered, even if it is less than a chunk.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.sink.push_chunk(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    fn drain_full_chunks(&mut self) -> io::Result<()> {
        if self.buf.len() < self.chunk_size {
            return Ok(());
        }
        let mut start = 0;
        while self.buf.len() - start >= self.chunk_size {
            self.sink
                .push_chunk(&self.buf[start..start + self.chunk_size])?;
            start += self.chunk_size;
        }
        self.buf.drain(..start);
        Ok(())
    }
}
