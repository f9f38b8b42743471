//! Raw byte sources feeding a [`BitReader`](crate::bitstream::BitReader).
//!
//! A source only supplies bytes; all buffering, bit extraction, and CRC
//! state lives on the reader. Length and seeking are optional capabilities
//! and fail with [`Error::Unsupported`] where a source cannot provide them.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// A raw byte supplier for bit-level reading.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning the number of
    /// bytes read. Returning 0 signals end of stream.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Total length of the source in bytes, if known.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Reposition so the next `read_into` starts at byte `pos`.
    fn seek_to(&mut self, _pos: u64) -> Result<()> {
        Err(Error::unsupported("source is not seekable"))
    }
}

/// An in-memory byte source over a borrowed slice. Seekable, length known.
pub struct MemorySource<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> MemorySource<'a> {
    /// Create a source reading from the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl ByteSource for MemorySource<'_> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.offset);
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(Error::invalid_arg("seek position past end of data"));
        }
        self.offset = pos as usize;
        Ok(())
    }
}

/// A file-backed byte source. Seekable; length from file metadata.
pub struct FileSource {
    file: File,
    length: u64,
}

impl FileSource {
    /// Wrap an open file, capturing its current length.
    pub fn new(file: File) -> Result<Self> {
        let length = file.metadata()?.len();
        Ok(Self { file, length })
    }

    /// Open the file at `path` for reading.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl ByteSource for FileSource {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn len(&self) -> Option<u64> {
        Some(self.length)
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}
