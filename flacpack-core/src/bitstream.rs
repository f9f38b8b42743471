//! Bit-level reading and writing with dual CRC tracking.
//!
//! This module provides the two workhorses of the codec: a buffered,
//! seek-capable [`BitReader`] over a [`ByteSource`], and a [`BitWriter`]
//! over any [`std::io::Write`] sink. Both read and write integers
//! MSB-first and maintain running CRC-8 and CRC-16 accumulators over
//! caller-delimited byte spans, which is how FLAC validates frame headers
//! and whole frames without a second pass over the data.

use std::io::Write;

use crate::crc::{CRC16_TABLE, CRC8_TABLE};
use crate::error::{Error, Result};
use crate::rice::{
    RICE_DECODING_CHUNK, RICE_DECODING_TABLES, RICE_DECODING_TABLE_BITS,
    RICE_DECODING_TABLE_LEN, RICE_DECODING_TABLE_MASK,
};
use crate::source::ByteSource;

/// Size of the byte buffer between the source and the bit buffer.
const BUF_SIZE: usize = 4096;

/// A buffered bit-level reader over a raw byte source.
///
/// The reader pulls bytes from the source through a 4096-byte buffer and
/// serves them out of a 64-bit bit buffer, MSB-first. CRC-8 and CRC-16
/// accumulators cover every byte consumed since the last [`reset_crcs`]
/// (or seek, or construction); the update is lazy, running over buffered
/// spans in bulk rather than per bit.
///
/// [`reset_crcs`]: BitReader::reset_crcs
pub struct BitReader<S: ByteSource> {
    source: S,
    /// Buffered source bytes; `byte_buffer[0]` logically sits at stream
    /// position `byte_buffer_start_pos`.
    byte_buffer: Box<[u8]>,
    byte_buffer_start_pos: u64,
    /// Bytes currently loaded.
    byte_buffer_len: usize,
    /// Next byte to move into the bit buffer.
    byte_buffer_index: usize,
    source_eof: bool,
    /// Low `bit_buffer_len` bits are fresh; anything above is garbage.
    bit_buffer: u64,
    bit_buffer_len: u32,
    /// Buffer index where the current CRC span starts.
    crc_start_index: usize,
    crc8: u8,
    crc16: u16,
    closed: bool,
}

impl<S: ByteSource> BitReader<S> {
    /// Create a reader positioned at the start of `source`.
    pub fn new(source: S) -> Self {
        let mut reader = Self {
            source,
            byte_buffer: vec![0u8; BUF_SIZE].into_boxed_slice(),
            byte_buffer_start_pos: 0,
            byte_buffer_len: 0,
            byte_buffer_index: 0,
            source_eof: false,
            bit_buffer: 0,
            bit_buffer_len: 0,
            crc_start_index: 0,
            crc8: 0,
            crc16: 0,
            closed: false,
        };
        reader.position_changed(0);
        reader
    }

    /// Total byte length of the source, if it can report one.
    pub fn length(&mut self) -> Result<u64> {
        self.check_open()?;
        self.source
            .len()
            .ok_or_else(|| Error::unsupported("source length is unknown"))
    }

    /// Byte offset of the next bit to be read. A partially consumed byte
    /// counts as unread.
    pub fn position(&self) -> u64 {
        self.byte_buffer_start_pos + self.byte_buffer_index as u64
            - (self.bit_buffer_len as u64 + 7) / 8
    }

    /// Number of bits consumed within the current byte, in `0..8`.
    pub fn bit_position(&self) -> u32 {
        (64 - self.bit_buffer_len) % 8
    }

    /// Position the next read at byte `pos` from the start of the source.
    ///
    /// Discards buffered bits and resets both CRC spans. Fails with
    /// `Unsupported` for non-seekable sources.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.check_open()?;
        self.source.seek_to(pos)?;
        self.position_changed(pos);
        Ok(())
    }

    /// Read an `n`-bit unsigned integer, MSB-first, for `0 <= n <= 32`.
    pub fn read_uint(&mut self, n: u32) -> Result<u32> {
        self.check_open()?;
        if n > 32 {
            return Err(Error::invalid_arg("cannot read more than 32 bits at once"));
        }
        if n == 0 {
            return Ok(0);
        }
        while self.bit_buffer_len < n {
            let b = self.read_underlying_byte()?.ok_or(Error::EndOfStream)?;
            self.bit_buffer = (self.bit_buffer << 8) | b as u64;
            self.bit_buffer_len += 8;
        }
        let mut result = (self.bit_buffer >> (self.bit_buffer_len - n)) as u32;
        if n < 32 {
            result &= (1 << n) - 1;
        }
        self.bit_buffer_len -= n;
        Ok(result)
    }

    /// Read an `n`-bit value and sign-extend it to 32 bits.
    pub fn read_signed_int(&mut self, n: u32) -> Result<i32> {
        let val = self.read_uint(n)?;
        if n == 0 {
            return Ok(0);
        }
        let shift = 32 - n;
        Ok(((val as i32) << shift) >> shift)
    }

    /// Read the next whole byte, or `None` at end of stream.
    ///
    /// Must be called at a byte boundary.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.check_open()?;
        self.check_byte_aligned()?;
        if self.bit_buffer_len >= 8 {
            Ok(Some(self.read_uint(8)? as u8))
        } else {
            self.read_underlying_byte()
        }
    }

    /// Fill `buf` completely, failing with `EndOfStream` on a short read.
    ///
    /// Must be called at a byte boundary.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_open()?;
        self.check_byte_aligned()?;
        for b in buf.iter_mut() {
            *b = self.read_uint(8)? as u8;
        }
        Ok(())
    }

    /// Decode Rice-coded signed integers with the given parameter into
    /// `result[start..end]`.
    ///
    /// `param` must be in `0..=31`. Symbols short enough for the
    /// acceleration tables are decoded four per iteration straight out of
    /// the bit buffer; anything longer falls back to bit-by-bit unary
    /// decoding. A unary run reaching `1 << (53 - param)` fails with
    /// `InvalidData`, keeping every decoded value within a signed 53-bit
    /// range so downstream prediction arithmetic cannot overflow.
    pub fn read_rice_signed_ints(
        &mut self,
        param: u32,
        result: &mut [i64],
        start: usize,
        end: usize,
    ) -> Result<()> {
        self.check_open()?;
        if param > 31 {
            return Err(Error::invalid_arg(
                "Rice parameter must be between 0 and 31 inclusive",
            ));
        }
        let unary_limit: u64 = 1 << (53 - param);
        // Parameter 31 has no table; its symbols cannot fit the index
        // width anyway, so everything goes through the slow path.
        let table = if param < RICE_DECODING_TABLE_LEN {
            Some(&RICE_DECODING_TABLES[param as usize])
        } else {
            None
        };

        let mut start = start;
        loop {
            if let Some(table) = table {
                // Fast path: decode in chunks of four while the bit
                // buffer holds enough for a full chunk and the byte
                // buffer can refill it without touching the source.
                'chunks: while start + RICE_DECODING_CHUNK <= end {
                    if self.bit_buffer_len < RICE_DECODING_CHUNK as u32 * RICE_DECODING_TABLE_BITS {
                        if self.byte_buffer_index + 8 <= self.byte_buffer_len {
                            self.fill_bit_buffer()?;
                        } else {
                            break 'chunks;
                        }
                    }
                    for _ in 0..RICE_DECODING_CHUNK {
                        let idx = ((self.bit_buffer
                            >> (self.bit_buffer_len - RICE_DECODING_TABLE_BITS))
                            & RICE_DECODING_TABLE_MASK) as usize;
                        let consumed = table.consumed[idx];
                        if consumed == 0 {
                            break 'chunks;
                        }
                        self.bit_buffer_len -= consumed as u32;
                        result[start] = table.values[idx] as i64;
                        start += 1;
                    }
                }
            }

            if start >= end {
                return Ok(());
            }

            // Slow path: one symbol, unary quotient then binary remainder.
            let mut quotient: u64 = 0;
            while self.read_uint(1)? == 0 {
                if quotient >= unary_limit {
                    return Err(Error::invalid_data("residual value too large"));
                }
                quotient += 1;
            }
            let val = (quotient << param) | self.read_uint(param)? as u64;
            result[start] = ((val >> 1) as i64) ^ -((val & 1) as i64);
            start += 1;
        }
    }

    /// Mark the current (byte-aligned) position as the start of both CRC
    /// spans and zero the accumulators.
    pub fn reset_crcs(&mut self) -> Result<()> {
        self.check_open()?;
        self.check_byte_aligned()?;
        self.crc_start_index = self
            .byte_buffer_index
            .saturating_sub((self.bit_buffer_len / 8) as usize);
        self.crc8 = 0;
        self.crc16 = 0;
        Ok(())
    }

    /// CRC-8 over the bytes consumed since the last CRC reset.
    ///
    /// Must be called at a byte boundary. Bytes sitting in the bit buffer
    /// but not yet consumed are excluded from the span.
    pub fn crc8(&mut self) -> Result<u8> {
        self.check_open()?;
        self.check_byte_aligned()?;
        self.update_crcs(self.bit_buffer_len / 8);
        Ok(self.crc8)
    }

    /// CRC-16 over the bytes consumed since the last CRC reset.
    ///
    /// Must be called at a byte boundary.
    pub fn crc16(&mut self) -> Result<u16> {
        self.check_open()?;
        self.check_byte_aligned()?;
        self.update_crcs(self.bit_buffer_len / 8);
        Ok(self.crc16)
    }

    /// Invalidate the reader. Idempotent; every later operation fails
    /// with `InvalidState`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source_eof = true;
        self.byte_buffer_len = 0;
        self.byte_buffer_index = 0;
        self.bit_buffer = 0;
        self.bit_buffer_len = 0;
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::invalid_state("reader is closed"))
        } else {
            Ok(())
        }
    }

    fn check_byte_aligned(&self) -> Result<()> {
        if self.bit_buffer_len % 8 != 0 {
            Err(Error::NotAligned)
        } else {
            Ok(())
        }
    }

    /// Reset all buffer state to an empty view at stream position `pos`.
    fn position_changed(&mut self, pos: u64) {
        self.byte_buffer_start_pos = pos;
        self.byte_buffer_len = 0;
        self.byte_buffer_index = 0;
        self.source_eof = false;
        self.bit_buffer = 0;
        self.bit_buffer_len = 0;
        self.crc_start_index = 0;
        self.crc8 = 0;
        self.crc16 = 0;
    }

    /// Pull the next byte out of the byte buffer, refilling it from the
    /// source when exhausted. `None` means end of stream.
    fn read_underlying_byte(&mut self) -> Result<Option<u8>> {
        if self.byte_buffer_index >= self.byte_buffer_len {
            if self.source_eof {
                return Ok(None);
            }
            // Settle pending CRC work against the old buffer contents
            // before they are overwritten.
            self.update_crcs(0);
            self.byte_buffer_start_pos += self.byte_buffer_len as u64;
            let n = self.source.read_into(&mut self.byte_buffer)?;
            self.byte_buffer_len = n;
            self.byte_buffer_index = 0;
            self.crc_start_index = 0;
            if n == 0 {
                self.source_eof = true;
                return Ok(None);
            }
        }
        let b = self.byte_buffer[self.byte_buffer_index];
        self.byte_buffer_index += 1;
        Ok(Some(b))
    }

    /// Top up the bit buffer with as many whole bytes as fit, bulk-loading
    /// from the byte buffer when possible.
    fn fill_bit_buffer(&mut self) -> Result<()> {
        let i = self.byte_buffer_index;
        let n = (((64 - self.bit_buffer_len) >> 3) as usize).min(self.byte_buffer_len - i);
        if n > 0 {
            for &b in &self.byte_buffer[i..i + n] {
                self.bit_buffer = (self.bit_buffer << 8) | b as u64;
            }
            self.bit_buffer_len += (n as u32) << 3;
        } else if self.bit_buffer_len <= 56 {
            let b = self.read_underlying_byte()?.ok_or(Error::EndOfStream)?;
            self.bit_buffer = (self.bit_buffer << 8) | b as u64;
            self.bit_buffer_len += 8;
        }
        self.byte_buffer_index += n;
        Ok(())
    }

    /// Run both CRCs over buffered bytes from the span start up to the
    /// consumption point, excluding `unused_trailing_bytes` whole bytes
    /// that are sitting in the bit buffer unconsumed.
    fn update_crcs(&mut self, unused_trailing_bytes: u32) {
        let end = self
            .byte_buffer_index
            .saturating_sub(unused_trailing_bytes as usize);
        if end <= self.crc_start_index {
            return;
        }
        let crc8_table = &*CRC8_TABLE;
        let crc16_table = &*CRC16_TABLE;
        for &b in &self.byte_buffer[self.crc_start_index..end] {
            self.crc8 = crc8_table[(self.crc8 ^ b) as usize];
            self.crc16 =
                (self.crc16 << 8) ^ crc16_table[((self.crc16 >> 8) as u8 ^ b) as usize];
        }
        self.crc_start_index = end;
    }
}

/// A bit-level writer over a byte sink, MSB-first, with the same dual CRC
/// tracking as [`BitReader`].
///
/// Bits accumulate in a 64-bit buffer; whole bytes drain to the sink on
/// [`flush`], updating both CRCs per byte. The CRC update here is bitwise
/// rather than table-driven; the write path is dominated by the sink, not
/// the checksum.
///
/// [`flush`]: BitWriter::flush
pub struct BitWriter<W: Write> {
    sink: W,
    /// Low `bit_buffer_len` bits are pending output.
    bit_buffer: u64,
    bit_buffer_len: u32,
    /// Bytes handed to the sink so far.
    byte_count: u64,
    crc8: u16,
    crc16: u32,
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer over `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            bit_buffer: 0,
            bit_buffer_len: 0,
            byte_count: 0,
            crc8: 0,
            crc16: 0,
            closed: false,
        }
    }

    /// Append the low `n` bits of `val`, for `0 <= n <= 32`. Bits of
    /// `val` above bit `n` are ignored.
    pub fn write_int(&mut self, n: u32, val: u32) -> Result<()> {
        self.check_open()?;
        if n > 32 {
            return Err(Error::invalid_arg("cannot write more than 32 bits at once"));
        }
        if self.bit_buffer_len + n > 64 {
            self.flush()?;
        }
        self.bit_buffer <<= n;
        self.bit_buffer |= val as u64 & ((1u64 << n) - 1);
        self.bit_buffer_len += n;
        Ok(())
    }

    /// Drain whole bytes to the sink, leaving `0..8` bits pending.
    pub fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        while self.bit_buffer_len >= 8 {
            self.bit_buffer_len -= 8;
            let b = ((self.bit_buffer >> self.bit_buffer_len) & 0xFF) as u8;
            self.sink.write_all(&[b])?;
            self.byte_count += 1;
            self.crc8 ^= b as u16;
            self.crc16 ^= (b as u32) << 8;
            for _ in 0..8 {
                self.crc8 <<= 1;
                self.crc16 <<= 1;
                self.crc8 ^= (self.crc8 >> 8) * 0x107;
                self.crc16 ^= (self.crc16 >> 16) * 0x18005;
            }
        }
        Ok(())
    }

    /// Pad with zero bits to the next byte boundary.
    pub fn align_to_byte(&mut self) -> Result<()> {
        self.write_int((64 - self.bit_buffer_len) % 8, 0)
    }

    /// Flush to a byte boundary and zero both CRC accumulators.
    pub fn reset_crcs(&mut self) -> Result<()> {
        self.flush()?;
        self.crc8 = 0;
        self.crc16 = 0;
        Ok(())
    }

    /// CRC-8 over the bytes emitted since the last CRC reset.
    ///
    /// Must be called at a byte boundary.
    pub fn crc8(&mut self) -> Result<u8> {
        self.check_open()?;
        self.check_byte_aligned()?;
        self.flush()?;
        Ok(self.crc8 as u8)
    }

    /// CRC-16 over the bytes emitted since the last CRC reset.
    ///
    /// Must be called at a byte boundary.
    pub fn crc16(&mut self) -> Result<u16> {
        self.check_open()?;
        self.check_byte_aligned()?;
        self.flush()?;
        Ok(self.crc16 as u16)
    }

    /// Total bytes written, counting whole bytes still in the bit buffer.
    pub fn byte_count(&self) -> u64 {
        self.byte_count + (self.bit_buffer_len / 8) as u64
    }

    /// Flush pending bytes and the sink. Must be byte-aligned. Idempotent;
    /// every later operation fails with `InvalidState`.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.check_byte_aligned()?;
        self.flush()?;
        self.sink.flush()?;
        self.closed = true;
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::invalid_state("writer is closed"))
        } else {
            Ok(())
        }
    }

    fn check_byte_aligned(&self) -> Result<()> {
        if self.bit_buffer_len % 8 != 0 {
            Err(Error::NotAligned)
        } else {
            Ok(())
        }
    }
}
