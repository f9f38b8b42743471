//! STREAMINFO metadata block codec.
//!
//! STREAMINFO (metadata block type 0) is the mandatory stream descriptor:
//! block and frame size bounds, sample rate, channel count, sample depth,
//! total sample count, and the MD5 of the unencoded audio. The payload is
//! exactly 34 bytes; with the 4-byte metadata block header the serialized
//! form is 38 bytes.

use std::io::Write;

use flacpack_core::bitstream::{BitReader, BitWriter};
use flacpack_core::error::{Error, Result};
use flacpack_core::source::MemorySource;
use tracing::trace;

use crate::frame::FrameInfo;

/// The STREAMINFO stream descriptor.
///
/// Fields are plain public values; the owner may mutate them freely
/// between calls. [`check_values`](StreamInfo::check_values) verifies the
/// full range invariant and runs automatically before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Minimum block size in samples per channel; at least 16.
    pub min_block_size: u16,
    /// Maximum block size in samples per channel; at least `min_block_size`.
    pub max_block_size: u16,
    /// Minimum frame size in bytes; 24-bit, 0 = unknown.
    pub min_frame_size: u32,
    /// Maximum frame size in bytes; 24-bit, 0 = unknown.
    pub max_frame_size: u32,
    /// Sample rate in Hz; 20-bit, in `1..=655350`.
    pub sample_rate: u32,
    /// Number of channels, `1..=8`.
    pub num_channels: u8,
    /// Bits per sample, `4..=32`.
    pub sample_depth: u8,
    /// Total samples per channel; 36-bit, 0 = unknown.
    pub num_samples: u64,
    /// MD5 of the unencoded audio; all-zero = not computed.
    pub md5_hash: [u8; 16],
}

impl StreamInfo {
    /// The "not computed" MD5 sentinel.
    pub const MD5_UNCOMPUTED: [u8; 16] = [0; 16];

    /// Serialized length: 4-byte block header plus 34-byte payload.
    pub const SERIALIZED_LEN: u64 = 38;

    /// Create a blank descriptor.
    ///
    /// Frame sizes, sample count, and hash start at their legal "unknown"
    /// values; block sizes and the sample rate start at zero, which is
    /// invalid until the owner fills them in.
    pub fn new() -> Self {
        Self {
            min_block_size: 0,
            max_block_size: 0,
            min_frame_size: 0,
            max_frame_size: 0,
            sample_rate: 0,
            num_channels: 0,
            sample_depth: 0,
            num_samples: 0,
            md5_hash: Self::MD5_UNCOMPUTED,
        }
    }

    /// Parse a 34-byte STREAMINFO payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != 34 {
            return Err(Error::invalid_arg("STREAMINFO payload must be 34 bytes"));
        }
        let mut input = BitReader::new(MemorySource::new(payload));

        let min_block_size = input.read_uint(16)? as u16;
        let max_block_size = input.read_uint(16)? as u16;
        let min_frame_size = input.read_uint(24)?;
        let max_frame_size = input.read_uint(24)?;
        if min_block_size < 16 {
            return Err(Error::invalid_data("minimum block size less than 16"));
        }
        if max_block_size < min_block_size {
            return Err(Error::invalid_data(
                "maximum block size less than minimum block size",
            ));
        }
        if min_frame_size != 0 && max_frame_size != 0 && max_frame_size < min_frame_size {
            return Err(Error::invalid_data(
                "maximum frame size less than minimum frame size",
            ));
        }
        let sample_rate = input.read_uint(20)?;
        if sample_rate == 0 || sample_rate > 655_350 {
            return Err(Error::invalid_data("invalid sample rate"));
        }
        let num_channels = input.read_uint(3)? as u8 + 1;
        let sample_depth = input.read_uint(5)? as u8 + 1;
        let num_samples = (input.read_uint(18)? as u64) << 18 | input.read_uint(18)? as u64;
        let mut md5_hash = [0u8; 16];
        input.read_fully(&mut md5_hash)?;

        trace!(sample_rate, num_channels, sample_depth, "parsed stream info");
        Ok(Self {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            num_channels,
            sample_depth,
            num_samples,
            md5_hash,
        })
    }

    /// Verify that every field is within its documented range.
    pub fn check_values(&self) -> Result<()> {
        if self.min_block_size < 16 {
            return Err(Error::invalid_state("minimum block size less than 16"));
        }
        if self.max_block_size < self.min_block_size {
            return Err(Error::invalid_state(
                "maximum block size less than minimum block size",
            ));
        }
        if self.min_frame_size >> 24 != 0 {
            return Err(Error::invalid_state("invalid minimum frame size"));
        }
        if self.max_frame_size >> 24 != 0 {
            return Err(Error::invalid_state("invalid maximum frame size"));
        }
        if self.min_frame_size != 0
            && self.max_frame_size != 0
            && self.max_frame_size < self.min_frame_size
        {
            return Err(Error::invalid_state(
                "maximum frame size less than minimum frame size",
            ));
        }
        if self.sample_rate == 0 || self.sample_rate > 655_350 {
            return Err(Error::invalid_state("invalid sample rate"));
        }
        if self.num_channels < 1 || self.num_channels > 8 {
            return Err(Error::invalid_state("invalid number of channels"));
        }
        if self.sample_depth < 4 || self.sample_depth > 32 {
            return Err(Error::invalid_state("invalid sample depth"));
        }
        if self.num_samples >> 36 != 0 {
            return Err(Error::invalid_state("invalid number of samples"));
        }
        Ok(())
    }

    /// Cross-validate a decoded frame header against this descriptor.
    pub fn check_frame(&self, frame: &FrameInfo) -> Result<()> {
        if frame.num_channels != self.num_channels {
            return Err(Error::invalid_data("channel count mismatch"));
        }
        if let Some(rate) = frame.sample_rate {
            if rate != self.sample_rate {
                return Err(Error::invalid_data("sample rate mismatch"));
            }
        }
        if let Some(depth) = frame.sample_depth {
            if depth != self.sample_depth {
                return Err(Error::invalid_data("sample depth mismatch"));
            }
        }
        if self.num_samples != 0 && frame.block_size as u64 > self.num_samples {
            return Err(Error::invalid_data(
                "block size exceeds total number of samples",
            ));
        }
        if frame.block_size > self.max_block_size as u32 {
            return Err(Error::invalid_data("block size exceeds maximum"));
        }
        // Note: when min_block_size == max_block_size, the final block of
        // the stream is still allowed to be smaller than min_block_size.
        if let Some(frame_size) = frame.frame_size {
            if self.min_frame_size != 0 && frame_size < self.min_frame_size {
                return Err(Error::invalid_data("frame size less than minimum"));
            }
            if self.max_frame_size != 0 && frame_size > self.max_frame_size {
                return Err(Error::invalid_data("frame size exceeds maximum"));
            }
        }
        Ok(())
    }

    /// Serialize as a complete metadata block: header then 34-byte payload.
    pub fn write<W: Write>(&self, out: &mut BitWriter<W>, is_last: bool) -> Result<()> {
        self.check_values()?;

        out.write_int(1, is_last as u32)?;
        out.write_int(7, 0)?; // Type
        out.write_int(24, 34)?; // Length

        out.write_int(16, self.min_block_size as u32)?;
        out.write_int(16, self.max_block_size as u32)?;
        out.write_int(24, self.min_frame_size)?;
        out.write_int(24, self.max_frame_size)?;
        out.write_int(20, self.sample_rate)?;
        out.write_int(3, self.num_channels as u32 - 1)?;
        out.write_int(5, self.sample_depth as u32 - 1)?;
        out.write_int(18, (self.num_samples >> 18) as u32)?;
        out.write_int(18, self.num_samples as u32)?;
        for &b in &self.md5_hash {
            out.write_int(8, b as u32)?;
        }
        Ok(())
    }
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self::new()
    }
}
