//! Frame header codec.
//!
//! Every FLAC frame starts with a self-contained header: a 14-bit sync
//! code, coded block size / sample rate / channel assignment / sample
//! depth fields, a variable-length UTF-8-style frame or sample position,
//! optional literal tails for the coded fields, and a CRC-8 over the
//! whole header. [`FrameInfo`] is the decoded form; it parses from a
//! [`BitReader`] and serializes through a [`BitWriter`] bit-exactly.

use std::io::Write;

use flacpack_core::bitstream::{BitReader, BitWriter};
use flacpack_core::error::{Error, Result};
use flacpack_core::source::ByteSource;
use tracing::{debug, trace};

/// Block size to 4-bit code, for the sizes with a dedicated code.
const BLOCK_SIZE_CODES: [(u32, u32); 13] = [
    (192, 1),
    (576, 2),
    (1152, 3),
    (2304, 4),
    (4608, 5),
    (256, 8),
    (512, 9),
    (1024, 10),
    (2048, 11),
    (4096, 12),
    (8192, 13),
    (16384, 14),
    (32768, 15),
];

/// Sample depth to 3-bit code. Codes 3 and 7 are reserved.
const SAMPLE_DEPTH_CODES: [(u8, u32); 5] = [(8, 1), (12, 2), (16, 4), (20, 5), (24, 6)];

/// Sample rate to 4-bit code, for the rates with a dedicated code.
const SAMPLE_RATE_CODES: [(u32, u32); 11] = [
    (88200, 1),
    (176400, 2),
    (192000, 3),
    (8000, 4),
    (16000, 5),
    (22050, 6),
    (24000, 7),
    (32000, 8),
    (44100, 9),
    (48000, 10),
    (96000, 11),
];

/// The frame's position within the stream.
///
/// Fixed-block-size streams number whole frames; variable-block-size
/// streams address the first sample of the frame. A header carries
/// exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePosition {
    /// Frame index of a fixed-block-size stream; fits in 31 bits.
    FrameIndex(u32),
    /// First-sample offset of a variable-block-size stream; fits in 36 bits.
    SampleOffset(u64),
}

/// How the frame's channels are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// Independent channels; the count is `1..=8`.
    Independent(u8),
    /// Left/side stereo.
    LeftSide,
    /// Right/side stereo.
    RightSide,
    /// Mid/side stereo.
    MidSide,
}

impl ChannelAssignment {
    /// Decode the 4-bit channel assignment field. Codes 11..=15 are
    /// reserved.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0..=7 => Ok(ChannelAssignment::Independent(code as u8 + 1)),
            8 => Ok(ChannelAssignment::LeftSide),
            9 => Ok(ChannelAssignment::RightSide),
            10 => Ok(ChannelAssignment::MidSide),
            _ => Err(Error::invalid_data("reserved channel assignment")),
        }
    }

    /// The 4-bit wire code.
    pub fn code(&self) -> u32 {
        match self {
            ChannelAssignment::Independent(n) => *n as u32 - 1,
            ChannelAssignment::LeftSide => 8,
            ChannelAssignment::RightSide => 9,
            ChannelAssignment::MidSide => 10,
        }
    }

    /// Number of channels this assignment decodes to.
    pub fn channels(&self) -> u8 {
        match self {
            ChannelAssignment::Independent(n) => *n,
            _ => 2,
        }
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame index or sample offset, depending on the block strategy.
    pub position: FramePosition,
    /// Channel layout.
    pub channel_assignment: ChannelAssignment,
    /// Channel count derived from the assignment.
    pub num_channels: u8,
    /// Samples per channel in this frame, `1..=65536`.
    pub block_size: u32,
    /// Sample rate in Hz; `None` means consult STREAMINFO.
    pub sample_rate: Option<u32>,
    /// Bits per sample; `None` means consult STREAMINFO.
    pub sample_depth: Option<u8>,
    /// Bytes from the sync code through the trailing frame CRC-16;
    /// `None` until the caller has seen the whole frame.
    pub frame_size: Option<u32>,
}

impl FrameInfo {
    /// Parse one frame header, or return `None` on a clean end of stream
    /// at the first byte.
    ///
    /// Resets the reader's CRC spans, so on success the reader's CRC-16
    /// covers the header and keeps accumulating over the frame body.
    pub fn read<S: ByteSource>(input: &mut BitReader<S>) -> Result<Option<FrameInfo>> {
        input.reset_crcs()?;
        let first = match input.read_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };

        let sync = (first as u32) << 6 | input.read_uint(6)?;
        if sync != 0x3FFE {
            return Err(Error::invalid_data("sync code expected"));
        }

        if input.read_uint(1)? != 0 {
            return Err(Error::invalid_data("reserved bit"));
        }
        let block_strategy = input.read_uint(1)?;
        let block_size_code = input.read_uint(4)?;
        let sample_rate_code = input.read_uint(4)?;
        let channel_assignment = ChannelAssignment::from_code(input.read_uint(4)?)?;
        let sample_depth = decode_sample_depth(input.read_uint(3)?)?;
        if input.read_uint(1)? != 0 {
            return Err(Error::invalid_data("reserved bit"));
        }

        let position = read_utf8_integer(input)?;
        let position = if block_strategy == 0 {
            if position >> 31 != 0 {
                return Err(Error::invalid_data("frame index too large"));
            }
            FramePosition::FrameIndex(position as u32)
        } else {
            FramePosition::SampleOffset(position)
        };

        let block_size = decode_block_size(block_size_code, input)?;
        let sample_rate = decode_sample_rate(sample_rate_code, input)?;
        if sample_rate.is_none() || sample_depth.is_none() {
            debug!("frame header defers sample rate or depth to stream info");
        }

        let computed_crc8 = input.crc8()?;
        if input.read_uint(8)? != computed_crc8 as u32 {
            return Err(Error::invalid_data("CRC-8 mismatch"));
        }

        trace!(
            ?position,
            block_size,
            channels = channel_assignment.channels(),
            "parsed frame header"
        );
        Ok(Some(FrameInfo {
            position,
            channel_assignment,
            num_channels: channel_assignment.channels(),
            block_size,
            sample_rate,
            sample_depth,
            frame_size: None,
        }))
    }

    /// Serialize this frame header, including its trailing CRC-8.
    ///
    /// The encoder always emits the variable-block-size form, so the
    /// position must be a [`FramePosition::SampleOffset`].
    pub fn write_header<W: Write>(&self, out: &mut BitWriter<W>) -> Result<()> {
        out.reset_crcs()?;
        out.write_int(14, 0x3FFE)?; // Sync
        out.write_int(1, 0)?; // Reserved
        out.write_int(1, 1)?; // Blocking strategy

        let block_size_code = block_size_code(self.block_size)?;
        out.write_int(4, block_size_code)?;
        let sample_rate_code = sample_rate_code(self.sample_rate)?;
        out.write_int(4, sample_rate_code)?;

        out.write_int(4, self.channel_assignment.code())?;
        out.write_int(3, sample_depth_code(self.sample_depth))?;
        out.write_int(1, 0)?; // Reserved

        // Variable-length: 1 to 7 bytes
        match self.position {
            FramePosition::SampleOffset(offset) => write_utf8_integer(offset, out)?,
            FramePosition::FrameIndex(_) => {
                return Err(Error::invalid_state(
                    "frame header serialization requires a sample offset position",
                ));
            }
        }

        // Variable-length: 0 to 2 bytes
        if block_size_code == 6 {
            out.write_int(8, self.block_size - 1)?;
        } else if block_size_code == 7 {
            out.write_int(16, self.block_size - 1)?;
        }

        // Variable-length: 0 to 2 bytes
        if let Some(rate) = self.sample_rate {
            if sample_rate_code == 12 {
                out.write_int(8, rate)?;
            } else if sample_rate_code == 13 {
                out.write_int(16, rate)?;
            } else if sample_rate_code == 14 {
                out.write_int(16, rate / 10)?;
            }
        }

        let crc8 = out.crc8()?;
        out.write_int(8, crc8 as u32)
    }
}

/// Read a UTF-8-style coded integer of up to 36 bits (1 to 7 bytes).
fn read_utf8_integer<S: ByteSource>(input: &mut BitReader<S>) -> Result<u64> {
    let head = input.read_uint(8)?;
    let n = (!(head << 24)).leading_zeros();
    if n == 0 {
        return Ok(head as u64);
    }
    if n == 1 || n == 8 {
        return Err(Error::invalid_data("invalid UTF-8 coded number"));
    }
    let mut result = head as u64 & (0x7F >> n);
    for _ in 0..n - 1 {
        let b = input.read_uint(8)?;
        if b & 0xC0 != 0x80 {
            return Err(Error::invalid_data("invalid UTF-8 coded number"));
        }
        result = (result << 6) | (b as u64 & 0x3F);
    }
    if result >> 36 != 0 {
        return Err(Error::invalid_data(
            "UTF-8 coded number exceeds 36 bits",
        ));
    }
    Ok(result)
}

/// Write a UTF-8-style coded integer of up to 36 bits.
fn write_utf8_integer<W: Write>(val: u64, out: &mut BitWriter<W>) -> Result<()> {
    if val >> 36 != 0 {
        return Err(Error::invalid_arg("value exceeds 36 bits"));
    }
    let bit_len = 64 - val.leading_zeros();
    if bit_len <= 7 {
        out.write_int(8, val as u32)
    } else {
        let n = (bit_len - 2) / 5;
        out.write_int(8, (0xFF80 >> n) | (val >> (n * 6)) as u32)?;
        for i in (0..n).rev() {
            out.write_int(8, 0x80 | ((val >> (i * 6)) as u32 & 0x3F))?;
        }
        Ok(())
    }
}

/// Decode the 4-bit block size field, reading the literal tail for codes
/// 6 and 7. Code 0 is reserved.
fn decode_block_size<S: ByteSource>(code: u32, input: &mut BitReader<S>) -> Result<u32> {
    match code {
        0 => Err(Error::invalid_data("reserved block size")),
        6 => Ok(input.read_uint(8)? + 1),
        7 => Ok(input.read_uint(16)? + 1),
        _ => BLOCK_SIZE_CODES
            .iter()
            .find(|&&(_, c)| c == code)
            .map(|&(size, _)| size)
            .ok_or_else(|| Error::invalid_data("invalid block size code")),
    }
}

/// Decode the 4-bit sample rate field. Code 0 defers to STREAMINFO; code
/// 15 is invalid.
fn decode_sample_rate<S: ByteSource>(code: u32, input: &mut BitReader<S>) -> Result<Option<u32>> {
    match code {
        0 => Ok(None),
        12 => Ok(Some(input.read_uint(8)?)),
        13 => Ok(Some(input.read_uint(16)?)),
        14 => Ok(Some(input.read_uint(16)? * 10)),
        15 => Err(Error::invalid_data("invalid sample rate")),
        _ => SAMPLE_RATE_CODES
            .iter()
            .find(|&&(_, c)| c == code)
            .map(|&(rate, _)| Some(rate))
            .ok_or_else(|| Error::invalid_data("invalid sample rate code")),
    }
}

/// Decode the 3-bit sample depth field. Code 0 defers to STREAMINFO;
/// codes 3 and 7 are reserved.
fn decode_sample_depth(code: u32) -> Result<Option<u8>> {
    if code == 0 {
        return Ok(None);
    }
    SAMPLE_DEPTH_CODES
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(depth, _)| Some(depth))
        .ok_or_else(|| Error::invalid_data("reserved sample depth"))
}

/// Pick the 4-bit code for a block size, preferring a dedicated code and
/// falling back to the 8- or 16-bit literal forms.
fn block_size_code(block_size: u32) -> Result<u32> {
    if let Some(&(_, code)) = BLOCK_SIZE_CODES.iter().find(|&&(size, _)| size == block_size) {
        Ok(code)
    } else if (1..=256).contains(&block_size) {
        Ok(6)
    } else if (1..=65536).contains(&block_size) {
        Ok(7)
    } else {
        Err(Error::invalid_arg("invalid block size"))
    }
}

/// Pick the 4-bit code for a sample rate. `None` and rates with no
/// compact form defer to STREAMINFO via code 0.
fn sample_rate_code(sample_rate: Option<u32>) -> Result<u32> {
    let rate = match sample_rate {
        None => return Ok(0),
        Some(rate) => rate,
    };
    if rate == 0 || rate > 655_350 {
        return Err(Error::invalid_arg("invalid sample rate"));
    }
    if let Some(&(_, code)) = SAMPLE_RATE_CODES.iter().find(|&&(r, _)| r == rate) {
        Ok(code)
    } else if rate < 256 {
        Ok(12)
    } else if rate < 65536 {
        Ok(13)
    } else if rate % 10 == 0 {
        Ok(14)
    } else {
        Ok(0)
    }
}

/// Pick the 3-bit code for a sample depth; anything without a dedicated
/// code defers to STREAMINFO via code 0.
fn sample_depth_code(sample_depth: Option<u8>) -> u32 {
    match sample_depth {
        None => 0,
        Some(depth) => SAMPLE_DEPTH_CODES
            .iter()
            .find(|&&(d, _)| d == depth)
            .map(|&(_, code)| code)
            .unwrap_or(0),
    }
}
