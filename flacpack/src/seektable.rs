//! SEEKTABLE metadata block codec.
//!
//! A seek table (metadata block type 3) is an ordered list of 18-byte
//! seek points. Placeholder points carry an all-ones sample offset and
//! may pad the end of the table; their other fields are ignored.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder};
use flacpack_core::bitstream::BitWriter;
use flacpack_core::error::{Error, Result};

/// One entry of a seek table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPoint {
    /// Sample number of the first sample in the target frame.
    pub sample_offset: u64,
    /// Byte offset of the target frame, from the first frame header.
    pub file_offset: u64,
    /// Number of samples in the target frame.
    pub frame_samples: u16,
}

impl SeekPoint {
    /// Sample offset marking a placeholder point.
    pub const PLACEHOLDER: u64 = 0xFFFF_FFFF_FFFF_FFFF;

    /// Create a placeholder point.
    pub fn placeholder() -> Self {
        Self {
            sample_offset: Self::PLACEHOLDER,
            file_offset: 0,
            frame_samples: 0,
        }
    }

    /// Whether this is a placeholder point.
    pub fn is_placeholder(&self) -> bool {
        self.sample_offset == Self::PLACEHOLDER
    }
}

/// A SEEKTABLE metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeekTable {
    /// The seek points, in stream order.
    pub points: Vec<SeekPoint>,
}

/// Serialized bytes per seek point.
const POINT_LEN: usize = 18;

/// A metadata block length is 24 bits, which bounds the point count.
const MAX_POINTS: usize = ((1 << 24) - 1) / POINT_LEN;

impl SeekTable {
    /// Create an empty seek table.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Parse a SEEKTABLE payload.
    ///
    /// The payload must be a whole number of 18-byte points. Ordering is
    /// not enforced here; [`check_values`](SeekTable::check_values) runs
    /// at serialization time.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() % POINT_LEN != 0 {
            return Err(Error::invalid_data("data contains a partial seek point"));
        }
        let points = payload
            .chunks_exact(POINT_LEN)
            .map(|chunk| SeekPoint {
                sample_offset: BigEndian::read_u64(&chunk[0..8]),
                file_offset: BigEndian::read_u64(&chunk[8..16]),
                frame_samples: BigEndian::read_u16(&chunk[16..18]),
            })
            .collect();
        Ok(Self { points })
    }

    /// Verify the ordering invariant: placeholders (if any) form a
    /// suffix, and across the non-placeholder prefix sample offsets are
    /// strictly increasing while file offsets are non-decreasing.
    pub fn check_values(&self) -> Result<()> {
        let mut seen_placeholder = false;
        let mut prev: Option<&SeekPoint> = None;
        for point in &self.points {
            if point.is_placeholder() {
                seen_placeholder = true;
                continue;
            }
            if seen_placeholder {
                return Err(Error::invalid_data(
                    "seek point after a placeholder point",
                ));
            }
            if let Some(prev) = prev {
                if point.sample_offset <= prev.sample_offset {
                    return Err(Error::invalid_data("sample offsets out of order"));
                }
                if point.file_offset < prev.file_offset {
                    return Err(Error::invalid_data("file offsets out of order"));
                }
            }
            prev = Some(point);
        }
        Ok(())
    }

    /// Serialize as a complete metadata block: header then the points.
    pub fn write<W: Write>(&self, out: &mut BitWriter<W>, is_last: bool) -> Result<()> {
        if self.points.len() > MAX_POINTS {
            return Err(Error::invalid_state("too many seek points"));
        }
        self.check_values()?;

        out.write_int(1, is_last as u32)?;
        out.write_int(7, 3)?; // Type
        out.write_int(24, (self.points.len() * POINT_LEN) as u32)?;

        for point in &self.points {
            out.write_int(32, (point.sample_offset >> 32) as u32)?;
            out.write_int(32, point.sample_offset as u32)?;
            out.write_int(32, (point.file_offset >> 32) as u32)?;
            out.write_int(32, point.file_offset as u32)?;
            out.write_int(16, point.frame_samples as u32)?;
        }
        Ok(())
    }
}
