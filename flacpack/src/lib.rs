//! # flacpack
//!
//! Stream metadata and frame header codec for the FLAC bit format.
//!
//! This crate implements the format-level pieces everything else in a
//! FLAC pipeline is built on:
//! - [`StreamInfo`]: the STREAMINFO metadata block, with parsing,
//!   validation, serialization, and frame cross-checking
//! - [`SeekTable`]: the SEEKTABLE metadata block with its ordering
//!   invariants
//! - [`FrameInfo`]: frame header parsing and serialization, including the
//!   UTF-8-style position integers and the coded field tables
//! - [`md5_of_samples`]: the STREAMINFO audio hash over interleaved
//!   little-endian PCM
//!
//! Bit-level I/O comes from `flacpack-core`; its [`BitReader`] and
//! [`BitWriter`] are re-exported here for convenience.
//!
//! ## Example
//!
//! ```
//! use flacpack::{StreamInfo, BitWriter};
//!
//! let mut info = StreamInfo::new();
//! info.min_block_size = 4096;
//! info.max_block_size = 4096;
//! info.sample_rate = 44100;
//! info.num_channels = 2;
//! info.sample_depth = 16;
//!
//! let mut bytes = Vec::new();
//! let mut out = BitWriter::new(&mut bytes);
//! info.write(&mut out, true).unwrap();
//! out.close().unwrap();
//! assert_eq!(bytes.len(), 38);
//! ```

pub mod frame;
pub mod md5;
pub mod seektable;
pub mod streaminfo;

pub use frame::{ChannelAssignment, FrameInfo, FramePosition};
pub use md5::md5_of_samples;
pub use seektable::{SeekPoint, SeekTable};
pub use streaminfo::StreamInfo;

pub use flacpack_core::bitstream::{BitReader, BitWriter};
pub use flacpack_core::error::{Error, Result};
pub use flacpack_core::source::{ByteSource, FileSource, MemorySource};
