//! # flacpack-core
//!
//! Bit-level plumbing for the flacpack FLAC codec.
//!
//! This crate provides the building blocks the codec crate is written
//! against:
//! - Error handling types shared across the workspace
//! - A buffered, seek-capable [`BitReader`] with dual CRC tracking and
//!   table-accelerated Rice decoding
//! - A [`BitWriter`] with matching CRC tracking and aligned flushing
//! - The [`ByteSource`] capability implemented by in-memory and
//!   file-backed byte suppliers
//! - Shared CRC-8/CRC-16 and Rice decoding tables, built once per process

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod rice;
pub mod source;

pub use bitstream::{BitReader, BitWriter};
pub use error::{Error, Result};
pub use source::{ByteSource, FileSource, MemorySource};
