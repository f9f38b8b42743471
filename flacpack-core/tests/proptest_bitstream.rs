//! Property-based tests for bitstream operations.
//!
//! Uses proptest to verify round-trip correctness of BitReader/BitWriter,
//! the position and CRC span laws, and agreement between the table-driven
//! and bit-by-bit Rice decoding paths.

use proptest::prelude::*;

use flacpack_core::bitstream::{BitReader, BitWriter};
use flacpack_core::crc;
use flacpack_core::source::MemorySource;

/// Rice-encode one signed value: unary quotient (zeros terminated by a
/// one), then a `param`-bit remainder.
fn rice_encode<W: std::io::Write>(writer: &mut BitWriter<W>, value: i64, param: u32) {
    let unsigned = if value >= 0 {
        (value as u64) << 1
    } else {
        (((-(value + 1)) as u64) << 1) | 1
    };
    let mut quotient = unsigned >> param;
    while quotient >= 32 {
        writer.write_int(32, 0).unwrap();
        quotient -= 32;
    }
    writer.write_int(quotient as u32, 0).unwrap();
    writer.write_int(1, 1).unwrap();
    writer.write_int(param, (unsigned & ((1u64 << param) - 1)) as u32).unwrap();
}

// =============================================================================
// BitReader/BitWriter Round-Trip Tests
// =============================================================================

proptest! {
    /// Writing and reading arbitrary bit widths produces the same value.
    #[test]
    fn roundtrip_bits_variable_width(value in any::<u32>(), width in 1u32..=32) {
        let masked = if width == 32 { value } else { value & ((1 << width) - 1) };

        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        writer.write_int(width, masked).unwrap();
        writer.align_to_byte().unwrap();
        prop_assert_eq!(writer.byte_count(), (width as u64 + 7) / 8);
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        prop_assert_eq!(reader.read_uint(width).unwrap(), masked);
    }

    /// A mixed sequence of writes reads back field by field.
    #[test]
    fn roundtrip_multiple_values(
        v1 in 0u32..=0xFF,
        v2 in 0u32..=0xF,
        v3 in 0u32..=0x3F,
        v4 in 0u32..=0x1
    ) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        writer.write_int(8, v1).unwrap();
        writer.write_int(4, v2).unwrap();
        writer.write_int(6, v3).unwrap();
        writer.write_int(1, v4).unwrap();
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        prop_assert_eq!(reader.read_uint(8).unwrap(), v1);
        prop_assert_eq!(reader.read_uint(4).unwrap(), v2);
        prop_assert_eq!(reader.read_uint(6).unwrap(), v3);
        prop_assert_eq!(reader.read_uint(1).unwrap(), v4);
    }

    /// Sign extension round-trips through write-as-unsigned.
    #[test]
    fn roundtrip_signed(value in -0x8000i32..0x8000, width in 17u32..=32) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        writer.write_int(width, value as u32).unwrap();
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        prop_assert_eq!(reader.read_signed_int(width).unwrap(), value);
    }
}

// =============================================================================
// Position and CRC Span Laws
// =============================================================================

proptest! {
    /// After reading n bits in total, position()*8 + bit_position() == n.
    #[test]
    fn bit_position_law(widths in prop::collection::vec(0u32..=32, 1..50)) {
        let data = vec![0xA5u8; 256];
        let mut reader = BitReader::new(MemorySource::new(&data));

        let mut total: u64 = 0;
        for &w in &widths {
            if (total + w as u64) > data.len() as u64 * 8 {
                break;
            }
            reader.read_uint(w).unwrap();
            total += w as u64;
            prop_assert_eq!(reader.position() * 8 + reader.bit_position() as u64, total);
        }
    }

    /// Resetting CRCs at byte offset a and reading through byte offset b
    /// yields the standalone CRC of data[a..b].
    #[test]
    fn crc_span_law(data in prop::collection::vec(any::<u8>(), 2..512), split in 0usize..512) {
        let a = split % data.len();
        let mut reader = BitReader::new(MemorySource::new(&data));
        let mut skip = vec![0u8; a];
        reader.read_fully(&mut skip).unwrap();
        reader.reset_crcs().unwrap();
        let mut rest = vec![0u8; data.len() - a];
        reader.read_fully(&mut rest).unwrap();
        prop_assert_eq!(reader.crc8().unwrap(), crc::crc8(&data[a..]));
        prop_assert_eq!(reader.crc16().unwrap(), crc::crc16(&data[a..]));
    }

    /// Writer and reader agree on the CRC of any byte span.
    #[test]
    fn crc_writer_reader_agreement(data in prop::collection::vec(any::<u8>(), 1..256)) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        writer.reset_crcs().unwrap();
        for &b in &data {
            writer.write_int(8, b as u32).unwrap();
        }
        let wcrc8 = writer.crc8().unwrap();
        let wcrc16 = writer.crc16().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        reader.reset_crcs().unwrap();
        let mut buf = vec![0u8; data.len()];
        reader.read_fully(&mut buf).unwrap();
        prop_assert_eq!(reader.crc8().unwrap(), wcrc8);
        prop_assert_eq!(reader.crc16().unwrap(), wcrc16);
    }
}

// =============================================================================
// Rice Decoder Equivalence
// =============================================================================

proptest! {
    /// Encoded values decode back exactly, whichever path handles them.
    #[test]
    fn rice_roundtrip(
        values in prop::collection::vec(-2000i64..2000, 1..80),
        param in 0u32..=14
    ) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        for &v in &values {
            rice_encode(&mut writer, v, param);
        }
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        let mut out = vec![0i64; values.len()];
        let len = values.len();
        reader.read_rice_signed_ints(param, &mut out, 0, len).unwrap();
        prop_assert_eq!(out, values);
    }

    /// Decoding everything in one call (fast path engaged) agrees with
    /// decoding one value per call (slow path only, since the fast path
    /// needs a full chunk of four).
    #[test]
    fn rice_fast_slow_agreement(
        values in prop::collection::vec(-2000i64..2000, 4..80),
        param in 0u32..=14
    ) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        for &v in &values {
            rice_encode(&mut writer, v, param);
        }
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let len = values.len();

        let mut bulk_reader = BitReader::new(MemorySource::new(&bytes));
        let mut bulk = vec![0i64; len];
        bulk_reader.read_rice_signed_ints(param, &mut bulk, 0, len).unwrap();

        let mut single_reader = BitReader::new(MemorySource::new(&bytes));
        let mut single = vec![0i64; len];
        for i in 0..len {
            single_reader.read_rice_signed_ints(param, &mut single, i, i + 1).unwrap();
        }

        prop_assert_eq!(&bulk, &values);
        prop_assert_eq!(bulk, single);
    }

    /// Both paths leave the reader at the same stream position.
    #[test]
    fn rice_position_agreement(
        values in prop::collection::vec(-512i64..512, 4..64),
        param in 0u32..=10
    ) {
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        for &v in &values {
            rice_encode(&mut writer, v, param);
        }
        // Trailing byte so both readers can settle on a position.
        writer.align_to_byte().unwrap();
        writer.write_int(8, 0xA5).unwrap();
        writer.close().unwrap();

        let len = values.len();

        let mut bulk_reader = BitReader::new(MemorySource::new(&bytes));
        let mut bulk = vec![0i64; len];
        bulk_reader.read_rice_signed_ints(param, &mut bulk, 0, len).unwrap();
        let bulk_pos = bulk_reader.position() * 8 + bulk_reader.bit_position() as u64;

        let mut single_reader = BitReader::new(MemorySource::new(&bytes));
        let mut single = vec![0i64; len];
        for i in 0..len {
            single_reader.read_rice_signed_ints(param, &mut single, i, i + 1).unwrap();
        }
        let single_pos = single_reader.position() * 8 + single_reader.bit_position() as u64;

        prop_assert_eq!(bulk_pos, single_pos);
    }
}

// =============================================================================
// Non-proptest Unit Tests for Edge Cases
// =============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_read_uint_zero_consumes_nothing() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(MemorySource::new(&data));
        assert_eq!(reader.read_uint(0).unwrap(), 0);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.bit_position(), 0);
    }

    #[test]
    fn test_read_uint_32_is_unmasked() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BitReader::new(MemorySource::new(&data));
        assert_eq!(reader.read_uint(32).unwrap(), u32::MAX);
    }

    #[test]
    fn test_rice_zero_param_large_quotient() {
        // Quotient of 100 with k=0 spans multiple bytes of zeros.
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        rice_encode(&mut writer, 50, 0);
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        let mut out = [0i64; 1];
        reader.read_rice_signed_ints(0, &mut out, 0, 1).unwrap();
        assert_eq!(out[0], 50);
    }

    #[test]
    fn test_rice_decode_spans_buffer_refill() {
        // Enough encoded symbols to force the reader through at least one
        // internal 4096-byte buffer refill mid-decode.
        let values: Vec<i64> = (0..8192).map(|i| (i % 1000) - 500).collect();
        let mut bytes = Vec::new();
        let mut writer = BitWriter::new(&mut bytes);
        for &v in &values {
            rice_encode(&mut writer, v, 6);
        }
        writer.align_to_byte().unwrap();
        writer.close().unwrap();

        let mut reader = BitReader::new(MemorySource::new(&bytes));
        let mut out = vec![0i64; values.len()];
        let len = values.len();
        reader.read_rice_signed_ints(6, &mut out, 0, len).unwrap();
        assert_eq!(out, values);
    }
}
