//! MD5 digest of unencoded audio samples.
//!
//! STREAMINFO carries an MD5 of the raw audio, computed over the samples
//! interleaved by channel and serialized little-endian at the stream's
//! byte depth. The digest core is self-contained; the audio path feeds it
//! in bounded batches so arbitrarily long streams hash in constant memory.

use byteorder::{ByteOrder, LittleEndian};
use flacpack_core::error::{Error, Result};

/// Samples per digest batch.
const BATCH_SAMPLES: usize = 2048;

/// Hash audio samples the way STREAMINFO expects.
///
/// `channels` holds one sample buffer per channel, each at least
/// `num_samples` long. `depth` is the stream's bits per sample and must
/// be a positive multiple of 8, at most 32. For each sample index the
/// low `depth / 8` bytes of every channel's sample are appended
/// little-endian, channel by channel.
pub fn md5_of_samples(channels: &[Vec<i32>], num_samples: usize, depth: u32) -> Result<[u8; 16]> {
    if depth == 0 || depth > 32 || depth % 8 != 0 {
        return Err(Error::invalid_arg("unsupported sample depth"));
    }
    if channels.iter().any(|ch| ch.len() < num_samples) {
        return Err(Error::invalid_arg("channel holds fewer samples than requested"));
    }

    let bytes_per_sample = (depth / 8) as usize;
    let mut digest = Md5::new();
    let mut buf = Vec::with_capacity(channels.len() * bytes_per_sample * BATCH_SAMPLES.min(num_samples));
    let mut scratch = [0u8; 4];

    for start in (0..num_samples).step_by(BATCH_SAMPLES) {
        let end = (start + BATCH_SAMPLES).min(num_samples);
        buf.clear();
        for i in start..end {
            for channel in channels {
                LittleEndian::write_i32(&mut scratch, channel[i]);
                buf.extend_from_slice(&scratch[..bytes_per_sample]);
            }
        }
        digest.update(&buf);
    }

    Ok(digest.finalize())
}

/// Incremental MD5 over 64-byte blocks.
struct Md5 {
    state: [u32; 4],
    len_bytes: u64,
    buffer: [u8; 64],
    buffered: usize,
}

/// Per-round left-rotation amounts.
const S: [[u32; 4]; 4] = [
    [7, 12, 17, 22],
    [5, 9, 14, 20],
    [4, 11, 16, 23],
    [6, 10, 15, 21],
];

/// Sine-derived additive constants.
const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee,
    0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be,
    0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa,
    0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed,
    0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c,
    0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05,
    0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039,
    0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1,
    0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

impl Md5 {
    fn new() -> Self {
        Self {
            state: [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476],
            len_bytes: 0,
            buffer: [0; 64],
            buffered: 0,
        }
    }

    fn update(&mut self, mut input: &[u8]) {
        self.len_bytes = self.len_bytes.wrapping_add(input.len() as u64);

        if self.buffered > 0 {
            let take = (64 - self.buffered).min(input.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&input[..take]);
            self.buffered += take;
            input = &input[take..];
            if self.buffered == 64 {
                let block = self.buffer;
                self.transform(&block);
                self.buffered = 0;
            }
        }

        while let Some((block, rest)) = input.split_first_chunk::<64>() {
            self.transform(block);
            input = rest;
        }

        self.buffer[..input.len()].copy_from_slice(input);
        self.buffered += input.len();
    }

    fn finalize(mut self) -> [u8; 16] {
        let bit_len = self.len_bytes.wrapping_mul(8);

        let mut padding = [0u8; 72];
        padding[0] = 0x80;
        let pad_len = if self.buffered < 56 {
            56 - self.buffered
        } else {
            120 - self.buffered
        };
        self.update(&padding[..pad_len]);

        let mut length = [0u8; 8];
        LittleEndian::write_u64(&mut length, bit_len);
        self.update(&length);

        let mut result = [0u8; 16];
        for (chunk, &word) in result.chunks_exact_mut(4).zip(self.state.iter()) {
            LittleEndian::write_u32(chunk, word);
        }
        result
    }

    fn transform(&mut self, block: &[u8; 64]) {
        let mut x = [0u32; 16];
        for (word, chunk) in x.iter_mut().zip(block.chunks_exact(4)) {
            *word = LittleEndian::read_u32(chunk);
        }

        let mut a = self.state[0];
        let mut b = self.state[1];
        let mut c = self.state[2];
        let mut d = self.state[3];

        for i in 0..64 {
            let (f, g) = match i {
                0..=15 => ((b & c) | (!b & d), i),
                16..=31 => ((d & b) | (!d & c), (5 * i + 1) % 16),
                32..=47 => (b ^ c ^ d, (3 * i + 5) % 16),
                _ => (c ^ (b | !d), (7 * i) % 16),
            };

            let rotated = a
                .wrapping_add(f)
                .wrapping_add(K[i])
                .wrapping_add(x[g])
                .rotate_left(S[i / 16][i % 4]);
            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(rotated);
        }

        self.state[0] = self.state[0].wrapping_add(a);
        self.state[1] = self.state[1].wrapping_add(b);
        self.state[2] = self.state[2].wrapping_add(c);
        self.state[3] = self.state[3].wrapping_add(d);
    }
}
