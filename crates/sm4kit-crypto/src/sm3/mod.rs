//! SM3 cryptographic hash algorithm.
//!
//! SM3 is a 256-bit cryptographic hash function standardized by the Chinese
//! government (GB/T 32905-2016). It is structurally similar to SHA-256 and
//! is the hash companion of SM4 in Chinese commercial cryptography. It is
//! exposed here as the crate's [`Digest`] provider.

use sm4kit_types::CryptoError;
use zeroize::Zeroize;

use crate::provider::{Digest, HashAlgorithm};

/// SM3 output size in bytes.
pub const SM3_OUTPUT_SIZE: usize = 32;

/// SM3 block size in bytes.
pub const SM3_BLOCK_SIZE: usize = 64;

const IV: [u32; 8] = [
    0x7380166f, 0x4914b2b9, 0x172442d7, 0xda8a0600, 0xa96f30bc, 0x163138aa, 0xe38dee4d, 0xb0fb0e4e,
];

const T_LOW: u32 = 0x79cc4519;
const T_HIGH: u32 = 0x7a879d8a;

#[inline(always)]
fn p0(x: u32) -> u32 {
    x ^ x.rotate_left(9) ^ x.rotate_left(17)
}

#[inline(always)]
fn p1(x: u32) -> u32 {
    x ^ x.rotate_left(15) ^ x.rotate_left(23)
}

/// Compression function CF over one 64-byte block.
fn compress(state: &mut [u32; 8], block: &[u8; SM3_BLOCK_SIZE]) {
    let mut w = [0u32; 68];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for j in 16..68 {
        w[j] = p1(w[j - 16] ^ w[j - 9] ^ w[j - 3].rotate_left(15))
            ^ w[j - 13].rotate_left(7)
            ^ w[j - 6];
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;
    for j in 0..64 {
        let (t, ff, gg) = if j < 16 {
            (T_LOW, a ^ b ^ c, e ^ f ^ g)
        } else {
            (T_HIGH, (a & b) | (a & c) | (b & c), (e & f) | (!e & g))
        };
        let a12 = a.rotate_left(12);
        let ss1 = a12
            .wrapping_add(e)
            .wrapping_add(t.rotate_left((j % 32) as u32))
            .rotate_left(7);
        let ss2 = ss1 ^ a12;
        let w1 = w[j] ^ w[j + 4];
        let tt1 = ff.wrapping_add(d).wrapping_add(ss2).wrapping_add(w1);
        let tt2 = gg.wrapping_add(h).wrapping_add(ss1).wrapping_add(w[j]);
        d = c;
        c = b.rotate_left(9);
        b = a;
        a = tt1;
        h = g;
        g = f.rotate_left(19);
        f = e;
        e = p0(tt2);
    }

    for (s, v) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *s ^= v;
    }
    w.zeroize();
}

/// SM3 hash context.
#[derive(Clone)]
pub struct Sm3 {
    /// Internal state (eight 32-bit words).
    state: [u32; 8],
    /// Number of bytes processed so far.
    count: u64,
    /// Partial block buffer.
    buffer: [u8; SM3_BLOCK_SIZE],
    /// Number of bytes in the buffer.
    buffer_len: usize,
}

impl Sm3 {
    /// Create a new SM3 hash context.
    pub fn new() -> Self {
        Sm3 {
            state: IV,
            count: 0,
            buffer: [0u8; SM3_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    /// Feed data into the hash computation.
    pub fn update(&mut self, mut data: &[u8]) -> Result<(), CryptoError> {
        self.count = self
            .count
            .checked_add(data.len() as u64)
            .filter(|&n| n < 1 << 61)
            .ok_or(CryptoError::InputOverflow)?;

        if self.buffer_len > 0 {
            let take = (SM3_BLOCK_SIZE - self.buffer_len).min(data.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&data[..take]);
            self.buffer_len += take;
            data = &data[take..];
            if self.buffer_len < SM3_BLOCK_SIZE {
                return Ok(());
            }
            compress(&mut self.state, &self.buffer);
            self.buffer_len = 0;
        }

        let (blocks, rest) = data.as_chunks::<SM3_BLOCK_SIZE>();
        for block in blocks {
            compress(&mut self.state, block);
        }
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
        Ok(())
    }

    /// Finalize the hash and return the 32-byte digest.
    ///
    /// The context is reset afterwards.
    pub fn finish(&mut self) -> Result<[u8; SM3_OUTPUT_SIZE], CryptoError> {
        let bit_len = self.count * 8;

        let mut pad = [0u8; 2 * SM3_BLOCK_SIZE];
        pad[0] = 0x80;
        let pad_len = if self.buffer_len < SM3_BLOCK_SIZE - 8 {
            SM3_BLOCK_SIZE - self.buffer_len
        } else {
            2 * SM3_BLOCK_SIZE - self.buffer_len
        };
        pad[pad_len - 8..pad_len].copy_from_slice(&bit_len.to_be_bytes());

        let mut tail = [0u8; 2 * SM3_BLOCK_SIZE];
        tail[..self.buffer_len].copy_from_slice(&self.buffer[..self.buffer_len]);
        tail[self.buffer_len..self.buffer_len + pad_len].copy_from_slice(&pad[..pad_len]);
        let (blocks, _) = tail[..self.buffer_len + pad_len].as_chunks::<SM3_BLOCK_SIZE>();
        for block in blocks {
            compress(&mut self.state, block);
        }

        let mut out = [0u8; SM3_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        tail.zeroize();
        self.reset();
        Ok(out)
    }

    /// Reset the hash context for a new computation.
    pub fn reset(&mut self) {
        self.state = IV;
        self.count = 0;
        self.buffer.zeroize();
        self.buffer_len = 0;
    }

    /// One-shot: compute the SM3 digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SM3_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sm3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Digest for Sm3 {
    fn output_size(&self) -> usize {
        SM3_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SM3_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        Sm3::update(self, data)
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SM3_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SM3_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        out[..SM3_OUTPUT_SIZE].copy_from_slice(&Sm3::finish(self)?);
        Ok(())
    }

    fn reset(&mut self) {
        Sm3::reset(self)
    }
}

/// Factory for SM3 digests through [`HashAlgorithm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sm3Algorithm;

impl HashAlgorithm for Sm3Algorithm {
    fn new_digest(&self) -> Box<dyn Digest> {
        Box::new(Sm3::new())
    }
}
