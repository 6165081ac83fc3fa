//! SM4 S-box through AES-NI.
//!
//! The SM4 and AES S-boxes are both built on inversion in GF(2^8), under
//! different field polynomials and affine maps. A nibble-table affine map
//! (two `pshufb` lookups) carries each byte into the AES representation,
//! `aesenclast` with a zero round key applies the AES S-box, and a second
//! nibble-table map carries the result back and applies the SM4 affine step.

use core::arch::x86_64::*;

use super::{for_each_batch, load4, rounds4, store4};
use crate::sm4::{SM4_BLOCK_SIZE, SM4_ROUNDS};

// ---------------------------------------------------------------------------
// Nibble tables: f(x) = LO[x & 0xf] ^ HI[x >> 4]
// ---------------------------------------------------------------------------

const PRE_LO: [u8; 16] = [
    0x3e, 0xb2, 0x0e, 0x82, 0xbb, 0x37, 0x8b, 0x07, 0xa1, 0x2d, 0x91, 0x1d, 0x24, 0xa8, 0x14, 0x98,
];
const PRE_HI: [u8; 16] = [
    0x00, 0xdc, 0x2e, 0xf2, 0xc5, 0x19, 0xeb, 0x37, 0x08, 0xd4, 0x26, 0xfa, 0xcd, 0x11, 0xe3, 0x3f,
];
const POST_LO: [u8; 16] = [
    0x6c, 0xd4, 0xa6, 0x1e, 0x52, 0xea, 0x98, 0x20, 0x0b, 0xb3, 0xc1, 0x79, 0x35, 0x8d, 0xff, 0x47,
];
const POST_HI: [u8; 16] = [
    0x00, 0xe0, 0x50, 0xb0, 0x9d, 0x7d, 0xcd, 0x2d, 0xc0, 0x20, 0x90, 0x70, 0x5d, 0xbd, 0x0d, 0xed,
];

/// `aesenclast` applies ShiftRows after SubBytes; pre-permuting with the
/// inverse leaves a pure bytewise SubBytes.
const INV_SHIFT_ROWS: [u8; 16] = [0, 13, 10, 7, 4, 1, 14, 11, 8, 5, 2, 15, 12, 9, 6, 3];

struct SboxConsts {
    pre_lo: __m128i,
    pre_hi: __m128i,
    post_lo: __m128i,
    post_hi: __m128i,
    inv_shift_rows: __m128i,
    low_nibble: __m128i,
}

#[inline(always)]
unsafe fn load_table(t: &[u8; 16]) -> __m128i {
    _mm_loadu_si128(t.as_ptr().cast())
}

#[inline(always)]
unsafe fn sbox_consts() -> SboxConsts {
    SboxConsts {
        pre_lo: load_table(&PRE_LO),
        pre_hi: load_table(&PRE_HI),
        post_lo: load_table(&POST_LO),
        post_hi: load_table(&POST_HI),
        inv_shift_rows: load_table(&INV_SHIFT_ROWS),
        low_nibble: _mm_set1_epi8(0x0f),
    }
}

#[inline(always)]
unsafe fn nibble_map(x: __m128i, lo: __m128i, hi: __m128i, mask: __m128i) -> __m128i {
    let l = _mm_and_si128(x, mask);
    let h = _mm_and_si128(_mm_srli_epi16::<4>(x), mask);
    _mm_xor_si128(_mm_shuffle_epi8(lo, l), _mm_shuffle_epi8(hi, h))
}

/// Apply the SM4 S-box to all 16 bytes of `x`.
#[inline(always)]
unsafe fn sbox(x: __m128i, c: &SboxConsts) -> __m128i {
    let y = nibble_map(x, c.pre_lo, c.pre_hi, c.low_nibble);
    let y = _mm_shuffle_epi8(y, c.inv_shift_rows);
    let y = _mm_aesenclast_si128(y, _mm_setzero_si128());
    nibble_map(y, c.post_lo, c.post_hi, c.low_nibble)
}

// ---------------------------------------------------------------------------
// Block processing
// ---------------------------------------------------------------------------

#[target_feature(enable = "sse2,ssse3,aes")]
unsafe fn crypt4(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]; 4]) {
    let c = sbox_consts();
    let x = rounds4(rk, load4(blocks), |t| sbox(t, &c));
    store4(x, blocks);
}

/// Encrypt or decrypt (depending on `rk` order) any number of blocks.
///
/// # Safety
/// The CPU must support SSE2, SSSE3 and AES-NI.
#[target_feature(enable = "sse2,ssse3,aes")]
pub(crate) unsafe fn crypt_blocks(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
    for_each_batch::<4, _>(blocks, |batch| crypt4(rk, batch));
}
