//! x86-64 vectorized SM4 backends.
//!
//! Blocks are processed four at a time per 128-bit lane. After a byte swap
//! and a 4x4 word transpose, register `k` holds state word `k` of every
//! block, so one round is a handful of whole-register operations. The
//! backends differ only in how they evaluate the S-box.

use core::arch::x86_64::*;

use super::SM4_BLOCK_SIZE;

pub(crate) mod aes_ni;
pub(crate) mod avx512;
pub(crate) mod gfni;

/// Reverses the bytes of each 32-bit word.
const BSWAP32: [u8; 16] = [3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, 15, 14, 13, 12];

/// Affine maps around the SM4 S-box, as 8x8 bit matrices for GFNI.
///
/// S(x) = gf2p8affineinv(gf2p8affine(x, PRE, 0x3e), POST, 0xd3). The first
/// map carries x into the field GFNI inverts in; the second applies the
/// SM4 output affine step on the way back.
pub(crate) const GFNI_PRE: u64 = 0x4c28_7db9_1a22_505d;
pub(crate) const GFNI_POST: u64 = 0xf3ab_34a9_74a6_b589;
pub(crate) const GFNI_PRE_CONST: i32 = 0x3e;
pub(crate) const GFNI_POST_CONST: i32 = 0xd3;

macro_rules! rotl_epi32 {
    ($x:expr, $n:literal) => {
        _mm_or_si128(_mm_slli_epi32::<$n>($x), _mm_srli_epi32::<{ 32 - $n }>($x))
    };
}

#[inline(always)]
pub(crate) unsafe fn bswap_mask() -> __m128i {
    _mm_loadu_si128(BSWAP32.as_ptr().cast())
}

/// 4x4 transpose of 32-bit words; its own inverse.
#[inline(always)]
pub(crate) unsafe fn transpose4(x: [__m128i; 4]) -> [__m128i; 4] {
    let t0 = _mm_unpacklo_epi32(x[0], x[1]);
    let t1 = _mm_unpacklo_epi32(x[2], x[3]);
    let t2 = _mm_unpackhi_epi32(x[0], x[1]);
    let t3 = _mm_unpackhi_epi32(x[2], x[3]);
    [
        _mm_unpacklo_epi64(t0, t1),
        _mm_unpackhi_epi64(t0, t1),
        _mm_unpacklo_epi64(t2, t3),
        _mm_unpackhi_epi64(t2, t3),
    ]
}

/// Load four blocks as word-sliced state.
#[inline(always)]
pub(crate) unsafe fn load4(blocks: &[[u8; SM4_BLOCK_SIZE]; 4]) -> [__m128i; 4] {
    let mask = bswap_mask();
    transpose4(core::array::from_fn(|i| {
        _mm_shuffle_epi8(_mm_loadu_si128(blocks[i].as_ptr().cast()), mask)
    }))
}

/// Store word-sliced state back, emitting words in reverse order.
#[inline(always)]
pub(crate) unsafe fn store4(x: [__m128i; 4], blocks: &mut [[u8; SM4_BLOCK_SIZE]; 4]) {
    let mask = bswap_mask();
    let y = transpose4([x[3], x[2], x[1], x[0]]);
    for (block, reg) in blocks.iter_mut().zip(y) {
        _mm_storeu_si128(block.as_mut_ptr().cast(), _mm_shuffle_epi8(reg, mask));
    }
}

/// Linear diffusion L on four words at once.
#[inline(always)]
pub(crate) unsafe fn diffuse(b: __m128i) -> __m128i {
    let r2 = rotl_epi32!(b, 2);
    let r10 = rotl_epi32!(b, 10);
    let r18 = rotl_epi32!(b, 18);
    let r24 = rotl_epi32!(b, 24);
    _mm_xor_si128(_mm_xor_si128(b, r2), _mm_xor_si128(_mm_xor_si128(r10, r18), r24))
}

/// 32 rounds over word-sliced state with the given vector S-box.
#[inline(always)]
pub(crate) unsafe fn rounds4<S>(rk: &[u32; 32], mut x: [__m128i; 4], sbox: S) -> [__m128i; 4]
where
    S: Fn(__m128i) -> __m128i,
{
    for &k in rk {
        let t = _mm_xor_si128(
            _mm_xor_si128(x[1], x[2]),
            _mm_xor_si128(x[3], _mm_set1_epi32(k as i32)),
        );
        let next = _mm_xor_si128(x[0], diffuse(sbox(t)));
        x = [x[1], x[2], x[3], next];
    }
    x
}

/// Run `kernel` over every complete batch of `N` blocks and once more over
/// a zero-padded scratch batch holding the tail.
#[inline(always)]
pub(crate) fn for_each_batch<const N: usize, F>(
    blocks: &mut [[u8; SM4_BLOCK_SIZE]],
    mut kernel: F,
) where
    F: FnMut(&mut [[u8; SM4_BLOCK_SIZE]; N]),
{
    let (batches, tail) = blocks.as_chunks_mut::<N>();
    for batch in batches {
        kernel(batch);
    }
    if !tail.is_empty() {
        let mut scratch = [[0u8; SM4_BLOCK_SIZE]; N];
        scratch[..tail.len()].copy_from_slice(tail);
        kernel(&mut scratch);
        tail.copy_from_slice(&scratch[..tail.len()]);
        zeroize::Zeroize::zeroize(&mut scratch);
    }
}
