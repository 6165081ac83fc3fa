//! Sixteen-block SM4 in 512-bit registers with a GFNI S-box.
//!
//! Each 128-bit lane of a zmm register holds one block on load; the
//! per-lane transpose then leaves word `k` of all sixteen blocks in
//! register `k`. Rotations use `vprold` directly.

use core::arch::x86_64::*;

use super::{
    for_each_batch, BSWAP32, GFNI_POST, GFNI_POST_CONST, GFNI_PRE, GFNI_PRE_CONST,
};
use crate::sm4::{SM4_BLOCK_SIZE, SM4_ROUNDS};

const LANES: usize = 16;

#[inline(always)]
unsafe fn bswap_mask() -> __m512i {
    _mm512_broadcast_i32x4(_mm_loadu_si128(BSWAP32.as_ptr().cast()))
}

/// 4x4 word transpose inside each 128-bit lane; its own inverse.
#[inline(always)]
unsafe fn transpose4(x: [__m512i; 4]) -> [__m512i; 4] {
    let t0 = _mm512_unpacklo_epi32(x[0], x[1]);
    let t1 = _mm512_unpacklo_epi32(x[2], x[3]);
    let t2 = _mm512_unpackhi_epi32(x[0], x[1]);
    let t3 = _mm512_unpackhi_epi32(x[2], x[3]);
    [
        _mm512_unpacklo_epi64(t0, t1),
        _mm512_unpackhi_epi64(t0, t1),
        _mm512_unpacklo_epi64(t2, t3),
        _mm512_unpackhi_epi64(t2, t3),
    ]
}

#[inline(always)]
unsafe fn diffuse(b: __m512i) -> __m512i {
    let r2 = _mm512_rol_epi32::<2>(b);
    let r10 = _mm512_rol_epi32::<10>(b);
    let r18 = _mm512_rol_epi32::<18>(b);
    let r24 = _mm512_rol_epi32::<24>(b);
    _mm512_xor_si512(
        _mm512_xor_si512(b, r2),
        _mm512_xor_si512(_mm512_xor_si512(r10, r18), r24),
    )
}

#[target_feature(enable = "sse2,ssse3,avx512f,avx512bw,gfni")]
unsafe fn crypt16(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]; LANES]) {
    let mask = bswap_mask();
    let pre = _mm512_set1_epi64(GFNI_PRE as i64);
    let post = _mm512_set1_epi64(GFNI_POST as i64);

    // Register i holds blocks 4i..4i+4, one per lane.
    let mut x = transpose4(core::array::from_fn(|i| {
        let v = _mm512_loadu_si512(blocks[4 * i..].as_ptr().cast());
        _mm512_shuffle_epi8(v, mask)
    }));

    for &k in rk {
        let t = _mm512_xor_si512(
            _mm512_xor_si512(x[1], x[2]),
            _mm512_xor_si512(x[3], _mm512_set1_epi32(k as i32)),
        );
        let s = _mm512_gf2p8affine_epi64_epi8::<GFNI_PRE_CONST>(t, pre);
        let s = _mm512_gf2p8affineinv_epi64_epi8::<GFNI_POST_CONST>(s, post);
        let next = _mm512_xor_si512(x[0], diffuse(s));
        x = [x[1], x[2], x[3], next];
    }

    let y = transpose4([x[3], x[2], x[1], x[0]]);
    for (i, reg) in y.into_iter().enumerate() {
        _mm512_storeu_si512(
            blocks[4 * i..].as_mut_ptr().cast(),
            _mm512_shuffle_epi8(reg, mask),
        );
    }
}

/// Encrypt or decrypt (depending on `rk` order) any number of blocks.
///
/// # Safety
/// The CPU must support AVX512F, AVX512BW and GFNI.
#[target_feature(enable = "sse2,ssse3,avx512f,avx512bw,gfni")]
pub(crate) unsafe fn crypt_blocks(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
    for_each_batch::<LANES, _>(blocks, |batch| crypt16(rk, batch));
}
