//! SM4 S-box through GFNI affine instructions, four blocks per pass.

use core::arch::x86_64::*;

use super::{
    for_each_batch, load4, rounds4, store4, GFNI_POST, GFNI_POST_CONST, GFNI_PRE,
    GFNI_PRE_CONST,
};
use crate::sm4::{SM4_BLOCK_SIZE, SM4_ROUNDS};

#[inline(always)]
unsafe fn sbox(x: __m128i, pre: __m128i, post: __m128i) -> __m128i {
    let y = _mm_gf2p8affine_epi64_epi8::<GFNI_PRE_CONST>(x, pre);
    _mm_gf2p8affineinv_epi64_epi8::<GFNI_POST_CONST>(y, post)
}

#[target_feature(enable = "sse2,ssse3,gfni")]
unsafe fn crypt4(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]; 4]) {
    let pre = _mm_set1_epi64x(GFNI_PRE as i64);
    let post = _mm_set1_epi64x(GFNI_POST as i64);
    let x = rounds4(rk, load4(blocks), |t| sbox(t, pre, post));
    store4(x, blocks);
}

/// Encrypt or decrypt (depending on `rk` order) any number of blocks.
///
/// # Safety
/// The CPU must support SSE2, SSSE3 and GFNI.
#[target_feature(enable = "sse2,ssse3,gfni")]
pub(crate) unsafe fn crypt_blocks(rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
    for_each_batch::<4, _>(blocks, |batch| crypt4(rk, batch));
}
