//! Lookup-table SM4 backend.
//!
//! The round transform T = L(tau(x)) is linear in each input byte once the
//! S-box is applied, so it folds into four 256-entry word tables computed on
//! first use via OnceLock. A round costs four lookups and three XORs.

use std::sync::OnceLock;

use super::soft::{diffuse, load_words, store_words_reversed, SBOX};
use super::{SM4_BLOCK_SIZE, SM4_ROUNDS};

struct RoundTables {
    /// t[k][b] = L(S(b) placed in byte k, big-endian).
    t: [[u32; 256]; 4],
}

static ROUND_TABLES: OnceLock<RoundTables> = OnceLock::new();

fn init_tables() -> RoundTables {
    let mut t = [[0u32; 256]; 4];
    for b in 0..256 {
        let s = SBOX[b] as u32;
        t[0][b] = diffuse(s << 24);
        t[1][b] = diffuse(s << 16);
        t[2][b] = diffuse(s << 8);
        t[3][b] = diffuse(s);
    }
    log::debug!("sm4: built round lookup tables");
    RoundTables { t }
}

fn tables() -> &'static RoundTables {
    ROUND_TABLES.get_or_init(init_tables)
}

#[inline(always)]
fn round_t(t: &[[u32; 256]; 4], x: u32) -> u32 {
    t[0][(x >> 24) as usize]
        ^ t[1][((x >> 16) & 0xff) as usize]
        ^ t[2][((x >> 8) & 0xff) as usize]
        ^ t[3][(x & 0xff) as usize]
}

/// Run the 32 rounds over one block in place.
pub(crate) fn crypt_block(rk: &[u32; SM4_ROUNDS], block: &mut [u8; SM4_BLOCK_SIZE]) {
    let t = &tables().t;
    let mut x = load_words(block);
    for &k in rk {
        let next = x[0] ^ round_t(t, x[1] ^ x[2] ^ x[3] ^ k);
        x = [x[1], x[2], x[3], next];
    }
    store_words_reversed(&x, block);
}
