//! Differential checks of every accelerated backend against `Basic`.
//!
//! Block counts straddle the 4- and 16-block batch widths so both the
//! full-batch and the padded-tail paths run.

use sm4kit_types::SelfTestError;

use crate::modes::gcm::Sm4Gcm;
use crate::sm4::{Backend, Sm4Key, SM4_BLOCK_SIZE};

const BLOCK_COUNTS: [usize; 8] = [1, 3, 4, 5, 15, 16, 17, 33];

const KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

/// Deterministic filler so every block differs.
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(167).wrapping_add(13)).collect()
}

fn mismatch(backend: Backend, detail: impl Into<String>) -> SelfTestError {
    SelfTestError::BackendMismatch {
        backend: backend.name(),
        detail: detail.into(),
    }
}

/// Cross-check `backend` against the literal S-box backend.
pub(crate) fn check_backend(backend: Backend) -> Result<(), SelfTestError> {
    let reference = Sm4Key::with_backend(&KEY, Backend::Basic)?;
    let candidate = Sm4Key::with_backend(&KEY, backend)?;

    for count in BLOCK_COUNTS {
        let plain: Vec<[u8; SM4_BLOCK_SIZE]> = pattern(count * SM4_BLOCK_SIZE)
            .as_chunks::<SM4_BLOCK_SIZE>()
            .0
            .to_vec();
        let mut expected = plain.clone();
        reference.encrypt_blocks(&mut expected);

        let mut got = plain.clone();
        candidate.encrypt_blocks(&mut got);
        if got != expected {
            return Err(mismatch(backend, format!("ecb encrypt of {count} blocks")));
        }
        candidate.decrypt_blocks(&mut got);
        if got != plain {
            return Err(mismatch(backend, format!("ecb decrypt of {count} blocks")));
        }
    }

    let reference = Sm4Gcm::from_cipher(reference);
    let candidate = Sm4Gcm::from_cipher(candidate);
    let msg = pattern(1000);
    for nonce in [&KEY[..12], &KEY[..]] {
        let expected = reference.encrypt(nonce, b"self-test", &msg)?;
        let got = candidate.encrypt(nonce, b"self-test", &msg)?;
        if got != expected {
            return Err(mismatch(
                backend,
                format!("gcm output with {} byte nonce", nonce.len()),
            ));
        }
        if candidate.decrypt(nonce, b"self-test", &got.0, &got.1)? != msg {
            return Err(mismatch(backend, "gcm decrypt"));
        }
    }
    Ok(())
}
