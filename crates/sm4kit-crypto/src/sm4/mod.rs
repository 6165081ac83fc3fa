//! SM4 block cipher implementation.
//!
//! SM4 is a 128-bit block cipher standardized by the Chinese government
//! (GB/T 32907-2016). It uses a 128-bit key and 32 rounds of an unbalanced
//! Feistel structure.
//!
//! Several backends compute the same function; see [`Backend`]. A key
//! context picks one at construction, from [`Backend::preferred`] unless
//! the caller forces a specific backend.

mod backend;
pub(crate) mod soft;
mod table;
#[cfg(target_arch = "x86_64")]
mod x86;

pub use backend::{Backend, BACKEND_ENV};
pub use soft::expand_key;

use sm4kit_types::CryptoError;
use zeroize::Zeroize;

use crate::provider::BlockCipher;

/// SM4 block size in bytes (128 bits).
pub const SM4_BLOCK_SIZE: usize = 16;

/// SM4 key size in bytes (128 bits).
pub const SM4_KEY_SIZE: usize = 16;

/// Number of rounds, and of round-key words.
pub const SM4_ROUNDS: usize = 32;

/// An SM4 key with precomputed round keys and a bound backend.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Sm4Key {
    /// Encryption round keys.
    enc_rk: [u32; SM4_ROUNDS],
    /// The same words in reverse order, for decryption.
    dec_rk: [u32; SM4_ROUNDS],
    #[zeroize(skip)]
    backend: Backend,
}

impl Sm4Key {
    /// Create a new SM4 key from 16 raw bytes using the preferred backend.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        Self::with_backend(key, Backend::preferred())
    }

    /// Create a key bound to a specific backend.
    ///
    /// Fails with [`CryptoError::BackendUnavailable`] if the processor
    /// lacks the capabilities the backend needs.
    pub fn with_backend(key: &[u8], backend: Backend) -> Result<Self, CryptoError> {
        let key: &[u8; SM4_KEY_SIZE] =
            key.try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: SM4_KEY_SIZE,
                    got: key.len(),
                })?;
        if !backend.is_supported() {
            return Err(CryptoError::BackendUnavailable(backend.name()));
        }
        let enc_rk = expand_key(key);
        let mut dec_rk = enc_rk;
        dec_rk.reverse();
        Ok(Sm4Key {
            enc_rk,
            dec_rk,
            backend,
        })
    }

    /// The backend this key dispatches to.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Encryption round keys.
    pub fn round_keys(&self) -> &[u32; SM4_ROUNDS] {
        &self.enc_rk
    }

    /// Encrypt a single 16-byte block in place.
    pub fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        let block = as_block(block)?;
        self.backend
            .crypt_blocks(&self.enc_rk, core::slice::from_mut(block));
        Ok(())
    }

    /// Decrypt a single 16-byte block in place.
    pub fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        let block = as_block(block)?;
        self.backend
            .crypt_blocks(&self.dec_rk, core::slice::from_mut(block));
        Ok(())
    }

    /// Encrypt any number of independent blocks in place.
    ///
    /// Vectorized backends process them in batches of [`Backend::lanes`].
    pub fn encrypt_blocks(&self, blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
        self.backend.crypt_blocks(&self.enc_rk, blocks);
    }

    /// Decrypt any number of independent blocks in place.
    pub fn decrypt_blocks(&self, blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
        self.backend.crypt_blocks(&self.dec_rk, blocks);
    }

    /// ECB-encrypt a buffer whose length is a multiple of the block size.
    pub fn encrypt_ecb(&self, data: &mut [u8]) -> Result<(), CryptoError> {
        self.encrypt_blocks(as_blocks(data)?);
        Ok(())
    }

    /// ECB-decrypt a buffer whose length is a multiple of the block size.
    pub fn decrypt_ecb(&self, data: &mut [u8]) -> Result<(), CryptoError> {
        self.decrypt_blocks(as_blocks(data)?);
        Ok(())
    }
}

fn as_block(block: &mut [u8]) -> Result<&mut [u8; SM4_BLOCK_SIZE], CryptoError> {
    let got = block.len();
    block
        .try_into()
        .map_err(|_| CryptoError::InvalidBlockLength {
            expected: SM4_BLOCK_SIZE,
            got,
        })
}

fn as_blocks(data: &mut [u8]) -> Result<&mut [[u8; SM4_BLOCK_SIZE]], CryptoError> {
    let got = data.len();
    let (blocks, rest) = data.as_chunks_mut::<SM4_BLOCK_SIZE>();
    if !rest.is_empty() {
        return Err(CryptoError::InvalidBlockLength {
            expected: (got / SM4_BLOCK_SIZE + 1) * SM4_BLOCK_SIZE,
            got,
        });
    }
    Ok(blocks)
}

impl core::fmt::Debug for Sm4Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sm4Key")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl BlockCipher for Sm4Key {
    fn block_size(&self) -> usize {
        SM4_BLOCK_SIZE
    }

    fn key_size(&self) -> usize {
        SM4_KEY_SIZE
    }

    fn set_encrypt_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        *self = Self::with_backend(key, self.backend)?;
        Ok(())
    }

    fn set_decrypt_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        // Both directions are kept, so this is the same as set_encrypt_key.
        self.set_encrypt_key(key)
    }

    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Sm4Key::encrypt_block(self, block)
    }

    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Sm4Key::decrypt_block(self, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    const KEY: &str = "0123456789abcdeffedcba9876543210";

    fn sample_blocks(n: usize) -> Vec<[u8; 16]> {
        let mut state = 0x1234_5678u32;
        (0..n)
            .map(|_| {
                core::array::from_fn(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    state as u8
                })
            })
            .collect()
    }

    #[test]
    fn test_sm4_standard_vector_all_backends() {
        let key = hex_to_bytes(KEY);
        for backend in Backend::supported() {
            let cipher = Sm4Key::with_backend(&key, backend).unwrap();
            let mut block = key.clone();
            cipher.encrypt_block(&mut block).unwrap();
            assert_eq!(hex(&block), "681edf34d206965e86b3e94f536e4246", "{backend}");
            cipher.decrypt_block(&mut block).unwrap();
            assert_eq!(block, key, "{backend}");
        }
    }

    #[test]
    fn test_sm4_default_backend_vector() {
        let key = hex_to_bytes(KEY);
        let cipher = Sm4Key::new(&key).unwrap();
        assert_eq!(cipher.backend(), Backend::preferred());
        let mut block = key.clone();
        cipher.encrypt_block(&mut block).unwrap();
        assert_eq!(hex(&block), "681edf34d206965e86b3e94f536e4246");
    }

    #[test]
    fn test_sm4_round_keys() {
        let cipher = Sm4Key::with_backend(&hex_to_bytes(KEY), Backend::Basic).unwrap();
        assert_eq!(cipher.round_keys()[0], 0xf12186f9);
        assert_eq!(cipher.round_keys()[31], 0x9124a012);
    }

    #[test]
    fn test_sm4_invalid_key_len() {
        assert_eq!(
            Sm4Key::new(&[0u8; 15]).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 16,
                got: 15
            }
        );
        assert!(Sm4Key::new(&[0u8; 32]).is_err());
        assert!(Sm4Key::new(&[]).is_err());
    }

    #[test]
    fn test_sm4_invalid_block_len() {
        let cipher = Sm4Key::new(&[0u8; 16]).unwrap();
        let mut short = [0u8; 15];
        assert_eq!(
            cipher.encrypt_block(&mut short).unwrap_err(),
            CryptoError::InvalidBlockLength {
                expected: 16,
                got: 15
            }
        );
        let mut long = [0u8; 17];
        assert!(cipher.decrypt_block(&mut long).is_err());
        let mut ragged = [0u8; 40];
        assert!(cipher.encrypt_ecb(&mut ragged).is_err());
    }

    #[test]
    fn test_sm4_unsupported_backend_rejected() {
        for backend in Backend::ALL {
            let result = Sm4Key::with_backend(&[0u8; 16], backend);
            if backend.is_supported() {
                assert!(result.is_ok());
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    CryptoError::BackendUnavailable(backend.name())
                );
            }
        }
    }

    #[test]
    fn test_sm4_blocks_match_across_backends() {
        let key = [0x3cu8; 16];
        let reference = Sm4Key::with_backend(&key, Backend::Basic).unwrap();
        // Odd counts exercise the partial-batch paths.
        for n in [0usize, 1, 3, 4, 5, 15, 16, 17, 33, 64] {
            let input = sample_blocks(n);
            let mut expected = input.clone();
            reference.encrypt_blocks(&mut expected);

            for backend in Backend::supported() {
                let cipher = Sm4Key::with_backend(&key, backend).unwrap();
                let mut got = input.clone();
                cipher.encrypt_blocks(&mut got);
                assert_eq!(got, expected, "{backend} n={n}");
                cipher.decrypt_blocks(&mut got);
                assert_eq!(got, input, "{backend} n={n}");
            }
        }
    }

    #[test]
    fn test_sm4_ecb_roundtrip() {
        let cipher = Sm4Key::new(&[7u8; 16]).unwrap();
        let mut data = vec![0xa5u8; 16 * 9];
        cipher.encrypt_ecb(&mut data).unwrap();
        assert_ne!(data, vec![0xa5u8; 16 * 9]);
        // ECB: identical plaintext blocks give identical ciphertext blocks.
        assert_eq!(data[..16], data[16..32]);
        cipher.decrypt_ecb(&mut data).unwrap();
        assert_eq!(data, vec![0xa5u8; 16 * 9]);
    }

    #[test]
    fn test_sm4_block_cipher_trait() {
        let mut cipher = Sm4Key::with_backend(&[0u8; 16], Backend::Table).unwrap();
        let bc: &mut dyn BlockCipher = &mut cipher;
        assert_eq!(bc.block_size(), 16);
        assert_eq!(bc.key_size(), 16);
        bc.set_encrypt_key(&hex_to_bytes(KEY)).unwrap();
        let mut block = hex_to_bytes(KEY);
        bc.encrypt_block(&mut block).unwrap();
        assert_eq!(hex(&block), "681edf34d206965e86b3e94f536e4246");
        bc.set_decrypt_key(&hex_to_bytes(KEY)).unwrap();
        bc.decrypt_block(&mut block).unwrap();
        assert_eq!(hex(&block), KEY);
        assert_eq!(cipher.backend(), Backend::Table);
    }

    #[test]
    fn test_sm4_debug_hides_round_keys() {
        let cipher = Sm4Key::with_backend(&[0u8; 16], Backend::Basic).unwrap();
        let s = format!("{cipher:?}");
        assert!(s.contains("Basic"));
        assert!(!s.contains("rk"));
    }

    #[test]
    #[ignore = "slow in debug builds"]
    fn test_sm4_million_iterations() {
        let key = hex_to_bytes(KEY);
        let cipher = Sm4Key::new(&key).unwrap();
        let mut block = key.clone();
        for _ in 0..1_000_000 {
            cipher.encrypt_block(&mut block).unwrap();
        }
        assert_eq!(hex(&block), "595298c7c6fd271f0402f804c33d3f66");
    }
}
