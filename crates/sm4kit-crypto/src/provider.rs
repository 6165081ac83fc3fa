//! Trait-based provider mechanism for cryptographic algorithms.
//!
//! These traits are the generic capabilities external consumers program
//! against: a hash that maps bytes to a fixed-size digest, a raw block
//! cipher, and an AEAD with ciphertext || tag framing.

use sm4kit_types::CryptoError;

/// A hash / message digest algorithm.
pub trait Digest: Send + Sync {
    /// The output size in bytes.
    fn output_size(&self) -> usize;

    /// The internal block size in bytes.
    fn block_size(&self) -> usize;

    /// Feed data into the hash state.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Finalize the hash and write the digest to `out`.
    /// The length of `out` must be at least `output_size()`.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;

    /// Reset the hash state to process a new message.
    fn reset(&mut self);
}

/// A convenience wrapper trait for creating digest instances.
pub trait HashAlgorithm: Send + Sync {
    /// Create a new digest context.
    fn new_digest(&self) -> Box<dyn Digest>;

    /// One-shot hash computation.
    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = self.new_digest();
        ctx.update(data)?;
        let mut out = vec![0u8; ctx.output_size()];
        ctx.finish(&mut out)?;
        Ok(out)
    }
}

/// A block cipher.
pub trait BlockCipher: Send + Sync {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Set the encryption key.
    fn set_encrypt_key(&mut self, key: &[u8]) -> Result<(), CryptoError>;

    /// Set the decryption key.
    fn set_decrypt_key(&mut self, key: &[u8]) -> Result<(), CryptoError>;

    /// Encrypt a single block in-place.
    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt a single block in-place.
    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;
}

/// An Authenticated Encryption with Associated Data (AEAD) algorithm.
pub trait Aead: Send + Sync {
    /// The length of the authentication tag in bytes.
    fn tag_size(&self) -> usize;

    /// The expected nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// The key size in bytes.
    fn key_size(&self) -> usize;

    /// Set the key.
    fn set_key(&mut self, key: &[u8]) -> Result<(), CryptoError>;

    /// Encrypt plaintext with AEAD.
    ///
    /// Returns ciphertext || tag.
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt ciphertext with AEAD.
    ///
    /// `ciphertext` should include the appended tag.
    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
