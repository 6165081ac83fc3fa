#![doc = "SM4 block cipher with runtime-dispatched SIMD backends, SM4-GCM and SM3."]

// Core traits
pub mod provider;

// Hardware capability detection
pub mod cpu;

// Hash algorithms
#[cfg(feature = "sm3")]
pub mod sm3;

pub mod hash;

// Symmetric ciphers
#[cfg(feature = "sm4")]
pub mod sm4;

// Modes of operation
#[cfg(feature = "gcm")]
pub mod modes;

pub mod cipher {
    //! Unified symmetric cipher interface.
    pub use super::provider::{Aead, BlockCipher};
}

// Self-tests
#[cfg(feature = "self-test")]
pub mod self_test;
