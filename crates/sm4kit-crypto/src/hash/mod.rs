//! Unified hash module.
//!
//! Re-exports the digest traits together with the SM3 implementation, the
//! one hash this crate ships.

pub use crate::provider::{Digest, HashAlgorithm};

#[cfg(feature = "sm3")]
pub use crate::sm3::{Sm3, Sm3Algorithm};
