//! Block cipher modes of operation.
//!
//! SM4 in ECB form lives on [`Sm4Key`](crate::sm4::Sm4Key) itself
//! (`encrypt_ecb`, `encrypt_blocks`); this module holds the authenticated
//! mode built on top of it.

pub mod gcm;
