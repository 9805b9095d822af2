//! Crypto Module
//!
//! Encryption primitives and data-key lifecycle management for payloads at
//! rest. `provider` wraps the AEAD cipher and digest helpers; `vault` owns the
//! envelope-encrypted data-encryption key.

pub mod provider;
mod vault;

pub use vault::KeyVault;
