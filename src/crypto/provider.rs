//! Crypto Provider Module
//!
//! Symmetric authenticated encryption primitives plus the digest helpers used
//! to derive storage identifiers. Payloads are sealed with XChaCha20-Poly1305;
//! the 24-byte random nonce is prefixed to each ciphertext so the output is
//! self-contained for decryption.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

// == Constants ==
/// Symmetric key length in bytes
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes, prefixed to every ciphertext
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length in bytes
pub const TAG_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

// == Encrypt ==
/// Encrypts plaintext under a 32-byte key.
///
/// A fresh random nonce is drawn per call and prefixed to the returned
/// ciphertext. Fails with `InvalidKeyLength` if the key is not 32 bytes.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }

    let nonce_bytes = random_bytes(NONCE_LEN)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    // Prefix the nonce so decrypt needs nothing besides the key
    let mut ciphertext = nonce_bytes;
    ciphertext.extend_from_slice(&sealed);
    Ok(ciphertext)
}

// == Decrypt ==
/// Decrypts a nonce-prefixed ciphertext produced by `encrypt`.
///
/// Fails with `DecryptionFailed` on an authentication-tag mismatch (tampered
/// data or wrong key) and never returns unauthenticated bytes.
pub fn decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }

    if ciphertext.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "{} bytes is shorter than nonce plus tag",
            ciphertext.len()
        )));
    }

    let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), sealed)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

// == Random Bytes ==
/// Draws `n` cryptographically secure random bytes from the OS.
pub fn random_bytes(n: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0u8; n];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::RandomGenerationFailed(e.to_string()))?;
    Ok(bytes)
}

// == Digest Helpers ==
/// Derives a fixed-length cipher key from arbitrary-length master key material.
pub fn derive_key(master: &[u8]) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(master);
    hasher.finalize().into()
}

/// SHA-256 digest of `data`, hex-encoded.
///
/// Used where a cache key must satisfy a backend's key rules (memcached's
/// length and whitespace restrictions).
pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Keyed HMAC-SHA256 digest of `data`, hex-encoded.
///
/// Used to derive fixed storage identifiers such as the wrapped-key blob name.
pub fn keyed_digest(key: &[u8], data: &[u8]) -> String {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
