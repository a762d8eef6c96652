//! AES-256-GCM encryption primitive.
//!
//! This is the one place plaintext secret material is ever handled in the
//! clear. Every caller outside this crate sees only `Ciphertext` triples
//! (ciphertext, iv, tag) or the `decrypt` output, which must not be
//! logged or persisted.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decryption failed: ciphertext, iv, or tag invalid or tampered")]
    DecryptFailed,
    #[error("iv must be {NONCE_LEN} bytes, got {0}")]
    BadIvLength(usize),
}

/// The three pieces persisted alongside a `Secret` or `Tenant` OAuth
/// token blob: ciphertext, IV (nonce), and authentication tag.
/// `aes-gcm` appends the tag to the ciphertext internally; this type
/// splits them back apart at the boundary because the data model
/// stores them as three separate columns/fields.
#[derive(Debug, Clone)]
pub struct Ciphertext {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` under `key` (32 raw bytes) with a freshly-generated
/// random 96-bit nonce.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Ciphertext, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(nonce, Payload::from(plaintext))
        .map_err(|_| CryptoError::EncryptFailed)?;

    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(Ciphertext {
        ciphertext: sealed,
        iv: nonce_bytes.to_vec(),
        tag,
    })
}

/// Decrypt a ciphertext/iv/tag triple back to plaintext.
///
/// Returns `Err` (never panics) on any tamper or malformed-input
/// condition — this is a security boundary, and the caller is expected
/// to propagate a sanitized, generic failure rather than surface AEAD
/// internals.
pub fn decrypt(key: &[u8; 32], ct: &Ciphertext) -> Result<Vec<u8>, CryptoError> {
    if ct.iv.len() != NONCE_LEN {
        return Err(CryptoError::BadIvLength(ct.iv.len()));
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&ct.iv);

    let mut combined = Vec::with_capacity(ct.ciphertext.len() + ct.tag.len());
    combined.extend_from_slice(&ct.ciphertext);
    combined.extend_from_slice(&ct.tag);

    cipher
        .decrypt(nonce, Payload::from(combined.as_slice()))
        .map_err(|_| CryptoError::DecryptFailed)
}
