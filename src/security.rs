//! security
//!
//! Password hashing and sealing of stored secrets.
//!
//! # Password hashes
//!
//! `PBKDF2-HMAC-SHA256`, 10 000 rounds, 50 output bytes, hex encoded. The
//! salt is a random 10-character string stored beside the hash.
//!
//! # Sealed secrets
//!
//! A sealed value is `base64(salt[8] || nonce[12] || ciphertext)`, where the
//! ciphertext is AES-256-GCM output with its tag appended. The key is derived
//! from the server secret and the salt with the same PBKDF2. Opening a value
//! with the wrong secret fails authentication.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

const HASH_ROUNDS: u32 = 10_000;
const HASH_LEN: usize = 50;
const SEAL_SALT_LEN: usize = 8;
const SEAL_NONCE_LEN: usize = 12;
const SEAL_TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("failed to seal value")]
    Seal,

    #[error("sealed value is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("sealed value is truncated")]
    Truncated,

    #[error("sealed value failed authentication (wrong secret key?)")]
    Authentication,

    #[error("sealed value is not valid UTF-8")]
    Utf8,
}

fn derive(password: &[u8], salt: &[u8], out: &mut [u8]) {
    pbkdf2_hmac::<Sha256>(password, salt, HASH_ROUNDS, out);
}

/// Random salt for a password hash.
pub fn random_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Hash `password` with `salt`.
pub fn encode_password(password: &str, salt: &str) -> Result<String, SecurityError> {
    let mut out = [0u8; HASH_LEN];
    derive(password.as_bytes(), salt.as_bytes(), &mut out);
    Ok(hex::encode(out))
}

/// Check `password` against a stored hash and salt in constant time.
pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    let Ok(stored) = hex::decode(hash) else {
        return false;
    };
    let mut computed = [0u8; HASH_LEN];
    derive(password.as_bytes(), salt.as_bytes(), &mut computed);
    computed.as_slice().ct_eq(stored.as_slice()).into()
}

fn cipher_for(secret: &str, salt: &[u8]) -> Aes256Gcm {
    let mut key = [0u8; 32];
    derive(secret.as_bytes(), salt, &mut key);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
}

/// Seal `plaintext` under the server `secret`.
pub fn seal(secret: &str, plaintext: &str) -> Result<String, SecurityError> {
    let random = uuid::Uuid::new_v4();
    let salt = &random.as_bytes()[..SEAL_SALT_LEN];
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher_for(secret, salt)
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| SecurityError::Seal)?;

    let mut sealed = Vec::with_capacity(SEAL_SALT_LEN + SEAL_NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(salt);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(sealed))
}

/// Open a value produced by [`seal`].
pub fn open(secret: &str, sealed: &str) -> Result<String, SecurityError> {
    let raw = BASE64.decode(sealed)?;
    if raw.len() < SEAL_SALT_LEN + SEAL_NONCE_LEN + SEAL_TAG_LEN {
        return Err(SecurityError::Truncated);
    }
    let (salt, rest) = raw.split_at(SEAL_SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(SEAL_NONCE_LEN);

    let plaintext = cipher_for(secret, salt)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SecurityError::Authentication)?;
    String::from_utf8(plaintext).map_err(|_| SecurityError::Utf8)
}
