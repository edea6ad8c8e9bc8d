//! AES-256-GCM encryption at rest, keyed by an Argon2-derived key.
//!
//! Follows the same shape as the application's own password-derived
//! encryption service: a random salt fixed for the process lifetime, a
//! random nonce per message, nonce prepended to the ciphertext.

use crate::error::{AegisError, Result};
use aes_gcm::{aead::Aead, Aes256Gcm, Key, KeyInit, Nonce};
use argon2::Argon2;
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

pub struct VaultCipher {
    cipher: Aes256Gcm,
}

impl VaultCipher {
    /// Derive the vault's encryption key from the operator-supplied root key
    /// and a salt generated once when the vault starts up. The derived key
    /// is zeroized immediately after the cipher is built from it.
    pub fn derive(root_key: &str, salt: &[u8; 16]) -> Result<Self> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(root_key.as_bytes(), salt, &mut key)
            .map_err(|e| AegisError::Startup(format!("vault key derivation failed: {e:?}")))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        key.zeroize();
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self.cipher.encrypt(nonce, plaintext)?;

        let mut out = Vec::with_capacity(12 + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < 12 {
            return Err(AegisError::VaultCryptoFailure);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        Ok(self.cipher.decrypt(nonce, ciphertext)?)
    }
}

pub fn generate_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}
