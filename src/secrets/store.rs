//! Encrypted at-rest secret materialization
//!
//! Secrets captured at the start of a run are sealed with
//! XChaCha20-Poly1305 under a key derived (HKDF-SHA256) from the salt key
//! and the run id, so a store file can only be opened by the run that
//! wrote it. Plaintext exists in memory only; the sealed file lives in the
//! run scratch dir and is removed by the unconditional cleanup step.

use crate::secrets::SecretMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Key, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::info;

const KEY_INFO: &[u8] = b"cfn-pipeline-secret-store";
const NONCE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read secret store {0}: {1}")]
    Read(String, std::io::Error),

    #[error("failed to write secret store {0}: {1}")]
    Write(String, std::io::Error),

    #[error("secret store is not valid base64")]
    Encoding,

    #[error("failed to open secret store (wrong salt key or run id?)")]
    Crypto,

    #[error("secret store payload is malformed")]
    Payload,
}

/// Seals and opens secret maps for one run
#[derive(Debug, Clone)]
pub struct SecretStore {
    salt_key: String,
    run_id: String,
}

impl SecretStore {
    pub fn new(salt_key: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            salt_key: salt_key.into(),
            run_id: run_id.into(),
        }
    }

    /// Derive the run-bound symmetric key.
    ///
    /// The salt folds in the run id so the same salt key yields a
    /// different key for every run.
    fn derive_key(&self) -> [u8; 32] {
        let salt = Sha256::digest(format!("{}:{}", self.salt_key, self.run_id));
        let hkdf = Hkdf::<Sha256>::new(Some(&salt), self.salt_key.as_bytes());
        let mut key = [0u8; 32];
        // 32 bytes is always a valid HKDF-SHA256 output length
        hkdf.expand(KEY_INFO, &mut key).unwrap();
        key
    }

    /// Seal a secret map into its base64 transport form
    pub fn seal(&self, secrets: &SecretMap) -> Result<String, StoreError> {
        let plaintext = serde_json::to_vec(secrets).map_err(|_| StoreError::Payload)?;

        let key = self.derive_key();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| StoreError::Crypto)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Open a sealed store back into a secret map
    pub fn open(&self, data: &str) -> Result<SecretMap, StoreError> {
        let sealed = BASE64
            .decode(data.trim())
            .map_err(|_| StoreError::Encoding)?;
        if sealed.len() < NONCE_LEN {
            return Err(StoreError::Payload);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let key = self.derive_key();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Crypto)?;

        serde_json::from_slice(&plaintext).map_err(|_| StoreError::Payload)
    }

    /// Seal a secret map to a file
    pub fn seal_to_file(&self, secrets: &SecretMap, path: &Path) -> Result<(), StoreError> {
        let sealed = self.seal(secrets)?;
        std::fs::write(path, sealed)
            .map_err(|e| StoreError::Write(path.display().to_string(), e))?;
        info!(
            "sealed {} secrets to {}",
            secrets.len(),
            path.display()
        );
        Ok(())
    }

    /// Open a sealed store file
    pub fn open_from_file(&self, path: &Path) -> Result<SecretMap, StoreError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Read(path.display().to_string(), e))?;
        let secrets = self.open(&data)?;
        info!(
            "opened secret store {} ({} secrets)",
            path.display(),
            secrets.len()
        );
        Ok(secrets)
    }
}
