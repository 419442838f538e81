use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;

use crate::error::{AppError, AppResult};

const NONCE_SIZE: usize = 12;

/// AES-256-GCM sealing for seed material kept at rest.
///
/// Envelope format: base64(nonce || ciphertext || tag).
pub struct SeedCipher {
    cipher: Aes256Gcm,
}

impl SeedCipher {
    pub fn new(key: &str) -> AppResult<Self> {
        if key.len() != 32 {
            return Err(AppError::EncryptionError(
                "Encryption key must be 32 bytes".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| AppError::EncryptionError(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &[u8]) -> AppResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| AppError::EncryptionError(format!("Encryption failed: {}", e)))?;

        let mut envelope = nonce_bytes.to_vec();
        envelope.extend(ciphertext);

        Ok(STANDARD.encode(envelope))
    }

    pub fn open(&self, envelope: &str) -> AppResult<Vec<u8>> {
        let data = STANDARD
            .decode(envelope)
            .map_err(|e| AppError::EncryptionError(format!("Base64 decode failed: {}", e)))?;

        if data.len() < NONCE_SIZE {
            return Err(AppError::EncryptionError(
                "Invalid encrypted data: too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);

        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| AppError::EncryptionError(format!("Decryption failed: {}", e)))
    }
}
