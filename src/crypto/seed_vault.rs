use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::blockchain::AccountId;
use crate::error::{AppError, AppResult};

use super::encryption::SeedCipher;

/// Encrypted seed storage, one seed per account.
///
/// Plays the role of the platform keychain: the host can persist the sealed
/// envelopes returned by [`SeedVault::export`] wherever it keeps secrets.
pub struct SeedVault {
    cipher: SeedCipher,
    sealed: RwLock<HashMap<AccountId, String>>,
}

impl SeedVault {
    pub fn new(encryption_key: &str) -> AppResult<Self> {
        Ok(Self {
            cipher: SeedCipher::new(encryption_key)?,
            sealed: RwLock::new(HashMap::new()),
        })
    }

    /// Store a seed, refusing to overwrite an existing one
    pub async fn store(&self, account: AccountId, seed: &[u8]) -> AppResult<()> {
        if seed.len() < 32 {
            return Err(AppError::ValidationError(format!(
                "Seed must be at least 32 bytes, got {}",
                seed.len()
            )));
        }

        let envelope = self.cipher.seal(seed)?;

        let mut sealed = self.sealed.write().await;
        if sealed.contains_key(&account) {
            return Err(AppError::AlreadyExists(format!(
                "A seed is already stored for account {}",
                account
            )));
        }
        sealed.insert(account, envelope);

        tracing::info!("Stored seed for account {}", account);
        Ok(())
    }

    /// Restore a previously exported envelope
    pub async fn import(&self, account: AccountId, envelope: String) -> AppResult<()> {
        // Reject envelopes sealed under another key up front
        self.cipher.open(&envelope)?;
        self.sealed.write().await.insert(account, envelope);
        Ok(())
    }

    pub async fn export(&self, account: AccountId) -> AppResult<String> {
        self.sealed
            .read()
            .await
            .get(&account)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No seed stored for account {}", account)))
    }

    pub async fn load(&self, account: AccountId) -> AppResult<Vec<u8>> {
        let envelope = self.export(account).await?;
        self.cipher.open(&envelope)
    }

    pub async fn contains(&self, account: AccountId) -> bool {
        self.sealed.read().await.contains_key(&account)
    }

    pub async fn remove(&self, account: AccountId) -> AppResult<()> {
        self.sealed
            .write()
            .await
            .remove(&account)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("No seed stored for account {}", account)))
    }
}
