use std::sync::Arc;

use crate::blockchain::{AccountId, AccountRegistry, SpendingKey, WalletSdk};
use crate::crypto::SeedVault;
use crate::error::{AppError, AppResult};

/// Seed custody and spending-key derivation for software accounts
pub struct WalletService {
    vault: Arc<SeedVault>,
    sdk: Arc<dyn WalletSdk>,
    accounts: Arc<AccountRegistry>,
}

impl WalletService {
    pub fn new(
        vault: Arc<SeedVault>,
        sdk: Arc<dyn WalletSdk>,
        accounts: Arc<AccountRegistry>,
    ) -> Self {
        Self {
            vault,
            sdk,
            accounts,
        }
    }

    /// Store the seed backing a software account
    pub async fn import_seed(&self, account: AccountId, seed: &[u8]) -> AppResult<()> {
        let info = self.accounts.get(account)?;
        if info.vendor.requires_external_signer() {
            return Err(AppError::ValidationError(format!(
                "Account {} is held by a hardware wallet and has no seed",
                account
            )));
        }

        self.vault.store(account, seed).await
    }

    pub async fn has_seed(&self, account: AccountId) -> bool {
        self.vault.contains(account).await
    }

    /// Derive the spending key for a software account from its stored seed
    pub async fn spending_key(&self, account: AccountId) -> AppResult<SpendingKey> {
        let info = self.accounts.get(account)?;
        if info.vendor.requires_external_signer() {
            return Err(AppError::NotFound(format!(
                "Account {} has no in-process spending key",
                account
            )));
        }

        let mut seed = self.vault.load(account).await?;
        let key = self.sdk.derive_spending_key(&seed, account).await;
        seed.iter_mut().for_each(|b| *b = 0);

        key.map_err(AppError::from)
    }
}
