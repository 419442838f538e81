use std::collections::HashMap;

use serde::Serialize;

use crate::error::{AppError, AppResult};

use super::types::AccountId;

/// Who holds the spending key for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountVendor {
    /// Key derived in-process from the seed kept by this wallet
    Zashi,
    /// Key lives on a Keystone device; signing goes through PCZT
    Keystone,
}

impl AccountVendor {
    pub fn requires_external_signer(&self) -> bool {
        matches!(self, AccountVendor::Keystone)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub id: AccountId,
    pub name: String,
    pub vendor: AccountVendor,
}

/// Registry of the wallet's accounts and their signing capability
pub struct AccountRegistry {
    accounts: HashMap<AccountId, AccountInfo>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Register an account, replacing any previous entry with the same id
    pub fn register(&mut self, info: AccountInfo) {
        tracing::info!("Registering account {} ({:?}): {}", info.id, info.vendor, info.name);
        self.accounts.insert(info.id, info);
    }

    pub fn get(&self, id: AccountId) -> AppResult<&AccountInfo> {
        self.accounts
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Account {} is not registered", id)))
    }

    /// List all accounts ordered by id
    pub fn list(&self) -> Vec<AccountInfo> {
        let mut accounts: Vec<AccountInfo> = self.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}
