use std::sync::Arc;

use zcash_address::ZcashAddress;
use zcash_protocol::memo::MemoBytes;
use zcash_protocol::value::Zatoshis;

use crate::blockchain::{AccountId, AccountRegistry, Proposal, SdkError, WalletSdk};
use crate::config::SubmissionConfig;
use crate::error::AppError;

/// Reasons a proposal could not be obtained. These are surfaced on the
/// send form and never reach the submission flow.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Account {0} is not registered")]
    UnknownAccount(AccountId),

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Recipient address cannot receive a memo")]
    MemoNotSupported,

    #[error("Memo is {0} bytes, the limit is 512")]
    MemoTooLong(usize),

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Insufficient funds: have {available} zatoshis, need {required} zatoshis")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Wallet SDK rejected the proposal: {0}")]
    Sdk(#[from] SdkError),
}

impl From<ProposalError> for AppError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::UnknownAccount(_) => AppError::NotFound(err.to_string()),
            ProposalError::InsufficientFunds { .. } => {
                AppError::InsufficientBalance(err.to_string())
            }
            ProposalError::Sdk(_) => AppError::SdkError(err.to_string()),
            _ => AppError::ValidationError(err.to_string()),
        }
    }
}

pub struct ProposalService {
    sdk: Arc<dyn WalletSdk>,
    accounts: Arc<AccountRegistry>,
    config: SubmissionConfig,
}

impl ProposalService {
    pub fn new(
        sdk: Arc<dyn WalletSdk>,
        accounts: Arc<AccountRegistry>,
        config: SubmissionConfig,
    ) -> Self {
        Self {
            sdk,
            accounts,
            config,
        }
    }

    /// Ask the SDK for a payment proposal.
    ///
    /// The result is trusted as-is; it is not re-validated at submission.
    pub async fn propose_transfer(
        &self,
        account: AccountId,
        recipient: &str,
        amount: Zatoshis,
        memo: Option<&str>,
    ) -> Result<Proposal, ProposalError> {
        if !self.accounts.contains(account) {
            return Err(ProposalError::UnknownAccount(account));
        }

        let address = parse_address(recipient)?;

        let memo = match memo.filter(|m| !m.is_empty()) {
            Some(text) => {
                if !address.can_receive_memo() {
                    return Err(ProposalError::MemoNotSupported);
                }
                Some(encode_memo(text)?)
            }
            None => None,
        };

        if amount.into_u64() == 0 {
            return Err(ProposalError::ZeroAmount);
        }

        // Fees are only known once the SDK builds the proposal; this catches
        // the obvious case before doing that work.
        let balance = self.sdk.get_account_balance(account).await?;
        if amount.into_u64() > balance.spendable.into_u64() {
            return Err(ProposalError::InsufficientFunds {
                available: balance.spendable.into_u64(),
                required: amount.into_u64(),
            });
        }

        let proposal = self
            .sdk
            .propose_transfer(account, recipient, amount, memo.as_ref())
            .await
            .map_err(|e| {
                tracing::warn!("Transfer proposal rejected for account {}: {}", account, e);
                e
            })?;

        tracing::info!(
            "Proposal for account {}: {} transaction(s), fee {} zatoshis",
            account,
            proposal.transaction_count(),
            proposal.total_fee().into_u64()
        );
        Ok(proposal)
    }

    /// Ask the SDK to shield transparent funds above the configured threshold.
    /// `None` means there is nothing worth shielding.
    pub async fn propose_shielding(
        &self,
        account: AccountId,
        memo: Option<&str>,
        transparent_receiver: Option<&str>,
    ) -> Result<Option<Proposal>, ProposalError> {
        if !self.accounts.contains(account) {
            return Err(ProposalError::UnknownAccount(account));
        }

        if let Some(receiver) = transparent_receiver {
            parse_address(receiver)?;
        }

        let memo = match memo.filter(|m| !m.is_empty()) {
            Some(text) => encode_memo(text)?,
            None => MemoBytes::empty(),
        };

        let threshold = Zatoshis::from_u64(self.config.shielding_threshold_zatoshis)
            .unwrap_or(Zatoshis::ZERO);

        let proposal = self
            .sdk
            .propose_shielding(account, threshold, &memo, transparent_receiver)
            .await?;

        match &proposal {
            Some(p) => tracing::info!(
                "Shielding proposal for account {}: fee {} zatoshis",
                account,
                p.total_fee().into_u64()
            ),
            None => tracing::debug!("Nothing to shield for account {}", account),
        }
        Ok(proposal)
    }
}

fn parse_address(encoded: &str) -> Result<ZcashAddress, ProposalError> {
    ZcashAddress::try_from_encoded(encoded.trim())
        .map_err(|e| ProposalError::InvalidAddress(e.to_string()))
}

fn encode_memo(text: &str) -> Result<MemoBytes, ProposalError> {
    MemoBytes::from_bytes(text.as_bytes()).map_err(|_| ProposalError::MemoTooLong(text.len()))
}
