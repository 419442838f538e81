use async_trait::async_trait;
use zcash_protocol::memo::MemoBytes;
use zcash_protocol::value::Zatoshis;

use super::types::{
    AccountBalance, AccountId, OutcomeStream, Pczt, Proposal, SdkResult, SpendingKey,
};
use crate::submission::pczt::SignerError;

/// The light-client SDK as seen by the send flow.
///
/// Implementations wrap the real SDK (sync engine, proposal builder, prover).
/// Every method is a suspension point; none of them is expected to be
/// cancelled once started.
#[async_trait]
pub trait WalletSdk: Send + Sync {
    /// Build a payment proposal
    async fn propose_transfer(
        &self,
        account: AccountId,
        recipient: &str,
        amount: Zatoshis,
        memo: Option<&MemoBytes>,
    ) -> SdkResult<Proposal>;

    /// Build a shielding proposal, or `None` when nothing exceeds the threshold
    async fn propose_shielding(
        &self,
        account: AccountId,
        threshold: Zatoshis,
        memo: &MemoBytes,
        transparent_receiver: Option<&str>,
    ) -> SdkResult<Option<Proposal>>;

    /// Sign with an in-process key, then create and broadcast every transaction.
    /// The stream yields exactly `proposal.transaction_count()` outcomes.
    async fn create_proposed_transactions(
        &self,
        proposal: &Proposal,
        spending_key: &SpendingKey,
    ) -> SdkResult<OutcomeStream>;

    async fn create_pczt_from_proposal(
        &self,
        account: AccountId,
        proposal: &Proposal,
    ) -> SdkResult<Pczt>;

    /// Strip everything an external signer does not need to see
    async fn redact_pczt_for_signer(&self, pczt: &Pczt) -> SdkResult<Pczt>;

    /// Attach zero-knowledge proofs; needs no secret key material
    async fn add_proofs_to_pczt(&self, pczt: &Pczt) -> SdkResult<Pczt>;

    /// Merge proofs with external signatures, then broadcast
    async fn create_transaction_from_pczt(
        &self,
        pczt_with_proofs: &Pczt,
        pczt_with_sigs: &Pczt,
    ) -> SdkResult<OutcomeStream>;

    async fn get_account_balance(&self, account: AccountId) -> SdkResult<AccountBalance>;

    async fn derive_spending_key(
        &self,
        seed: &[u8],
        account: AccountId,
    ) -> SdkResult<SpendingKey>;
}

/// A hardware wallet reached through an animated QR round trip
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    /// Show `redacted` to the device and wait for the signed PCZT.
    /// There is no timeout: this resolves only when the user scans a
    /// response or gives up.
    async fn collect_signatures(&self, redacted: &Pczt) -> Result<Pczt, SignerError>;
}
