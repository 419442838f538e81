//! Scripted wallet SDK and signer used by the unit tests.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use zcash_primitives::transaction::TxId;
use zcash_protocol::memo::MemoBytes;
use zcash_protocol::value::Zatoshis;

use crate::blockchain::{
    AccountBalance, AccountId, AccountInfo, AccountRegistry, AccountVendor, ExternalSigner,
    OutcomeStream, Pczt, Proposal, ProposalKind, SdkError, SdkResult, SpendingKey, TxOutcome,
    WalletSdk,
};
use crate::config::SubmissionConfig;
use crate::crypto::SeedVault;
use crate::services::{SubmissionService, WalletService};
use crate::store::TransactionStore;
use crate::submission::pczt::SignerError;

pub const TEST_SEED: [u8; 32] = [7u8; 32];
pub const TEST_KEY: &str = "32-byte-seed-encryption-key!!!!!";

/// Software account with a seed in the vault
pub const ZASHI: AccountId = AccountId(0);
/// Hardware wallet account
pub const KEYSTONE: AccountId = AccountId(1);

pub fn txid(n: u8) -> TxId {
    TxId::from_bytes([n; 32])
}

pub fn zats(amount: u64) -> Zatoshis {
    Zatoshis::from_u64(amount).expect("valid test amount")
}

pub fn proposal(transaction_count: usize) -> Proposal {
    Proposal::new(
        ProposalKind::Transfer,
        NonZeroUsize::new(transaction_count).expect("at least one transaction"),
        zats(10_000 * transaction_count as u64),
        vec![0xaa; 16],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkCall {
    ProposeTransfer,
    ProposeShielding,
    CreateProposed,
    CreatePczt,
    Redact,
    AddProofs,
    CreateFromPczt,
    Balance,
    DeriveKey,
}

/// In-memory SDK whose results are scripted per test
pub struct MockSdk {
    failures: HashSet<SdkCall>,
    outcomes: Mutex<Vec<TxOutcome>>,
    balance: AccountBalance,
    shielding_available: bool,
    joined_transforms: bool,
    arrived: AtomicUsize,
    calls: Mutex<Vec<SdkCall>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self {
            failures: HashSet::new(),
            outcomes: Mutex::new(vec![TxOutcome::Success { txid: txid(1) }]),
            balance: AccountBalance {
                spendable: zats(1_000_000),
                pending: Zatoshis::ZERO,
                transparent: zats(500_000),
            },
            shielding_available: true,
            joined_transforms: false,
            arrived: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `call` return an error
    pub fn fail_at(mut self, call: SdkCall) -> Self {
        self.failures.insert(call);
        self
    }

    /// Outcomes yielded by both transaction-creation paths
    pub fn with_outcomes(self, outcomes: Vec<TxOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes;
        self
    }

    pub fn with_spendable(mut self, spendable: u64) -> Self {
        self.balance.spendable = zats(spendable);
        self
    }

    pub fn without_shieldable_funds(mut self) -> Self {
        self.shielding_available = false;
        self
    }

    /// Redaction and proof attachment each wait until the other has
    /// started, so they only finish when polled together
    pub fn with_joined_transforms(mut self) -> Self {
        self.joined_transforms = true;
        self
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: SdkCall) -> SdkResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failures.contains(&call) {
            Err(SdkError::new(-1, format!("{:?} failed", call)))
        } else {
            Ok(())
        }
    }

    async fn rendezvous(&self) {
        if !self.joined_transforms {
            return;
        }
        self.arrived.fetch_add(1, Ordering::SeqCst);
        while self.arrived.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
    }

    fn outcome_stream(&self) -> OutcomeStream {
        let outcomes = self.outcomes.lock().unwrap().clone();
        futures::stream::iter(outcomes).boxed()
    }
}

#[async_trait]
impl WalletSdk for MockSdk {
    async fn propose_transfer(
        &self,
        _account: AccountId,
        _recipient: &str,
        _amount: Zatoshis,
        _memo: Option<&MemoBytes>,
    ) -> SdkResult<Proposal> {
        self.enter(SdkCall::ProposeTransfer)?;
        let count = self.outcomes.lock().unwrap().len().max(1);
        Ok(proposal(count))
    }

    async fn propose_shielding(
        &self,
        _account: AccountId,
        _threshold: Zatoshis,
        _memo: &MemoBytes,
        _transparent_receiver: Option<&str>,
    ) -> SdkResult<Option<Proposal>> {
        self.enter(SdkCall::ProposeShielding)?;
        if !self.shielding_available {
            return Ok(None);
        }
        Ok(Some(Proposal::new(
            ProposalKind::Shielding,
            NonZeroUsize::MIN,
            zats(15_000),
            vec![0xbb; 16],
        )))
    }

    async fn create_proposed_transactions(
        &self,
        _proposal: &Proposal,
        _spending_key: &SpendingKey,
    ) -> SdkResult<OutcomeStream> {
        self.enter(SdkCall::CreateProposed)?;
        Ok(self.outcome_stream())
    }

    async fn create_pczt_from_proposal(
        &self,
        _account: AccountId,
        _proposal: &Proposal,
    ) -> SdkResult<Pczt> {
        self.enter(SdkCall::CreatePczt)?;
        Ok(Pczt::from_bytes(b"pczt".to_vec()))
    }

    async fn redact_pczt_for_signer(&self, pczt: &Pczt) -> SdkResult<Pczt> {
        self.enter(SdkCall::Redact)?;
        self.rendezvous().await;
        let mut bytes = pczt.as_bytes().to_vec();
        bytes.extend_from_slice(b"-redacted");
        Ok(Pczt::from_bytes(bytes))
    }

    async fn add_proofs_to_pczt(&self, pczt: &Pczt) -> SdkResult<Pczt> {
        self.enter(SdkCall::AddProofs)?;
        self.rendezvous().await;
        let mut bytes = pczt.as_bytes().to_vec();
        bytes.extend_from_slice(b"-proofs");
        Ok(Pczt::from_bytes(bytes))
    }

    async fn create_transaction_from_pczt(
        &self,
        _pczt_with_proofs: &Pczt,
        _pczt_with_sigs: &Pczt,
    ) -> SdkResult<OutcomeStream> {
        self.enter(SdkCall::CreateFromPczt)?;
        Ok(self.outcome_stream())
    }

    async fn get_account_balance(&self, _account: AccountId) -> SdkResult<AccountBalance> {
        self.enter(SdkCall::Balance)?;
        Ok(self.balance)
    }

    async fn derive_spending_key(
        &self,
        seed: &[u8],
        account: AccountId,
    ) -> SdkResult<SpendingKey> {
        self.enter(SdkCall::DeriveKey)?;
        let mut bytes = seed.to_vec();
        bytes.extend_from_slice(&account.0.to_le_bytes());
        Ok(SpendingKey::from_bytes(bytes))
    }
}

/// Signer that answers once with a scripted response
pub struct MockSigner {
    response: Mutex<Option<Result<Pczt, SignerError>>>,
    seen: Mutex<Vec<Pczt>>,
}

impl MockSigner {
    pub fn signing() -> Self {
        Self::answering(Ok(Pczt::from_bytes(b"pczt-signed".to_vec())))
    }

    pub fn answering(response: Result<Pczt, SignerError>) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Redacted PCZTs shown to the device
    pub fn seen(&self) -> Vec<Pczt> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExternalSigner for MockSigner {
    async fn collect_signatures(&self, redacted: &Pczt) -> Result<Pczt, SignerError> {
        self.seen.lock().unwrap().push(redacted.clone());
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(SignerError::Rejected))
    }
}

pub fn registry() -> AccountRegistry {
    let mut accounts = AccountRegistry::new();
    accounts.register(AccountInfo {
        id: ZASHI,
        name: "Zashi".to_string(),
        vendor: AccountVendor::Zashi,
    });
    accounts.register(AccountInfo {
        id: KEYSTONE,
        name: "Keystone".to_string(),
        vendor: AccountVendor::Keystone,
    });
    accounts
}

pub struct Harness {
    pub service: Arc<SubmissionService>,
    pub sdk: Arc<MockSdk>,
    pub store: Arc<TransactionStore>,
}

/// Submission service over `sdk` with both test accounts registered and
/// the software account's seed imported
pub async fn harness(sdk: MockSdk, debug_pczt_dumps: bool) -> Harness {
    build_harness(sdk, debug_pczt_dumps, true).await
}

/// Same as [`harness`] but the vault holds no seed
pub async fn harness_without_seed(sdk: MockSdk) -> Harness {
    build_harness(sdk, false, false).await
}

async fn build_harness(sdk: MockSdk, debug_pczt_dumps: bool, import_seed: bool) -> Harness {
    let sdk = Arc::new(sdk);
    let accounts = Arc::new(registry());

    let wallet_service = Arc::new(WalletService::new(
        Arc::new(SeedVault::new(TEST_KEY).expect("valid test key")),
        sdk.clone(),
        accounts.clone(),
    ));
    if import_seed {
        wallet_service
            .import_seed(ZASHI, &TEST_SEED)
            .await
            .expect("seed import");
    }

    let store = Arc::new(TransactionStore::new(100));
    let config = SubmissionConfig {
        debug_pczt_dumps,
        ..SubmissionConfig::default()
    };
    let service = Arc::new(SubmissionService::new(
        sdk.clone(),
        wallet_service,
        accounts,
        store.clone(),
        config,
    ));

    Harness {
        service,
        sdk,
        store,
    }
}
