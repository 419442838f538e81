use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use zcash_protocol::value::Zatoshis;

use crate::blockchain::{
    AccountId, AccountRegistry, AccountVendor, ExternalSigner, OutcomeStream, Pczt, Proposal,
    ProposalKind, TxOutcome, WalletSdk,
};
use crate::config::SubmissionConfig;
use crate::error::{AppError, AppResult};
use crate::services::WalletService;
use crate::store::{NewTransferRecord, SubmissionStatus, TransactionStore};
use crate::submission::pczt::{PcztError, PcztPipeline, ScanFailure, SignerError};
use crate::submission::report::{capture_dumps, PcztDump};
use crate::submission::{classify, AggregateResult, SubmissionResult};

/// Support code when no spending key could be derived for a software account
pub const SPENDING_KEY_CODE: i32 = -796;
/// Support code when the SDK yields a different number of outcomes than proposed
pub const OUTCOME_COUNT_CODE: i32 = -802;

/// How the transactions of a proposal get signed
#[derive(Clone)]
pub enum SigningContext {
    /// Spending key derived in-process from the stored seed
    Direct { account: AccountId },
    /// Hardware wallet reached through the PCZT round trip
    External {
        account: AccountId,
        signer: Arc<dyn ExternalSigner>,
    },
}

impl SigningContext {
    pub fn account(&self) -> AccountId {
        match self {
            SigningContext::Direct { account } | SigningContext::External { account, .. } => {
                *account
            }
        }
    }
}

#[derive(Debug)]
pub enum Submission {
    Completed(SubmissionResult),
    /// The user backed out while the hardware wallet was signing
    Rejected,
    /// The signed PCZT could not be read back from the device
    ScanFailed(ScanFailure),
}

/// Proof that the holder owns the only in-flight submission for an account.
/// Released on drop.
#[derive(Debug)]
pub struct SendingGuard {
    account: AccountId,
    in_flight: Arc<Mutex<HashSet<AccountId>>>,
}

impl SendingGuard {
    pub fn account(&self) -> AccountId {
        self.account
    }
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.account);
    }
}

/// Proposal metadata kept after the proposal itself is gone
#[derive(Debug, Clone, Copy)]
struct ProposalMeta {
    kind: ProposalKind,
    transaction_count: usize,
    total_fee: Zatoshis,
}

impl ProposalMeta {
    fn of(proposal: Option<&Proposal>) -> Self {
        match proposal {
            Some(p) => Self {
                kind: p.kind(),
                transaction_count: p.transaction_count(),
                total_fee: p.total_fee(),
            },
            None => Self {
                kind: ProposalKind::Transfer,
                transaction_count: 0,
                total_fee: Zatoshis::ZERO,
            },
        }
    }
}

/// Drives a proposal to an [`AggregateResult`].
///
/// No SDK error escapes this service: every failure ends up as an
/// aggregate `Failure`, recorded in the transaction store like any other
/// terminal result.
pub struct SubmissionService {
    sdk: Arc<dyn WalletSdk>,
    wallet_service: Arc<WalletService>,
    accounts: Arc<AccountRegistry>,
    store: Arc<TransactionStore>,
    config: SubmissionConfig,
    in_flight: Arc<Mutex<HashSet<AccountId>>>,
}

impl SubmissionService {
    pub fn new(
        sdk: Arc<dyn WalletSdk>,
        wallet_service: Arc<WalletService>,
        accounts: Arc<AccountRegistry>,
        store: Arc<TransactionStore>,
        config: SubmissionConfig,
    ) -> Self {
        Self {
            sdk,
            wallet_service,
            accounts,
            store,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn account_vendor(&self, account: AccountId) -> AppResult<AccountVendor> {
        Ok(self.accounts.get(account)?.vendor)
    }

    /// Pick the signing path from the account's vendor
    pub fn signing_context(
        &self,
        account: AccountId,
        signer: Option<Arc<dyn ExternalSigner>>,
    ) -> AppResult<SigningContext> {
        if self.account_vendor(account)?.requires_external_signer() {
            let signer = signer.ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Account {} signs with a hardware wallet but no signer was provided",
                    account
                ))
            })?;
            Ok(SigningContext::External { account, signer })
        } else {
            Ok(SigningContext::Direct { account })
        }
    }

    /// Claim the account for one submission
    pub fn begin(&self, account: AccountId) -> AppResult<SendingGuard> {
        self.accounts.get(account)?;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(account) {
            tracing::warn!("Refusing second submission for account {}", account);
            return Err(AppError::SubmissionInFlight(account));
        }

        Ok(SendingGuard {
            account,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_sending(&self, account: AccountId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&account)
    }

    /// Sign, create and broadcast every transaction of `proposal`.
    ///
    /// Errors only when the account is unknown or already sending; the SDK
    /// is not touched in that case.
    pub async fn submit(&self, proposal: Proposal, ctx: SigningContext) -> AppResult<Submission> {
        let guard = self.begin(ctx.account())?;

        match ctx {
            SigningContext::Direct { .. } => {
                Ok(Submission::Completed(self.send_direct(&guard, proposal).await))
            }
            SigningContext::External { signer, .. } => {
                let mut pipeline = PcztPipeline::new();
                pipeline.load_proposal(proposal);

                let redacted = match self.prepare_for_signer(&guard, &mut pipeline).await {
                    Ok(redacted) => redacted,
                    Err(result) => return Ok(Submission::Completed(result)),
                };

                match signer.collect_signatures(&redacted).await {
                    Ok(pczt_with_sigs) => Ok(Submission::Completed(
                        self.complete_with_signatures(&guard, &mut pipeline, pczt_with_sigs)
                            .await,
                    )),
                    Err(SignerError::Rejected) => {
                        self.abandon(&guard, &mut pipeline);
                        Ok(Submission::Rejected)
                    }
                    Err(SignerError::Scan(failure)) => {
                        tracing::warn!(
                            "Signature scan failed for account {}: {}",
                            guard.account(),
                            failure
                        );
                        self.abandon(&guard, &mut pipeline);
                        Ok(Submission::ScanFailed(failure))
                    }
                }
            }
        }
    }

    /// Direct path: derive the key, let the SDK create and broadcast everything
    pub async fn send_direct(&self, guard: &SendingGuard, proposal: Proposal) -> SubmissionResult {
        let account = guard.account();
        let meta = ProposalMeta::of(Some(&proposal));
        tracing::info!(
            "Submitting {} proposal for account {} ({} transaction(s))",
            meta.kind,
            account,
            meta.transaction_count
        );

        let result = match self.wallet_service.spending_key(account).await {
            Err(e) => AggregateResult::fatal(SPENDING_KEY_CODE, e.to_string()),
            Ok(key) => match self.sdk.create_proposed_transactions(&proposal, &key).await {
                Ok(outcomes) => collect_and_classify(outcomes, meta.transaction_count).await,
                Err(e) => AggregateResult::fatal(e.code, e.message),
            },
        };
        drop(proposal);

        self.finish(account, meta, result, Vec::new()).await
    }

    /// PCZT path up to the signer: returns the redacted PCZT to show as a QR
    /// code. On failure the pipeline is already reset.
    pub async fn prepare_for_signer(
        &self,
        guard: &SendingGuard,
        pipeline: &mut PcztPipeline,
    ) -> Result<Pczt, SubmissionResult> {
        let account = guard.account();
        tracing::info!("Resolving PCZT for account {}", account);

        let resolved = pipeline.resolve(self.sdk.as_ref(), account).await.cloned();
        match resolved {
            Ok(redacted) => {
                tracing::info!(
                    "PCZT ready for signer ({} bytes redacted)",
                    redacted.len()
                );
                Ok(redacted)
            }
            Err(e) => Err(self.fail_pipeline(account, pipeline, e).await),
        }
    }

    /// PCZT path after the signer answered: merge, broadcast, classify
    pub async fn complete_with_signatures(
        &self,
        guard: &SendingGuard,
        pipeline: &mut PcztPipeline,
        pczt_with_sigs: Pczt,
    ) -> SubmissionResult {
        let account = guard.account();
        let meta = ProposalMeta::of(pipeline.proposal());

        if let Err(e) = pipeline.attach_signatures(pczt_with_sigs) {
            return self.fail_pipeline(account, pipeline, e).await;
        }

        let outcomes = match pipeline.extract(self.sdk.as_ref()).await {
            Ok(outcomes) => outcomes,
            Err(e) => return self.fail_pipeline(account, pipeline, e).await,
        };

        let result = collect_and_classify(outcomes, meta.transaction_count).await;
        let dumps = match result {
            AggregateResult::Failure { .. } => self.dumps(pipeline),
            _ => Vec::new(),
        };
        pipeline.reset();

        self.finish(account, meta, result, dumps).await
    }

    /// Discard the attempt after the user backed out of signing
    pub fn abandon(&self, guard: &SendingGuard, pipeline: &mut PcztPipeline) {
        pipeline.reset();
        tracing::info!("Discarded PCZT artifacts for account {}", guard.account());
    }

    async fn fail_pipeline(
        &self,
        account: AccountId,
        pipeline: &mut PcztPipeline,
        err: PcztError,
    ) -> SubmissionResult {
        tracing::warn!("PCZT pipeline failed for account {}: {}", account, err);

        let meta = ProposalMeta::of(pipeline.proposal());
        let dumps = self.dumps(pipeline);
        pipeline.reset();

        let result = AggregateResult::fatal(err.code(), err.to_string());
        self.finish(account, meta, result, dumps).await
    }

    fn dumps(&self, pipeline: &PcztPipeline) -> Vec<PcztDump> {
        if self.config.debug_pczt_dumps {
            capture_dumps(pipeline)
        } else {
            Vec::new()
        }
    }

    async fn finish(
        &self,
        account: AccountId,
        meta: ProposalMeta,
        result: AggregateResult,
        pczt_dumps: Vec<PcztDump>,
    ) -> SubmissionResult {
        let (error_code, error_message) = match &result {
            AggregateResult::Success { txids } => {
                tracing::info!("Submitted {} transaction(s) for account {}", txids.len(), account);
                (None, None)
            }
            AggregateResult::GrpcFailure { txids } => {
                tracing::warn!(
                    "Could not reach lightwalletd for {} transaction(s) of account {}",
                    txids.len(),
                    account
                );
                (None, None)
            }
            AggregateResult::Failure {
                code, description, ..
            } => {
                tracing::error!(
                    "Submission failed for account {}: code {} {}",
                    account,
                    code,
                    description
                );
                (Some(*code), Some(description.clone()))
            }
            AggregateResult::Partial { statuses, .. } => {
                tracing::warn!(
                    "Partial submission for account {}: {:?}",
                    account,
                    statuses
                );
                (None, None)
            }
        };

        let statuses = match &result {
            AggregateResult::Partial { statuses, .. } => statuses.clone(),
            _ => Vec::new(),
        };

        let record = self
            .store
            .record(NewTransferRecord {
                account,
                kind: meta.kind,
                status: SubmissionStatus::from(&result),
                txids: result.txids().iter().map(|t| t.to_string()).collect(),
                statuses,
                fee_zatoshis: meta.total_fee.into_u64(),
                error_code,
                error_message,
            })
            .await;

        SubmissionResult {
            account,
            kind: meta.kind,
            total_fee: meta.total_fee,
            result,
            pczt_dumps,
            record_id: record.id,
        }
    }
}

/// Drain the outcome stream, then classify. A length mismatch is fatal:
/// classification assumes one outcome per proposed transaction.
async fn collect_and_classify(outcomes: OutcomeStream, expected: usize) -> AggregateResult {
    let outcomes: Vec<TxOutcome> = outcomes.collect().await;
    if outcomes.len() != expected {
        return AggregateResult::fatal(
            OUTCOME_COUNT_CODE,
            format!(
                "expected {} transaction outcome(s), got {}",
                expected,
                outcomes.len()
            ),
        );
    }
    classify(&outcomes, expected)
}

impl From<&AggregateResult> for SubmissionStatus {
    fn from(result: &AggregateResult) -> Self {
        match result {
            AggregateResult::Success { .. } => SubmissionStatus::Success,
            AggregateResult::Failure { .. } => SubmissionStatus::Failure,
            AggregateResult::GrpcFailure { .. } => SubmissionStatus::GrpcFailure,
            AggregateResult::Partial { .. } => SubmissionStatus::Partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreEvent;
    use crate::testutils::Harness;
    use crate::testutils::{
        harness, harness_without_seed, proposal, txid, MockSdk, MockSigner, SdkCall, KEYSTONE,
        ZASHI,
    };

    fn completed(submission: Submission) -> SubmissionResult {
        match submission {
            Submission::Completed(result) => result,
            other => panic!("expected a completed submission, got {:?}", other),
        }
    }

    fn external(signer: MockSigner) -> SigningContext {
        SigningContext::External {
            account: KEYSTONE,
            signer: Arc::new(signer),
        }
    }

    #[tokio::test]
    async fn test_direct_partial_submission() {
        let sdk = MockSdk::new().with_outcomes(vec![
            TxOutcome::Success { txid: txid(1) },
            TxOutcome::Success { txid: txid(2) },
            TxOutcome::SubmitFailure {
                txid: txid(3),
                code: 42,
                description: "insufficient fee".to_string(),
            },
        ]);
        let h = harness(sdk, false).await;

        let result = completed(
            h.service
                .submit(proposal(3), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        assert_eq!(
            result.result,
            AggregateResult::Partial {
                txids: vec![txid(1), txid(2), txid(3)],
                statuses: vec![
                    "success".to_string(),
                    "success".to_string(),
                    "code: 42 desc: insufficient fee".to_string(),
                ],
            }
        );
        assert_eq!(result.result.last_txid(), Some(txid(3)));
        assert!(!h.service.is_sending(ZASHI));

        let record = h.store.get(result.record_id).await.unwrap();
        assert_eq!(record.status, SubmissionStatus::Partial);
        assert_eq!(record.statuses.len(), 3);
    }

    #[tokio::test]
    async fn test_direct_grpc_failure() {
        let sdk = MockSdk::new().with_outcomes(vec![TxOutcome::GrpcFailure {
            txid: txid(1),
            error: "network unreachable".to_string(),
        }]);
        let h = harness(sdk, false).await;

        let result = completed(
            h.service
                .submit(proposal(1), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        assert_eq!(result.result, AggregateResult::GrpcFailure { txids: vec![txid(1)] });
        assert!(result.result.is_resubmittable());
    }

    #[tokio::test]
    async fn test_direct_sdk_error_is_fatal_failure() {
        let h = harness(MockSdk::new().fail_at(SdkCall::CreateProposed), false).await;

        let result = completed(
            h.service
                .submit(proposal(1), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        match result.result {
            AggregateResult::Failure { txids, code, .. } => {
                assert!(txids.is_empty());
                assert_eq!(code, -1);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    async fn assert_spending_key_failure(h: Harness) {
        let result = completed(
            h.service
                .submit(proposal(1), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        match &result.result {
            AggregateResult::Failure { txids, code, .. } => {
                assert_eq!(*code, SPENDING_KEY_CODE);
                assert!(txids.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!h.sdk.calls().contains(&SdkCall::CreateProposed));
        assert!(!h.service.is_sending(ZASHI));

        let record = h.store.get(result.record_id).await.unwrap();
        assert_eq!(record.status, SubmissionStatus::Failure);
        assert_eq!(record.error_code, Some(SPENDING_KEY_CODE));
    }

    #[tokio::test]
    async fn test_missing_seed_is_fatal_failure() {
        assert_spending_key_failure(harness_without_seed(MockSdk::new()).await).await;
    }

    #[tokio::test]
    async fn test_key_derivation_error_is_fatal_failure() {
        let h = harness(MockSdk::new().fail_at(SdkCall::DeriveKey), false).await;
        assert_spending_key_failure(h).await;
    }

    #[tokio::test]
    async fn test_outcome_count_mismatch_is_fatal() {
        let h = harness(MockSdk::new(), false).await;

        // The mock yields a single outcome for a two-transaction proposal
        let result = completed(
            h.service
                .submit(proposal(2), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        assert!(matches!(
            result.result,
            AggregateResult::Failure { code: OUTCOME_COUNT_CODE, .. }
        ));
    }

    #[tokio::test]
    async fn test_pczt_flow_success() {
        let h = harness(MockSdk::new(), false).await;
        let signer = Arc::new(MockSigner::signing());

        let result = completed(
            h.service
                .submit(
                    proposal(1),
                    SigningContext::External {
                        account: KEYSTONE,
                        signer: signer.clone(),
                    },
                )
                .await
                .unwrap(),
        );

        assert_eq!(result.result, AggregateResult::Success { txids: vec![txid(1)] });
        assert_eq!(signer.seen(), vec![Pczt::from_bytes(b"pczt-redacted".to_vec())]);
        assert!(!h.sdk.calls().contains(&SdkCall::DeriveKey));
        assert_eq!(h.sdk.calls().last(), Some(&SdkCall::CreateFromPczt));
    }

    #[tokio::test]
    async fn test_proof_failure_reports_stage_code_and_clears_artifacts() {
        let h = harness(MockSdk::new().fail_at(SdkCall::AddProofs), true).await;
        let guard = h.service.begin(KEYSTONE).unwrap();

        let mut pipeline = PcztPipeline::new();
        pipeline.load_proposal(proposal(1));
        let result = h
            .service
            .prepare_for_signer(&guard, &mut pipeline)
            .await
            .unwrap_err();

        assert!(matches!(result.result, AggregateResult::Failure { code: -798, .. }));
        assert!(pipeline.is_empty());
        assert!(pipeline.redacted_pczt_for_signer().is_none());

        // The redacted artifact existed at failure time and made it into the dumps
        let names: Vec<_> = result.pczt_dumps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["pczt", "redactedPcztForSigner"]);
    }

    #[tokio::test]
    async fn test_dumps_omitted_outside_debug() {
        let h = harness(MockSdk::new().fail_at(SdkCall::AddProofs), false).await;

        let result = completed(
            h.service
                .submit(proposal(1), external(MockSigner::signing()))
                .await
                .unwrap(),
        );

        assert!(matches!(result.result, AggregateResult::Failure { code: -798, .. }));
        assert!(result.pczt_dumps.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_not_recorded() {
        let h = harness(MockSdk::new(), false).await;

        let submission = h
            .service
            .submit(proposal(1), external(MockSigner::answering(Err(SignerError::Rejected))))
            .await
            .unwrap();

        assert!(matches!(submission, Submission::Rejected));
        assert_eq!(h.store.count().await, 0);
        assert!(!h.sdk.calls().contains(&SdkCall::CreateFromPczt));
        assert!(!h.service.is_sending(KEYSTONE));
    }

    #[tokio::test]
    async fn test_scan_failure_surfaces_kind() {
        let h = harness(MockSdk::new(), false).await;
        let failure = ScanFailure::DuringScan("unreadable frame".to_string());

        let submission = h
            .service
            .submit(
                proposal(1),
                external(MockSigner::answering(Err(SignerError::Scan(failure.clone())))),
            )
            .await
            .unwrap();

        match submission {
            Submission::ScanFailed(kind) => assert_eq!(kind, failure),
            other => panic!("expected scan failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_failure_after_signing() {
        let h = harness(MockSdk::new().fail_at(SdkCall::CreateFromPczt), false).await;

        let result = completed(
            h.service
                .submit(proposal(1), external(MockSigner::signing()))
                .await
                .unwrap(),
        );

        assert!(matches!(result.result, AggregateResult::Failure { code: -800, .. }));
    }

    #[tokio::test]
    async fn test_second_submission_refused_while_sending() {
        let h = harness(MockSdk::new(), false).await;
        let _guard = h.service.begin(ZASHI).unwrap();

        let err = h
            .service
            .submit(proposal(1), SigningContext::Direct { account: ZASHI })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SubmissionInFlight(ZASHI)));
        assert!(h.sdk.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signing_context_follows_vendor() {
        let h = harness(MockSdk::new(), false).await;

        assert!(matches!(
            h.service.signing_context(ZASHI, None).unwrap(),
            SigningContext::Direct { .. }
        ));
        assert!(h.service.signing_context(KEYSTONE, None).is_err());

        let signer: Arc<dyn ExternalSigner> = Arc::new(MockSigner::signing());
        assert!(matches!(
            h.service.signing_context(KEYSTONE, Some(signer)).unwrap(),
            SigningContext::External { .. }
        ));
    }

    #[tokio::test]
    async fn test_terminal_results_are_broadcast() {
        let h = harness(MockSdk::new(), false).await;
        let mut events = h.store.subscribe();

        let result = completed(
            h.service
                .submit(proposal(1), SigningContext::Direct { account: ZASHI })
                .await
                .unwrap(),
        );

        match events.recv().await.unwrap() {
            StoreEvent::Recorded(record) => {
                assert_eq!(record.id, result.record_id);
                assert_eq!(record.txids, vec![txid(1).to_string()]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
