//! Confirmation screen state for one account.
//!
//! The screen only changes on explicit events. Direct accounts go from
//! `send_tapped` straight to a result screen; hardware wallet accounts first
//! show the redacted PCZT as a QR code and wait for `signature_scanned`.

use std::sync::Arc;

use zcash_primitives::transaction::TxId;

use crate::blockchain::{AccountId, Pczt, Proposal};
use crate::error::{AppError, AppResult};
use crate::services::submission_service::{SendingGuard, SubmissionService};

use super::outcome::AggregateResult;
use super::pczt::{PcztPipeline, ScanFailure};
use super::report::SupportReport;
use super::SubmissionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    None,
    Sending,
    Success,
    Failure,
    Partial,
    Resubmission,
}

impl Screen {
    pub fn for_result(result: &AggregateResult) -> Self {
        match result {
            AggregateResult::Success { .. } => Screen::Success,
            AggregateResult::Failure { .. } => Screen::Failure,
            AggregateResult::GrpcFailure { .. } => Screen::Resubmission,
            AggregateResult::Partial { .. } => Screen::Partial,
        }
    }
}

/// Progress of the hardware wallet round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerState {
    Idle,
    /// Redacted PCZT is on screen as a QR code
    AwaitingSignature { redacted: Pczt },
    /// Reading the signed PCZT back failed; the user may scan again
    ScanFailed { redacted: Pczt, failure: ScanFailure },
}

pub struct SendConfirmation {
    account: AccountId,
    service: Arc<SubmissionService>,
    /// Owns the live proposal along with the PCZT artifacts
    pipeline: PcztPipeline,
    guard: Option<SendingGuard>,
    screen: Screen,
    signer: SignerState,
    last_result: Option<SubmissionResult>,
}

impl SendConfirmation {
    pub fn new(account: AccountId, service: Arc<SubmissionService>) -> Self {
        Self {
            account,
            service,
            pipeline: PcztPipeline::new(),
            guard: None,
            screen: Screen::None,
            signer: SignerState::Idle,
            last_result: None,
        }
    }

    /// Make `proposal` the live one. Any artifacts of a previous attempt are
    /// dropped.
    pub fn load_proposal(&mut self, proposal: Proposal) -> AppResult<()> {
        if self.guard.is_some() || self.screen == Screen::Sending {
            return Err(AppError::SubmissionInFlight(self.account));
        }

        self.pipeline.load_proposal(proposal);
        self.signer = SignerState::Idle;
        self.screen = Screen::None;
        self.last_result = None;
        Ok(())
    }

    /// Direct path: sign in-process and broadcast
    pub async fn send_tapped(&mut self) -> AppResult<Screen> {
        self.ensure_vendor(false)?;
        let guard = self.service.begin(self.account)?;
        let proposal = self.take_proposal()?;

        self.screen = Screen::Sending;
        let service = self.service.clone();
        let result = service.send_direct(&guard, proposal).await;
        drop(guard);

        Ok(self.apply_result(result))
    }

    /// Hardware wallet path: build the PCZT and return the redacted copy to
    /// show to the device. `None` means the pipeline failed and the screen
    /// now shows the failure.
    ///
    /// The screen is `Sending` while the SDK builds the PCZT and goes back to
    /// `None` once the QR code is up; the signer state drives that view.
    pub async fn confirm_with_hardware_wallet(&mut self) -> AppResult<Option<Pczt>> {
        self.ensure_vendor(true)?;
        let guard = self.service.begin(self.account)?;
        if self.pipeline.proposal().is_none() {
            return Err(no_proposal());
        }

        self.screen = Screen::Sending;
        let service = self.service.clone();
        match service.prepare_for_signer(&guard, &mut self.pipeline).await {
            Ok(redacted) => {
                self.guard = Some(guard);
                self.screen = Screen::None;
                self.signer = SignerState::AwaitingSignature {
                    redacted: redacted.clone(),
                };
                Ok(Some(redacted))
            }
            Err(result) => {
                drop(guard);
                self.apply_result(result);
                Ok(None)
            }
        }
    }

    /// The device returned the signed PCZT
    pub async fn signature_scanned(&mut self, pczt_with_sigs: Pczt) -> AppResult<Screen> {
        if matches!(self.signer, SignerState::Idle) {
            return Err(AppError::ValidationError(
                "No PCZT is waiting for signatures".to_string(),
            ));
        }
        let guard = self.guard.take().ok_or_else(|| {
            AppError::InternalError("Signer is waiting without a sending guard".to_string())
        })?;

        self.screen = Screen::Sending;
        self.signer = SignerState::Idle;
        let service = self.service.clone();
        let result = service
            .complete_with_signatures(&guard, &mut self.pipeline, pczt_with_sigs)
            .await;
        drop(guard);

        Ok(self.apply_result(result))
    }

    /// Reading the signed PCZT failed. Artifacts stay so the user can retry.
    pub fn scan_failed(&mut self, failure: ScanFailure) {
        let redacted = match &self.signer {
            SignerState::AwaitingSignature { redacted } | SignerState::ScanFailed { redacted, .. } => {
                redacted.clone()
            }
            SignerState::Idle => {
                tracing::debug!("Ignoring scan failure with no PCZT on screen: {}", failure);
                return;
            }
        };

        tracing::warn!("Signature scan failed for account {}: {}", self.account, failure);
        self.signer = SignerState::ScanFailed { redacted, failure };
    }

    /// The user backed out of hardware signing
    pub fn reject_tapped(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.service.abandon(&guard, &mut self.pipeline);
        }
        self.pipeline.reset();
        self.signer = SignerState::Idle;
        self.screen = Screen::None;
    }

    /// Leave a result screen
    pub fn close_tapped(&mut self) {
        if self.screen == Screen::Sending {
            return;
        }
        self.screen = Screen::None;
        self.last_result = None;
    }

    /// Diagnostic report for the failure or partial screen
    pub fn report_tapped(&self) -> Option<SupportReport> {
        match self.screen {
            Screen::Failure | Screen::Partial => {
                self.last_result.as_ref().and_then(SupportReport::from_result)
            }
            _ => None,
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn signer_state(&self) -> &SignerState {
        &self.signer
    }

    pub fn is_sending(&self) -> bool {
        self.service.is_sending(self.account)
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.pipeline.proposal()
    }

    pub fn pipeline(&self) -> &PcztPipeline {
        &self.pipeline
    }

    pub fn last_result(&self) -> Option<&SubmissionResult> {
        self.last_result.as_ref()
    }

    pub fn txids(&self) -> &[TxId] {
        self.last_result
            .as_ref()
            .map(|r| r.result.txids())
            .unwrap_or(&[])
    }

    /// Transaction offered for follow-up: the last one in outcome order
    pub fn last_txid(&self) -> Option<TxId> {
        self.last_result.as_ref().and_then(|r| r.result.last_txid())
    }

    pub fn failure(&self) -> Option<(i32, &str)> {
        match self.last_result.as_ref().map(|r| &r.result) {
            Some(AggregateResult::Failure {
                code, description, ..
            }) => Some((*code, description.as_str())),
            _ => None,
        }
    }

    fn ensure_vendor(&self, external: bool) -> AppResult<()> {
        let vendor = self.service.account_vendor(self.account)?;
        if vendor.requires_external_signer() != external {
            return Err(AppError::ValidationError(format!(
                "Account {} cannot sign this way",
                self.account
            )));
        }
        Ok(())
    }

    fn take_proposal(&mut self) -> AppResult<Proposal> {
        self.pipeline.take_proposal().ok_or_else(no_proposal)
    }

    fn apply_result(&mut self, result: SubmissionResult) -> Screen {
        self.screen = Screen::for_result(&result.result);
        tracing::info!(
            "Account {} moved to {:?} after {}",
            self.account,
            self.screen,
            result.result.label()
        );
        self.last_result = Some(result);
        self.screen
    }
}

fn no_proposal() -> AppError {
    AppError::ValidationError("No proposal to submit".to_string())
}
