//! PCZT co-signing pipeline for accounts whose key lives on a hardware wallet.
//!
//! Stages: resolve the proposal into a PCZT, then redact it for the signer
//! and attach proofs concurrently, wait for the signed PCZT to come back
//! from the device, and finally hand both halves to the SDK for extraction
//! and broadcast. Each stage produces a new artifact; none is mutated.

use std::fmt;

use crate::blockchain::{AccountId, OutcomeStream, Pczt, Proposal, SdkError, WalletSdk};

/// Support code when the pipeline is driven out of order
pub const PIPELINE_STATE_CODE: i32 = -801;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcztStage {
    Resolve,
    Redact,
    AddProofs,
    Extract,
}

impl PcztStage {
    /// Stable negative code quoted in support reports
    pub fn code(self) -> i32 {
        match self {
            PcztStage::Resolve => -797,
            PcztStage::AddProofs => -798,
            PcztStage::Redact => -799,
            PcztStage::Extract => -800,
        }
    }
}

impl fmt::Display for PcztStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcztStage::Resolve => write!(f, "createPCZTFromProposal"),
            PcztStage::Redact => write!(f, "redactPCZTForSigner"),
            PcztStage::AddProofs => write!(f, "addProofsToPCZT"),
            PcztStage::Extract => write!(f, "createTransactionFromPCZT"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PcztError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: PcztStage,
        #[source]
        source: SdkError,
    },

    #[error("PCZT pipeline has no {0}")]
    Missing(&'static str),
}

impl PcztError {
    pub fn code(&self) -> i32 {
        match self {
            PcztError::Stage { stage, .. } => stage.code(),
            PcztError::Missing(_) => PIPELINE_STATE_CODE,
        }
    }

    fn stage(stage: PcztStage) -> impl FnOnce(SdkError) -> PcztError {
        move |source| PcztError::Stage { stage, source }
    }
}

/// Why scanning the signed PCZT from the device failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanFailure {
    /// Camera or permission problem before any frame was read
    #[error("scan could not start: {0}")]
    BeforeScan(String),
    /// Frames were read but did not decode into a signed PCZT
    #[error("scan failed: {0}")]
    DuringScan(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("signing rejected by user")]
    Rejected,

    #[error(transparent)]
    Scan(#[from] ScanFailure),
}

/// Proposal plus every PCZT artifact of the active attempt
#[derive(Debug, Default)]
pub struct PcztPipeline {
    proposal: Option<Proposal>,
    pczt: Option<Pczt>,
    redacted_pczt_for_signer: Option<Pczt>,
    pczt_with_proofs: Option<Pczt>,
    pczt_with_sigs: Option<Pczt>,
}

impl PcztPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt. Artifacts from any previous proposal are dropped.
    pub fn load_proposal(&mut self, proposal: Proposal) {
        self.reset();
        self.proposal = Some(proposal);
    }

    /// Create the PCZT, then redact it and add proofs in parallel.
    ///
    /// Successful artifacts are kept even when the sibling transform fails,
    /// so [`reset`](Self::reset) has something to clear. When both
    /// transforms fail the redaction error is reported.
    pub async fn resolve(
        &mut self,
        sdk: &dyn WalletSdk,
        account: AccountId,
    ) -> Result<&Pczt, PcztError> {
        let proposal = self.proposal.as_ref().ok_or(PcztError::Missing("proposal"))?;

        let pczt = sdk
            .create_pczt_from_proposal(account, proposal)
            .await
            .map_err(PcztError::stage(PcztStage::Resolve))?;
        tracing::debug!("Created PCZT for account {} ({} bytes)", account, pczt.len());

        let (redacted, with_proofs) = futures::join!(
            sdk.redact_pczt_for_signer(&pczt),
            sdk.add_proofs_to_pczt(&pczt)
        );
        self.pczt = Some(pczt);

        let redacted = redacted.map(|p| self.redacted_pczt_for_signer = Some(p));
        let with_proofs = with_proofs.map(|p| self.pczt_with_proofs = Some(p));
        redacted.map_err(PcztError::stage(PcztStage::Redact))?;
        with_proofs.map_err(PcztError::stage(PcztStage::AddProofs))?;

        self.redacted_pczt_for_signer
            .as_ref()
            .ok_or(PcztError::Missing("redacted PCZT"))
    }

    /// Store the PCZT returned by the external signer
    pub fn attach_signatures(&mut self, pczt_with_sigs: Pczt) -> Result<(), PcztError> {
        if self.pczt_with_proofs.is_none() {
            return Err(PcztError::Missing("PCZT with proofs"));
        }
        self.pczt_with_sigs = Some(pczt_with_sigs);
        Ok(())
    }

    pub async fn extract(&self, sdk: &dyn WalletSdk) -> Result<OutcomeStream, PcztError> {
        let with_proofs = self
            .pczt_with_proofs
            .as_ref()
            .ok_or(PcztError::Missing("PCZT with proofs"))?;
        let with_sigs = self
            .pczt_with_sigs
            .as_ref()
            .ok_or(PcztError::Missing("PCZT with signatures"))?;

        sdk.create_transaction_from_pczt(with_proofs, with_sigs)
            .await
            .map_err(PcztError::stage(PcztStage::Extract))
    }

    /// Hand the proposal to the direct signing path. Nothing of the attempt
    /// stays behind.
    pub fn take_proposal(&mut self) -> Option<Proposal> {
        let proposal = self.proposal.take();
        self.reset();
        proposal
    }

    /// Drop the proposal and every artifact
    pub fn reset(&mut self) {
        self.proposal = None;
        self.pczt = None;
        self.redacted_pczt_for_signer = None;
        self.pczt_with_proofs = None;
        self.pczt_with_sigs = None;
    }

    pub fn is_empty(&self) -> bool {
        self.proposal.is_none()
            && self.pczt.is_none()
            && self.redacted_pczt_for_signer.is_none()
            && self.pczt_with_proofs.is_none()
            && self.pczt_with_sigs.is_none()
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    pub fn pczt(&self) -> Option<&Pczt> {
        self.pczt.as_ref()
    }

    pub fn redacted_pczt_for_signer(&self) -> Option<&Pczt> {
        self.redacted_pczt_for_signer.as_ref()
    }

    pub fn pczt_with_proofs(&self) -> Option<&Pczt> {
        self.pczt_with_proofs.as_ref()
    }

    pub fn pczt_with_sigs(&self) -> Option<&Pczt> {
        self.pczt_with_sigs.as_ref()
    }

    /// Present artifacts with their names, in pipeline order
    pub fn artifacts(&self) -> Vec<(&'static str, &Pczt)> {
        [
            ("pczt", self.pczt.as_ref()),
            ("redactedPcztForSigner", self.redacted_pczt_for_signer.as_ref()),
            ("pcztWithProofs", self.pczt_with_proofs.as_ref()),
            ("pcztWithSigs", self.pczt_with_sigs.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, pczt)| pczt.map(|p| (name, p)))
        .collect()
    }
}
