//! Values exchanged with the wallet SDK.
//!
//! Proposals and PCZTs are opaque to this crate: the SDK produces them and
//! is the only party that understands their contents. We only carry the
//! metadata the submission flow needs (transaction count, fee, kind).

use std::fmt;
use std::num::NonZeroUsize;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use zcash_primitives::transaction::TxId;
use zcash_protocol::value::Zatoshis;

/// Wallet account identifier as assigned by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalKind {
    /// Payment to a recipient
    Transfer,
    /// Move transparent funds into the shielded pool
    Shielding,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalKind::Transfer => write!(f, "transfer"),
            ProposalKind::Shielding => write!(f, "shielding"),
        }
    }
}

/// An SDK-produced plan for one or more transactions.
///
/// Deliberately not `Clone`: a proposal is consumed by exactly one
/// submission attempt.
#[derive(Debug, PartialEq, Eq)]
pub struct Proposal {
    kind: ProposalKind,
    transaction_count: NonZeroUsize,
    total_fee: Zatoshis,
    payload: Vec<u8>,
}

impl Proposal {
    pub fn new(
        kind: ProposalKind,
        transaction_count: NonZeroUsize,
        total_fee: Zatoshis,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            transaction_count,
            total_fee,
            payload,
        }
    }

    pub fn kind(&self) -> ProposalKind {
        self.kind
    }

    /// Number of transactions the SDK will create; always at least one
    pub fn transaction_count(&self) -> usize {
        self.transaction_count.get()
    }

    pub fn total_fee(&self) -> Zatoshis {
        self.total_fee
    }

    /// SDK-specific serialized form
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Partially created Zcash transaction, as an opaque encoded blob
#[derive(Clone, PartialEq, Eq)]
pub struct Pczt(Vec<u8>);

impl Pczt {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Pczt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pczt({} bytes)", self.0.len())
    }
}

/// Unified spending key derived by the SDK from the wallet seed
pub struct SpendingKey(Vec<u8>);

impl SpendingKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpendingKey(..)")
    }
}

impl Drop for SpendingKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Result of creating and broadcasting one transaction of a proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Success {
        txid: TxId,
    },
    /// The transaction was created but lightwalletd could not be reached
    GrpcFailure {
        txid: TxId,
        error: String,
    },
    /// lightwalletd rejected the transaction
    SubmitFailure {
        txid: TxId,
        code: i32,
        description: String,
    },
    /// An earlier transaction failed so this one was never sent
    NotAttempted {
        txid: TxId,
    },
}

impl TxOutcome {
    pub fn txid(&self) -> TxId {
        match self {
            TxOutcome::Success { txid }
            | TxOutcome::GrpcFailure { txid, .. }
            | TxOutcome::SubmitFailure { txid, .. }
            | TxOutcome::NotAttempted { txid } => *txid,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }

    /// Human readable status shown per transaction on the partial-result screen
    pub fn status_label(&self) -> String {
        match self {
            TxOutcome::Success { .. } => "success".to_string(),
            TxOutcome::GrpcFailure { error, .. } => error.clone(),
            TxOutcome::SubmitFailure {
                code, description, ..
            } => format!("code: {} desc: {}", code, description),
            TxOutcome::NotAttempted { .. } => "notAttempted".to_string(),
        }
    }
}

/// Ordered per-transaction outcomes, one item per proposed transaction
pub type OutcomeStream = BoxStream<'static, TxOutcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    /// Confirmed shielded funds that can be spent now
    pub spendable: Zatoshis,
    /// Funds waiting for confirmations
    pub pending: Zatoshis,
    /// Transparent funds that can only be shielded
    pub transparent: Zatoshis,
}

/// Error reported by the wallet SDK
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct SdkError {
    pub code: i32,
    pub message: String,
}

impl SdkError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result type for wallet SDK calls
pub type SdkResult<T> = Result<T, SdkError>;
