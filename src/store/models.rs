use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::{AccountId, ProposalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionStatus {
    Success,
    Failure,
    GrpcFailure,
    Partial,
}

/// One finished submission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: u64,
    pub account: AccountId,
    pub kind: ProposalKind,
    pub status: SubmissionStatus,
    /// Hex transaction ids in submission order
    pub txids: Vec<String>,
    /// Per-transaction statuses, only for partial submissions
    pub statuses: Vec<String>,
    pub fee_zatoshis: u64,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the writer; id and timestamp are assigned by the store
#[derive(Debug, Clone)]
pub struct NewTransferRecord {
    pub account: AccountId,
    pub kind: ProposalKind,
    pub status: SubmissionStatus,
    pub txids: Vec<String>,
    pub statuses: Vec<String>,
    pub fee_zatoshis: u64,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Recorded(TransferRecord),
    /// The oldest record was dropped to stay within capacity
    Evicted { id: u64 },
}
