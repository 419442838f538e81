//! Transaction submission: classification of outcomes, the PCZT co-signing
//! pipeline, support reports and the confirmation screen state machine.

pub mod flow;
pub mod outcome;
pub mod pczt;
pub mod report;

use zcash_protocol::value::Zatoshis;

use crate::blockchain::{AccountId, ProposalKind};

pub use flow::{Screen, SendConfirmation, SignerState};
pub use outcome::{classify, AggregateResult};
pub use pczt::{PcztError, PcztPipeline, PcztStage, ScanFailure, SignerError};
pub use report::{PcztDump, SupportReport};

/// Terminal result of one submission attempt, as handed to the UI
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub account: AccountId,
    pub kind: ProposalKind,
    pub total_fee: Zatoshis,
    pub result: AggregateResult,
    /// Hex dumps of PCZT artifacts present at failure time (debug only)
    pub pczt_dumps: Vec<PcztDump>,
    /// Id of the transaction store record written for this attempt
    pub record_id: u64,
}
