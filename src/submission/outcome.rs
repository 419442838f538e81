//! Classification of per-transaction outcomes into one aggregate result.

use zcash_primitives::transaction::TxId;

use crate::blockchain::TxOutcome;

/// What the rest of the wallet learns about a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateResult {
    /// Every transaction was accepted
    Success { txids: Vec<TxId> },
    /// Nothing was accepted and the server rejected the submission.
    /// Also used for fatal errors raised before any transaction existed,
    /// in which case `txids` is empty.
    Failure {
        txids: Vec<TxId>,
        code: i32,
        description: String,
    },
    /// Nothing was accepted because the server was unreachable; safe to resubmit
    GrpcFailure { txids: Vec<TxId> },
    /// Some transactions were accepted and some were not. Never retried as
    /// a whole: the accepted ones would be spent twice.
    Partial {
        txids: Vec<TxId>,
        statuses: Vec<String>,
    },
}

impl AggregateResult {
    pub fn fatal(code: i32, description: impl Into<String>) -> Self {
        AggregateResult::Failure {
            txids: Vec::new(),
            code,
            description: description.into(),
        }
    }

    pub fn txids(&self) -> &[TxId] {
        match self {
            AggregateResult::Success { txids }
            | AggregateResult::Failure { txids, .. }
            | AggregateResult::GrpcFailure { txids }
            | AggregateResult::Partial { txids, .. } => txids,
        }
    }

    /// The transaction surfaced for follow-up actions. Multi-transaction
    /// proposals only expose their final sub-transaction.
    pub fn last_txid(&self) -> Option<TxId> {
        self.txids().last().copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggregateResult::Success { .. } => "success",
            AggregateResult::Failure { .. } => "failure",
            AggregateResult::GrpcFailure { .. } => "grpcFailure",
            AggregateResult::Partial { .. } => "partial",
        }
    }

    pub fn is_resubmittable(&self) -> bool {
        matches!(self, AggregateResult::GrpcFailure { .. })
    }
}

/// Fold the ordered outcomes of one submission into an [`AggregateResult`].
///
/// With no successes a gRPC failure anywhere in the batch wins over any
/// submit failure, whose code and description are then dropped. Otherwise
/// the last submit failure is reported.
pub fn classify(outcomes: &[TxOutcome], expected_count: usize) -> AggregateResult {
    let txids: Vec<TxId> = outcomes.iter().map(TxOutcome::txid).collect();
    let success_count = outcomes.iter().filter(|o| o.is_success()).count();

    if success_count == 0 {
        let any_grpc = outcomes
            .iter()
            .any(|o| matches!(o, TxOutcome::GrpcFailure { .. }));
        if any_grpc {
            return AggregateResult::GrpcFailure { txids };
        }

        let (code, description) = outcomes
            .iter()
            .rev()
            .find_map(|o| match o {
                TxOutcome::SubmitFailure {
                    code, description, ..
                } => Some((*code, description.clone())),
                _ => None,
            })
            .unwrap_or((0, String::new()));

        AggregateResult::Failure {
            txids,
            code,
            description,
        }
    } else if success_count == expected_count {
        AggregateResult::Success { txids }
    } else {
        let statuses = outcomes.iter().map(TxOutcome::status_label).collect();
        AggregateResult::Partial { txids, statuses }
    }
}
