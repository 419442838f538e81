use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::blockchain::{AccountId, ProposalKind};

use super::outcome::AggregateResult;
use super::pczt::PcztPipeline;
use super::SubmissionResult;

const ZATOSHIS_SCALE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcztDump {
    pub name: String,
    pub hex: String,
}

/// Hex dump of every artifact currently held by the pipeline
pub fn capture_dumps(pipeline: &PcztPipeline) -> Vec<PcztDump> {
    pipeline
        .artifacts()
        .into_iter()
        .map(|(name, pczt)| PcztDump {
            name: name.to_string(),
            hex: pczt.to_hex(),
        })
        .collect()
}

/// Diagnostic text offered to the user after a failed or partial submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportReport {
    pub account: AccountId,
    pub kind: ProposalKind,
    pub status: &'static str,
    pub code: Option<i32>,
    pub description: Option<String>,
    pub txids: Vec<String>,
    pub statuses: Vec<String>,
    pub fee_zec: Decimal,
    pub pczt_dumps: Vec<PcztDump>,
}

impl SupportReport {
    /// Only failures and partial submissions get a report
    pub fn from_result(submission: &SubmissionResult) -> Option<Self> {
        let (code, description, statuses) = match &submission.result {
            AggregateResult::Failure {
                code, description, ..
            } => (Some(*code), Some(description.clone()), Vec::new()),
            AggregateResult::Partial { statuses, .. } => (None, None, statuses.clone()),
            AggregateResult::Success { .. } | AggregateResult::GrpcFailure { .. } => return None,
        };

        let fee = i64::try_from(submission.total_fee.into_u64()).unwrap_or(i64::MAX);

        Some(Self {
            account: submission.account,
            kind: submission.kind,
            status: submission.result.label(),
            code,
            description,
            txids: submission
                .result
                .txids()
                .iter()
                .map(|t| t.to_string())
                .collect(),
            statuses,
            fee_zec: Decimal::new(fee, ZATOSHIS_SCALE).normalize(),
            pczt_dumps: submission.pczt_dumps.clone(),
        })
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Account: {}", self.account);
        let _ = writeln!(text, "Operation: {}", self.kind);
        let _ = writeln!(text, "Result: {}", self.status);
        let _ = writeln!(text, "Fee: {} ZEC", self.fee_zec);
        if let Some(code) = self.code {
            let _ = writeln!(text, "Code: {}", code);
        }
        if let Some(description) = &self.description {
            let _ = writeln!(text, "Description: {}", description);
        }

        if self.statuses.is_empty() {
            for txid in &self.txids {
                let _ = writeln!(text, "Transaction: {}", txid);
            }
        } else {
            for (txid, status) in self.txids.iter().zip(&self.statuses) {
                let _ = writeln!(text, "Transaction: {} ({})", txid, status);
            }
        }

        for dump in &self.pczt_dumps {
            let _ = writeln!(text, "{}: {}", dump.name, dump.hex);
        }
        text
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
