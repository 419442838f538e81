//! Transaction submission core of the Zashi wallet.
//!
//! Builds proposals through the wallet SDK, signs them either with an
//! in-process spending key or through the PCZT round trip with a hardware
//! wallet, and classifies the per-transaction outcomes into the single
//! result the UI shows.

pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;
pub mod submission;

#[cfg(test)]
pub(crate) mod testutils;

pub use blockchain::{AccountId, ExternalSigner, Pczt, Proposal, TxOutcome, WalletSdk};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::{ProposalService, SigningContext, Submission, SubmissionService, WalletService};
pub use store::TransactionStore;
pub use submission::{classify, AggregateResult, SendConfirmation, SubmissionResult};
