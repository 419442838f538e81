pub mod registry;
pub mod traits;
pub mod types;

pub use registry::{AccountInfo, AccountRegistry, AccountVendor};
pub use traits::{ExternalSigner, WalletSdk};
pub use types::{
    AccountBalance, AccountId, OutcomeStream, Pczt, Proposal, ProposalKind, SdkError, SdkResult,
    SpendingKey, TxOutcome,
};
