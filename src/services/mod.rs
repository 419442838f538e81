pub mod proposal_service;
pub mod submission_service;
pub mod wallet_service;

pub use proposal_service::{ProposalError, ProposalService};
pub use submission_service::{SendingGuard, SigningContext, Submission, SubmissionService};
pub use wallet_service::WalletService;
