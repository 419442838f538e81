pub mod models;
pub mod transaction_store;

pub use models::{NewTransferRecord, StoreEvent, SubmissionStatus, TransferRecord};
pub use transaction_store::TransactionStore;
