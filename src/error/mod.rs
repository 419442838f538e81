use std::fmt;

use crate::blockchain::types::{AccountId, SdkError};

#[derive(Debug)]
pub enum AppError {
    // Resource errors
    NotFound(String),
    AlreadyExists(String),

    // Validation errors
    ValidationError(String),
    InsufficientBalance(String),

    // Wallet SDK errors
    SdkError(String),

    // Submission errors
    SubmissionInFlight(AccountId),

    // Encryption errors
    EncryptionError(String),

    // Configuration errors
    ConfigError(String),

    // Internal errors
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::InsufficientBalance(msg) => write!(f, "Insufficient balance: {}", msg),
            AppError::SdkError(msg) => write!(f, "Wallet SDK error: {}", msg),
            AppError::SubmissionInFlight(account) => {
                write!(f, "A submission is already in flight for account {}", account)
            }
            AppError::EncryptionError(msg) => write!(f, "Encryption error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<SdkError> for AppError {
    fn from(err: SdkError) -> Self {
        tracing::error!("Wallet SDK error: {:?}", err);
        AppError::SdkError(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
