use thiserror::Error;

use crate::core::transaction::TransactionStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient balance: required {required}, available {available}, missing {shortfall}")]
    InsufficientBalance {
        required: u64,
        available: u64,
        shortfall: u64,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unknown coin denomination: {0}")]
    UnknownDenomination(String),

    #[error("Duplicate transaction: idempotency key {0} was already applied")]
    DuplicateTransaction(String),

    #[error("Idempotency conflict: key {0} was reused with a different request")]
    IdempotencyConflict(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Balance unknown: {0}")]
    BalanceUnknown(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Errors the user can recover from without a code or config change.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            WalletError::UnknownDenomination(_) | WalletError::Config(_)
        )
    }

    /// Errors that mean the balance could not be established and must be treated as unknown.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WalletError::Network(_) | WalletError::InvalidResponse(_) | WalletError::BalanceUnknown(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WalletError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            WalletError::InvalidResponse(err.to_string())
        } else {
            WalletError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::InvalidResponse(err.to_string())
    }
}
