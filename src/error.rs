use thiserror::Error;

/// Top-level error type for the monitor
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ledger feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Activation failed: {0}")]
    Activation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while reading the transaction feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors raised by the savings vault collaborator
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault RPC failed: {0}")]
    Rpc(String),

    #[error("Failed to decode vault account: {0}")]
    AccountDecode(String),

    #[error("Vault has not been initialized")]
    NotInitialized,

    #[error("Vault is not active")]
    Inactive,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Insufficient funds in vault: requested {requested}, available {available}")]
    InsufficientFunds { requested: String, available: String },

    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
