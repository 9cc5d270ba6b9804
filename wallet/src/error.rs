use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("insufficient balance (needed {needed}, available {available})")]
    Balance { needed: u128, available: u128 },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("condition violated: {0}")]
    ConditionViolation(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl WalletError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    pub fn violation(msg: impl Into<String>) -> Self {
        Self::ConditionViolation(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Decode failures caused by running out of input.
    pub fn eof(what: &str, needed: usize, available: usize) -> Self {
        Self::InvalidValue(format!(
            "unexpected end of input decoding {what}: needed {needed} bytes, {available} left"
        ))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        Self::InvalidValue(format!("invalid hex: {err}"))
    }
}

impl From<codec::Error> for WalletError {
    fn from(err: codec::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<jsonrpsee::core::ClientError> for WalletError {
    fn from(err: jsonrpsee::core::ClientError) -> Self {
        Self::Network(err.to_string())
    }
}

pub type WalletResult<T> = Result<T, WalletError>;
