use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Token {0} not found")]
    TokenNotFound(String),

    #[error("No liquidity pool found for {token_in}/{token_out}")]
    NoLiquidityPool { token_in: String, token_out: String },

    #[error("Insufficient {symbol} balance. Available: {available}, Requested: {required}")]
    InsufficientBalance {
        symbol: String,
        required: String,
        available: String,
    },

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Slippage must be between 0 and 1, got {0}")]
    InvalidSlippage(String),

    #[error("Invalid token pair: {0}")]
    InvalidTokenPair(String),

    #[error("Slippage exceeded: minimum output {minimum}, actual output {actual}")]
    SlippageExceeded { minimum: String, actual: String },

    #[error("Not connected to MCP server")]
    NotConnected,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("External call failed: {0}")]
    ExternalCallFailure(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Precision error: {0}")]
    PrecisionError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl WalletError {
    /// Stable machine-readable code carried in error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::TokenNotFound(_) => "TokenNotFound",
            WalletError::NoLiquidityPool { .. } => "NoLiquidityPool",
            WalletError::InsufficientBalance { .. } => "InsufficientBalance",
            WalletError::InvalidRecipient(_) => "InvalidRecipient",
            WalletError::InvalidAmount(_) => "InvalidAmount",
            WalletError::InvalidSlippage(_) => "InvalidSlippage",
            WalletError::InvalidTokenPair(_) => "InvalidTokenPair",
            WalletError::SlippageExceeded { .. } => "SlippageExceeded",
            WalletError::NotConnected => "NotConnected",
            WalletError::ToolNotFound(_) => "ToolNotFound",
            WalletError::ResourceNotFound(_) => "ResourceNotFound",
            WalletError::InvalidArguments(_) => "InvalidArguments",
            WalletError::ExternalCallFailure(_) => "ExternalCallFailure",
            WalletError::MissingCredential(_) => "MissingCredential",
            WalletError::ConfigError(_) => "ConfigError",
            WalletError::PrecisionError(_) => "PrecisionError",
            WalletError::ProtocolError(_) => "ProtocolError",
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
