use thiserror::Error;

/// Closed error taxonomy surfaced to clients as a stable `code` string (see
/// spec §6/§7). Mirrors the teacher's per-crate `thiserror` error enums
/// (`order-pool::error::PoolError`, `rpc::OrderApiError`) collapsed into one
/// top-level type so `relay-http` has a single place to map `code` + status.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("token not accepted for fee payment")]
    TokenNotAccepted,

    #[error("wallet rate limited")]
    WalletRateLimited,

    #[error("ip rate limited")]
    IpRateLimited,

    #[error("no fee payer has capacity")]
    NoPayerCapacity,

    #[error("fee payer circuit breaker is open")]
    CircuitBreakerOpen,

    #[error("quote could not be produced")]
    QuoteFailed,

    #[error("quote not found")]
    QuoteNotFound,

    #[error("quote expired")]
    QuoteExpired,

    #[error("transaction exceeds the wire size limit")]
    TxTooLarge,

    #[error("transaction could not be deserialized")]
    InvalidTxFormat,

    #[error("transaction fingerprint already seen")]
    ReplayDetected,

    #[error("blockhash is no longer valid")]
    BlockhashExpired,

    #[error("structural validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    #[error("fee payer in the transaction does not match the reservation")]
    FeePayerMismatch,

    #[error("simulation failed: {0}")]
    SimulationFailed(String),

    #[error("submission failed")]
    SubmitFailed,

    #[error("invalid mint address")]
    InvalidMint,
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Error category, used by `relay-http` to pick an HTTP status and by
/// `audit-log`/`rate-anomaly` to decide whether an error should feed the
/// anomaly counters (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientFault,
    Capacity,
    TransientInternal,
    Security,
}

impl RelayError {
    /// Stable machine-readable code, exactly the strings spec §6 names.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::TokenNotAccepted => "TOKEN_NOT_ACCEPTED",
            RelayError::WalletRateLimited => "WALLET_RATE_LIMITED",
            RelayError::IpRateLimited => "IP_RATE_LIMITED",
            RelayError::NoPayerCapacity => "NO_PAYER_CAPACITY",
            RelayError::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            RelayError::QuoteFailed => "QUOTE_FAILED",
            RelayError::QuoteNotFound => "QUOTE_NOT_FOUND",
            RelayError::QuoteExpired => "QUOTE_EXPIRED",
            RelayError::TxTooLarge => "TX_TOO_LARGE",
            RelayError::InvalidTxFormat => "INVALID_TX_FORMAT",
            RelayError::ReplayDetected => "REPLAY_DETECTED",
            RelayError::BlockhashExpired => "BLOCKHASH_EXPIRED",
            RelayError::ValidationFailed(_) => "VALIDATION_FAILED",
            RelayError::FeePayerMismatch => "FEE_PAYER_MISMATCH",
            RelayError::SimulationFailed(_) => "SIMULATION_FAILED",
            RelayError::SubmitFailed => "SUBMIT_FAILED",
            RelayError::InvalidMint => "INVALID_MINT",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::NoPayerCapacity | RelayError::CircuitBreakerOpen => ErrorCategory::Capacity,
            RelayError::QuoteFailed | RelayError::SubmitFailed => ErrorCategory::TransientInternal,
            RelayError::ReplayDetected
            | RelayError::FeePayerMismatch
            | RelayError::SimulationFailed(_)
            | RelayError::BlockhashExpired => ErrorCategory::Security,
            _ => ErrorCategory::ClientFault,
        }
    }

    /// `Retry-After` hint in seconds, only set for non-terminal errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            RelayError::WalletRateLimited | RelayError::IpRateLimited => Some(60),
            RelayError::NoPayerCapacity | RelayError::CircuitBreakerOpen => Some(30),
            _ => None,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::TokenNotAccepted
            | RelayError::TxTooLarge
            | RelayError::InvalidTxFormat
            | RelayError::ReplayDetected
            | RelayError::BlockhashExpired
            | RelayError::ValidationFailed(_)
            | RelayError::FeePayerMismatch
            | RelayError::SimulationFailed(_)
            | RelayError::QuoteNotFound
            | RelayError::QuoteExpired
            | RelayError::InvalidMint => 400,
            RelayError::WalletRateLimited | RelayError::IpRateLimited => 429,
            RelayError::NoPayerCapacity | RelayError::CircuitBreakerOpen => 503,
            RelayError::QuoteFailed | RelayError::SubmitFailed => 500,
        }
    }

    /// Security-relevant errors are fed into the anomaly counters under the
    /// subject wallet (spec §7).
    pub fn is_security_event(&self) -> bool {
        self.category() == ErrorCategory::Security
    }
}
