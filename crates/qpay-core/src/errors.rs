use crate::types::Amount;

/// Configuration failures, surfaced once when a gateway configuration is
/// constructed. A configuration that fails here never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration field: {0}")]
    MissingField(&'static str),

    #[error("Configuration field is empty: {0}")]
    EmptyField(&'static str),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid boolean for configuration field {field}: {value}")]
    InvalidFlag { field: &'static str, value: String },
}

/// Everything that can go wrong while talking to the gateway.
///
/// `Unavailable`, `Configuration` and `InvalidReply` are returned as `Err`
/// from gateway operations. The remaining variants describe outcomes the
/// remote side reported in-band; they travel inside a failed
/// [`PaymentResult`](crate::types::PaymentResult) with the gateway's message
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Transport-level failure: connect error, timeout, non-2xx status.
    /// Safe to retry from the caller's side.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway explicitly declined the operation.
    #[error("Rejected by gateway: {0}")]
    Rejected(String),

    #[error("No prior authorization for transaction: {0}")]
    NotAuthorized(String),

    #[error("Transaction already captured: {0}")]
    AlreadyCaptured(String),

    #[error("Transaction already refunded: {0}")]
    AlreadyRefunded(String),

    #[error("Refund amount {requested} exceeds captured amount {captured}")]
    RefundExceedsCapture { requested: Amount, captured: Amount },

    /// The gateway answered with a payload this crate cannot decode.
    #[error("Malformed gateway reply: {0}")]
    InvalidReply(String),
}

impl GatewayError {
    /// Whether the error came back in the gateway's reply rather than from
    /// the transport or local configuration.
    pub fn is_gateway_reported(&self) -> bool {
        !matches!(
            self,
            GatewayError::Configuration(_)
                | GatewayError::Unavailable(_)
                | GatewayError::InvalidReply(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
