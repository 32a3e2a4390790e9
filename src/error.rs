use crate::classify::Fault;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TradierError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Structured fault returned by the API. Never retried.
    #[error("api fault {}: {}", .0.http_status_code, .0.message())]
    Api(Fault),
    /// Unstructured error body, treated as a rate-limit rejection.
    #[error("quota violation (http {status}): {body}")]
    QuotaViolation { status: u16, body: String },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// An account-scoped call was made before selecting an account.
    #[error("no account selected")]
    NoAccountSelected,
    /// Order fields are inconsistent; no request was sent.
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    /// The API accepted the request but reported a non-ok order status.
    #[error("order {id} returned status '{status}'")]
    OrderRejected { id: i64, status: String },
    /// Text did not match any supported timestamp encoding.
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    /// Missing or malformed client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TradierError {
    /// Returns the machine-readable fault code for structured API faults.
    pub fn fault_code(&self) -> Option<&str> {
        match self {
            Self::Api(fault) => fault.error_code(),
            _ => None,
        }
    }
}
