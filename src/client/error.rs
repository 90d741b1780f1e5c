use thiserror::Error;

/// Failures surfaced by the payment client orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Failed to load Midtrans payment script: {0}")]
    ScriptLoadFailed(String),

    /// Backend refused the checkout; carries its `message`
    #[error("{0}")]
    TransactionRejected(String),

    #[error("Network error: {0}")]
    Http(String),

    #[error("A checkout is already in progress")]
    CheckoutInProgress,

    /// `reset` was called while this checkout was still running
    #[error("Checkout was reset before it completed")]
    CheckoutSuperseded,

    #[error("Payment failed. Please try again.")]
    PaymentFailed,
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e.to_string())
    }
}
