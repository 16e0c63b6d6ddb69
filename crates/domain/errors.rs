use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("cart has no active line items")]
    EmptyCart,
    #[error("cart changed during checkout; refresh the cart and retry")]
    ConcurrentCheckout,
    /// Optimistic guard failed: a conditional update touched an unexpected number of rows.
    #[error("concurrent modification of {0}")]
    Conflict(&'static str),
    #[error("amount mismatch: expected {expected_minor}, reported {reported_minor}")]
    AmountMismatch {
        expected_minor: i64,
        reported_minor: i64,
    },
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidState {
        entity: &'static str,
        from: String,
        to: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CommerceError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            CommerceError::ConcurrentCheckout
            | CommerceError::Conflict(_)
            | CommerceError::AmountMismatch { .. }
            | CommerceError::InvalidState { .. } => StatusCode::CONFLICT,
            CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
            CommerceError::Forbidden => StatusCode::FORBIDDEN,
            CommerceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CommerceError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            CommerceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a client may simply re-issue the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::ConcurrentCheckout
                | CommerceError::Conflict(_)
                | CommerceError::GatewayUnavailable(_)
        )
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        CommerceError::InvalidState {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type CommerceResult<T> = std::result::Result<T, CommerceError>;
