use crate::domain::gateway::Provider;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("currency {0} is not supported")]
    UnsupportedCurrency(String),

    #[error("payment gateway {0} is not available")]
    GatewayDisabled(String),

    #[error("invalid pricing: {0}")]
    InvalidPricing(String),

    #[error("card pan, cvv and expiry are required for this payment method")]
    MissingCardDetails,

    #[error("{provider} error: {message}")]
    Gateway { provider: Provider, message: String },

    #[error("{provider} did not respond in time")]
    GatewayTimeout { provider: Provider },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CheckoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_pricing(message: impl Into<String>) -> Self {
        Self::InvalidPricing(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::GatewayDisabled(_) => "GATEWAY_DISABLED",
            Self::InvalidPricing(_) => "INVALID_PRICING",
            Self::MissingCardDetails => "MISSING_CARD_DETAILS",
            Self::Gateway { .. } => "GATEWAY_ERROR",
            Self::GatewayTimeout { .. } => "GATEWAY_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::UnsupportedCurrency(_)
            | Self::GatewayDisabled(_)
            | Self::InvalidPricing(_)
            | Self::MissingCardDetails => StatusCode::BAD_REQUEST,
            Self::Gateway { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let message = match self {
            // storage and wiring failures stay in the logs
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message,
                details: None,
            },
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => tracing::error!(error = %e, "checkout request failed"),
            Self::Gateway { provider, message } => {
                tracing::warn!(%provider, %message, "payment provider call failed")
            }
            Self::GatewayTimeout { provider } => tracing::warn!(%provider, "payment provider timed out"),
            _ => {}
        }
        (self.status(), Json(self.envelope())).into_response()
    }
}
