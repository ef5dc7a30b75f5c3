//! Payment gateway implementations
//!
//! Concrete implementations of the PaymentGateway trait and their error type.

pub mod antom;

pub use antom::{AntomConfig, AntomProvider};

use crate::payments::signature::SignatureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway rejected the request: {code}: {message}")]
    Rejected { code: String, message: String },

    #[error("Gateway rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("Gateway returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Gateway transport error: {message}")]
    Transport { message: String },

    #[error("Gateway timed out")]
    Timeout,

    #[error("Invalid gateway response: {message}")]
    InvalidResponse { message: String },

    #[error("Gateway configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl GatewayError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::RateLimited { .. }
            | GatewayError::Transport { .. }
            | GatewayError::Timeout => true,
            GatewayError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::transport(format!("Request error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::invalid_response(format!("JSON error: {}", err))
    }
}
