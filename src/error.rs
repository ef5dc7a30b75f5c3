//! Application error type shared by the HTTP layer
//!
//! Library modules keep their own `thiserror` enums; handlers lift them into
//! [`AppError`] which knows how to render itself as an HTTP response.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::database::error::StoreError;
use crate::payments::amount::AmountError;
use crate::payments::providers::GatewayError;
use crate::payments::types::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: String },

    #[error("Unsupported payment method: {method}")]
    UnsupportedMethod { method: String },

    #[error(transparent)]
    Amount(#[from] AmountError),
}

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{provider} error: {message}")]
    PaymentProvider {
        provider: String,
        message: String,
    },

    #[error("{service} rate limit exceeded")]
    RateLimit {
        service: String,
        retry_after: Option<u64>,
    },
}

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum AppErrorKind {
    #[error(transparent)]
    Validation(ValidationError),

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error(transparent)]
    External(ExternalError),

    #[error(transparent)]
    Infrastructure(InfrastructureError),
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct AppError {
    pub kind: AppErrorKind,
    pub payment_request_id: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            payment_request_id: None,
        }
    }

    /// Attach the payment request the failure belongs to, echoed in the body.
    pub fn for_payment(mut self, payment_request_id: impl Into<String>) -> Self {
        self.payment_request_id = Some(payment_request_id.into());
        self
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.into(),
        }))
    }

    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::UnsupportedMethod {
            method: method.into(),
        }))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unauthorized {
            message: message.into(),
        })
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::NotFound {
            entity: entity.into(),
            id: id.into(),
        })
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.kind {
            AppErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            AppErrorKind::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppErrorKind::NotFound { .. } => StatusCode::NOT_FOUND,
            AppErrorKind::External(ExternalError::RateLimit { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppErrorKind::External(_) => StatusCode::BAD_GATEWAY,
            AppErrorKind::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::Amount(err)))
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let kind = match err {
            GatewayError::RateLimited { retry_after } => ExternalError::RateLimit {
                service: "Antom".to_string(),
                retry_after,
            },
            other => ExternalError::PaymentProvider {
                provider: "Antom".to_string(),
                message: other.to_string(),
            },
        };
        Self::new(AppErrorKind::External(kind))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Storage {
            message: err.to_string(),
        }))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let retry_after = match &self.kind {
            AppErrorKind::External(ExternalError::RateLimit { retry_after, .. }) => *retry_after,
            _ => None,
        };

        let body = ApiResponse::<()>::error(
            self.payment_request_id.unwrap_or_default(),
            self.kind.to_string(),
        );
        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
