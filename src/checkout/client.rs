//! HTTP client for the checkout backend routes

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::checkout::context::CheckoutContext;
use crate::payments::types::{ApiResponse, InquiryData, PayData, PaymentRequestRef, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("{reason}")]
    Rejected { reason: String },

    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },
}

impl CheckoutError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// The backend answered and said no
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

/// Operations the checkout page needs from the backend
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    /// Create a payment and return the gateway page (`normalUrl`)
    async fn create_payment(&self, context: &CheckoutContext) -> Result<String, CheckoutError>;

    /// Current status of a payment request
    async fn inquire_payment(&self, payment_request_id: &str)
        -> Result<PaymentStatus, CheckoutError>;
}

#[derive(Debug, Clone)]
pub struct CheckoutClient {
    base_url: String,
    http: Client,
}

impl CheckoutClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CheckoutError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CheckoutError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, route: &str, body: &B) -> Result<ApiResponse<T>, CheckoutError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(http_error(status)),
            Err(e) => Err(CheckoutError::invalid_response(e.to_string())),
        }
    }
}

fn http_error(status: StatusCode) -> CheckoutError {
    CheckoutError::rejected(format!("HTTP error! Status: {}", status.as_u16()))
}

fn rejection<T>(response: &ApiResponse<T>) -> CheckoutError {
    CheckoutError::rejected(
        response
            .message
            .clone()
            .unwrap_or_else(|| "Invalid response format".to_string()),
    )
}

#[async_trait]
impl CheckoutApi for CheckoutClient {
    async fn create_payment(&self, context: &CheckoutContext) -> Result<String, CheckoutError> {
        let request = context
            .pay_request()
            .ok_or_else(|| CheckoutError::rejected("Please select a payment method!"))?;

        let response: ApiResponse<PayData> = self.post("/payment/pay", &request).await?;
        if !response.is_success() {
            return Err(rejection(&response));
        }

        response
            .data
            .map(|data| data.normal_url)
            .ok_or_else(|| CheckoutError::invalid_response("missing data.normalUrl"))
    }

    async fn inquire_payment(
        &self,
        payment_request_id: &str,
    ) -> Result<PaymentStatus, CheckoutError> {
        let request = PaymentRequestRef {
            payment_request_id: payment_request_id.to_string(),
        };

        let response: ApiResponse<InquiryData> =
            self.post("/payment/inquiryPayment", &request).await?;
        if !response.is_success() {
            return Err(rejection(&response));
        }

        response
            .data
            .map(|data| data.payment_status)
            .ok_or_else(|| CheckoutError::invalid_response("missing data.paymentStatus"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = CheckoutClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_rejection_uses_backend_message() {
        let response = ApiResponse::<PayData>::error("req-1", "Antom error: ACCESS_DENIED");
        assert_eq!(
            rejection(&response),
            CheckoutError::rejected("Antom error: ACCESS_DENIED")
        );
        assert!(rejection(&response).is_rejection());
    }

    #[test]
    fn test_http_error_reason() {
        assert_eq!(
            http_error(StatusCode::BAD_GATEWAY).to_string(),
            "HTTP error! Status: 502"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            CheckoutClient::with_timeout(format!("http://{}", addr), Duration::from_secs(2))
                .unwrap();
        let err = client.inquire_payment("req-1").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Transport { .. }));
    }
}
