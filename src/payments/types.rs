//! Payment types and wire structures
//!
//! Shared by the checkout backend, the gateway provider and the checkout client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a payment request.
///
/// `Error` is a client-side catch-all for failed inquiries and is never
/// persisted. Anything the gateway sends that we do not know lands in
/// `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Processing,
    Success,
    Fail,
    Cancelled,
    Error,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Fail => "FAIL",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Error => "ERROR",
            PaymentStatus::Unknown => "UNKNOWN",
        }
    }

    /// Statuses after which the gateway will not move the payment again.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Success | PaymentStatus::Fail | PaymentStatus::Cancelled
        )
    }

    /// Whether the status may be written to the payment store.
    pub fn is_storable(&self) -> bool {
        !matches!(self, PaymentStatus::Error | PaymentStatus::Unknown)
    }

    /// Map a gateway `resultStatus` flag (`S`, `F`, `U`) to a payment status.
    pub fn from_result_status(flag: &str) -> Self {
        match flag {
            "S" => PaymentStatus::Success,
            "F" => PaymentStatus::Fail,
            "U" => PaymentStatus::Processing,
            _ => PaymentStatus::Unknown,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PROCESSING" => PaymentStatus::Processing,
            "SUCCESS" => PaymentStatus::Success,
            "FAIL" => PaymentStatus::Fail,
            "CANCELLED" => PaymentStatus::Cancelled,
            "ERROR" => PaymentStatus::Error,
            _ => PaymentStatus::Unknown,
        })
    }
}

/// A payment request as tracked by the checkout backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_request_id: String,
    /// Amount in the currency's minor unit
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method_type: Option<String>,
    pub status: PaymentStatus,
    /// Last result code reported by the gateway
    pub result_code: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status change reported by the gateway, keyed by payment request id
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub payment_request_id: String,
    pub status: PaymentStatus,
    pub result_code: Option<String>,
    /// Used only when the payment request is not known yet
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
}

impl StatusUpdate {
    pub fn new(payment_request_id: impl Into<String>, status: PaymentStatus) -> Self {
        Self {
            payment_request_id: payment_request_id.into(),
            status,
            result_code: None,
            amount_minor: None,
            currency: None,
        }
    }

    pub fn with_result_code(mut self, code: impl Into<String>) -> Self {
        self.result_code = Some(code.into());
        self
    }
}

/// Payment creation handed to a gateway
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub payment_request_id: String,
    pub reference_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method_type: String,
    pub terminal_type: String,
    pub os_type: Option<String>,
    pub order_description: String,
    pub buyer_id: String,
    pub notify_url: String,
    pub redirect_url: String,
}

/// Gateway answer to a payment creation
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPayment {
    pub payment_request_id: String,
    /// Page the buyer is sent to
    pub normal_url: String,
    pub result_code: String,
}

/// Gateway answer to a status inquiry
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInquiry {
    pub status: PaymentStatus,
    pub result_code: Option<String>,
}

// ---------------------------------------------------------------------------
// Checkout backend wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Envelope returned by every `/payment/*` route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: ApiStatus,
    #[serde(default)]
    pub payment_request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(payment_request_id: impl Into<String>, data: T) -> Self {
        Self {
            status: ApiStatus::Success,
            payment_request_id: payment_request_id.into(),
            message: None,
            data: Some(data),
        }
    }

    pub fn error(payment_request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            payment_request_id: payment_request_id.into(),
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }
}

fn default_terminal_type() -> String {
    "WEB".to_string()
}

/// `POST /payment/pay`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    /// Amount in major units, e.g. "6000" JPY or "19.99" USD
    pub amount_value: String,
    pub currency: String,
    pub payment_method_type: String,
    #[serde(default = "default_terminal_type")]
    pub terminal_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayData {
    pub normal_url: String,
}

/// `POST /payment/inquiryPayment` and `POST /payment/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestRef {
    #[serde(default)]
    pub payment_request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryData {
    pub payment_status: PaymentStatus,
}
