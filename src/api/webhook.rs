//! Inbound payment notifications
//!
//! The gateway posts `PAYMENT_RESULT` notifications to the merchant notify
//! URL. Every notification is signed over the raw body; nothing is applied
//! to the payment store until that signature checks out against the gateway
//! public key.

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::database::ApplyOutcome;
use crate::payments::amount::to_major_units;
use crate::payments::signature::SignedRequest;
use crate::payments::types::{PaymentStatus, StatusUpdate};

pub const CLIENT_ID_HEADER: &str = "client-id";
pub const REQUEST_TIME_HEADER: &str = "request-time";
pub const SIGNATURE_HEADER: &str = "signature";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResult {
    pub result_code: String,
    pub result_status: String,
    #[serde(default)]
    pub result_message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyAmount {
    pub currency: String,
    /// Minor units, as a string
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    #[serde(default)]
    pub notify_type: Option<String>,
    pub result: NotifyResult,
    pub payment_request_id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_amount: Option<NotifyAmount>,
    #[serde(default)]
    pub payment_time: Option<String>,
}

impl PaymentNotification {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_result_status(&self.result.result_status)
    }

    pub fn status_update(&self) -> StatusUpdate {
        let mut update = StatusUpdate::new(self.payment_request_id.clone(), self.status())
            .with_result_code(self.result.result_code.clone());
        if let Some(amount) = &self.payment_amount {
            update.amount_minor = amount.value.parse().ok();
            update.currency = Some(amount.currency.clone());
        }
        update
    }
}

/// Body the gateway expects back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyAck {
    pub result: NotifyResult,
}

impl NotifyAck {
    pub fn success() -> Self {
        Self {
            result: NotifyResult {
                result_code: "SUCCESS".to_string(),
                result_status: "S".to_string(),
                result_message: "success.".to_string(),
            },
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: NotifyResult {
                result_code: "FAIL".to_string(),
                result_status: "F".to_string(),
                result_message: message.into(),
            },
        }
    }
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(NotifyAck::fail(message))).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// `POST /payment/receivePaymentNotify`
pub async fn receive_payment_notify(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let (Some(client_id), Some(request_time), Some(signature)) = (
        header(&headers, CLIENT_ID_HEADER),
        header(&headers, REQUEST_TIME_HEADER),
        header(&headers, SIGNATURE_HEADER),
    ) else {
        warn!("Rejected notification on {}: missing signature headers", uri.path());
        return reject(StatusCode::UNAUTHORIZED, "missing signature headers");
    };

    if client_id != state.gateway.client_id() {
        warn!("Rejected notification for unknown client id {}", client_id);
        return reject(StatusCode::UNAUTHORIZED, "unknown client id");
    }

    let request = SignedRequest {
        method: method.as_str(),
        path: uri.path(),
        client_id,
        request_time,
        body: &body,
    };

    match state.gateway.verify_notification(&request, signature) {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                "Rejected notification on {}: signature verification failed (request time {})",
                uri.path(),
                request_time
            );
            return reject(StatusCode::UNAUTHORIZED, "invalid signature");
        }
        Err(e) => {
            warn!("Rejected notification on {}: {}", uri.path(), e);
            return reject(StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let notification: PaymentNotification = match serde_json::from_str(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!("Signed notification has an unreadable body: {}", e);
            return reject(StatusCode::BAD_REQUEST, "malformed notification");
        }
    };

    if notification.payment_request_id.trim().is_empty() {
        return reject(StatusCode::BAD_REQUEST, "paymentRequestId is required");
    }

    let update = notification.status_update();
    if !update.status.is_storable() {
        // Acknowledged but not applied
        warn!(
            "Ignoring notification for {} with resultStatus {}",
            notification.payment_request_id, notification.result.result_status
        );
        return (StatusCode::OK, Json(NotifyAck::success())).into_response();
    }

    match state.store.apply_status(&update).await {
        Ok(outcome) => {
            match outcome {
                ApplyOutcome::Created => {
                    let amount = match (update.amount_minor, update.currency.as_deref()) {
                        (Some(minor), Some(currency)) => {
                            format!("{} {}", to_major_units(minor, currency), currency)
                        }
                        _ => "unknown amount".to_string(),
                    };
                    info!(
                        "Notification created payment {} as {} for {}",
                        update.payment_request_id, update.status, amount
                    )
                }
                ApplyOutcome::Updated { previous } => info!(
                    "Payment {} moved {} -> {}",
                    update.payment_request_id, previous, update.status
                ),
                ApplyOutcome::Unchanged { current } => info!(
                    "Payment {} already {}, notification {} ignored",
                    update.payment_request_id, current, update.status
                ),
            }
            (StatusCode::OK, Json(NotifyAck::success())).into_response()
        }
        Err(e) => {
            error!(
                "Failed to apply notification for {}: {}",
                update.payment_request_id, e
            );
            reject(StatusCode::INTERNAL_SERVER_ERROR, "temporarily unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_maps_to_update() {
        let notification: PaymentNotification = serde_json::from_str(
            r#"{
                "notifyType": "PAYMENT_RESULT",
                "result": {"resultCode": "SUCCESS", "resultStatus": "S", "resultMessage": "success."},
                "paymentRequestId": "req-1",
                "paymentId": "2024011519400289010018A0000000001",
                "paymentAmount": {"currency": "JPY", "value": "6000"},
                "paymentTime": "2024-01-15T04:00:00-08:00"
            }"#,
        )
        .unwrap();

        let update = notification.status_update();
        assert_eq!(update.payment_request_id, "req-1");
        assert_eq!(update.status, PaymentStatus::Success);
        assert_eq!(update.result_code.as_deref(), Some("SUCCESS"));
        assert_eq!(update.amount_minor, Some(6000));
        assert_eq!(update.currency.as_deref(), Some("JPY"));
    }

    #[test]
    fn test_failed_notification() {
        let notification: PaymentNotification = serde_json::from_str(
            r#"{"result": {"resultCode": "USER_BALANCE_NOT_ENOUGH", "resultStatus": "F"}, "paymentRequestId": "req-2"}"#,
        )
        .unwrap();
        assert_eq!(notification.status(), PaymentStatus::Fail);
        assert!(notification.status_update().amount_minor.is_none());
    }

    #[test]
    fn test_ack_shapes() {
        let json = serde_json::to_value(NotifyAck::success()).unwrap();
        assert_eq!(json["result"]["resultCode"], "SUCCESS");
        assert_eq!(json["result"]["resultStatus"], "S");
        assert_eq!(json["result"]["resultMessage"], "success.");

        let json = serde_json::to_value(NotifyAck::fail("invalid signature")).unwrap();
        assert_eq!(json["result"]["resultStatus"], "F");
    }

    #[test]
    fn test_header_lookup_ignores_blank() {
        let mut headers = HeaderMap::new();
        headers.insert("client-id", " ".parse().unwrap());
        headers.insert("request-time", "1736893577018".parse().unwrap());
        assert_eq!(header(&headers, CLIENT_ID_HEADER), None);
        assert_eq!(header(&headers, REQUEST_TIME_HEADER), Some("1736893577018"));
        assert_eq!(header(&headers, SIGNATURE_HEADER), None);
    }
}
