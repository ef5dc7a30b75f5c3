//! Antom payment gateway implementation
//!
//! Cashier payments through Antom's Advanced Management Service API. Every
//! request is signed with the merchant private key; inbound notifications are
//! verified against the Antom public key.

use crate::payments::providers::GatewayError;
use crate::payments::signature::{
    RequestSigner, SignatureResult, SignatureVerifier, SignedRequest,
};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{CreatePayment, CreatedPayment, PaymentInquiry, PaymentStatus};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const PROVIDER: &str = "Antom";

/// Antom gateway configuration
#[derive(Debug, Clone)]
pub struct AntomConfig {
    /// Gateway host (defaults to https://open-sea-global.alipay.com)
    pub base_url: String,
    /// API path prefix, `/ams/api/v1` or `/ams/sandbox/api/v1`
    pub api_path_prefix: String,
    pub client_id: String,
    /// Merchant private key used to sign requests
    pub merchant_private_key: String,
    /// Antom public key used to verify notifications
    pub gateway_public_key: String,
    pub key_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of retries for failed requests
    pub max_retries: u32,
    /// First retry delay, doubled on every further attempt
    pub retry_backoff: Duration,
}

impl Default for AntomConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open-sea-global.alipay.com".to_string(),
            api_path_prefix: "/ams/api/v1".to_string(),
            client_id: String::new(),
            merchant_private_key: String::new(),
            gateway_public_key: String::new(),
            key_version: "1".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Upper bound for a single retry delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped at
/// [`MAX_RETRY_DELAY`]
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    2_u32
        .checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

/// Antom payment gateway
pub struct AntomProvider {
    config: AntomConfig,
    client: Client,
    signer: RequestSigner,
    verifier: SignatureVerifier,
}

impl AntomProvider {
    /// Create a new Antom provider, parsing both keys up front
    pub fn new(config: AntomConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let signer = RequestSigner::from_private_key(
            &config.merchant_private_key,
            config.client_id.clone(),
            config.key_version.clone(),
        )?;
        let verifier = SignatureVerifier::from_public_key(&config.gateway_public_key)?;

        info!(
            "Antom provider initialized: base_url={}, api_path_prefix={}",
            config.base_url, config.api_path_prefix
        );

        Ok(Self {
            config,
            client,
            signer,
            verifier,
        })
    }

    fn endpoint_path(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_path_prefix, endpoint)
    }

    async fn backoff(&self, attempt: u32) {
        tokio::time::sleep(retry_delay(self.config.retry_backoff, attempt)).await;
    }

    /// Make a signed request to the Antom API
    async fn make_request<T>(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<AntomEnvelope<T>, GatewayError>
    where
        T: DeserializeOwned,
    {
        let path = self.endpoint_path(endpoint);
        let url = format!("{}{}", self.config.base_url, path);
        let body = serde_json::to_string(payload)?;

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            // Each attempt is re-signed with a fresh request time
            let request_time = Utc::now().timestamp_millis().to_string();
            let signature = self
                .signer
                .signature_header("POST", &path, &request_time, &body);

            let sent = self
                .client
                .post(&url)
                .header("Content-Type", "application/json; charset=UTF-8")
                .header("Client-Id", &self.config.client_id)
                .header("Request-Time", &request_time)
                .header("Signature", signature)
                .body(body.clone())
                .send()
                .await;

            let err = match sent {
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok());
                    let response_text = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        debug!("Antom response for {}: {}", path, response_text);
                        return parse_envelope(&response_text);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        GatewayError::RateLimited { retry_after }
                    } else {
                        GatewayError::HttpStatus {
                            status: status.as_u16(),
                            body: response_text,
                        }
                    }
                }
                Err(e) => GatewayError::from(e),
            };

            if !err.is_retryable() || attempt >= self.config.max_retries {
                error!("Antom request to {} failed: {}", path, err);
                return Err(err);
            }

            warn!(
                "Antom request to {} failed, retrying (attempt {}): {}",
                path,
                attempt + 1,
                err
            );
            self.backoff(attempt).await;
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| GatewayError::transport("Request failed")))
    }
}

#[async_trait]
impl PaymentGateway for AntomProvider {
    async fn create_payment(&self, request: CreatePayment) -> Result<CreatedPayment, GatewayError> {
        info!(
            "Creating Antom payment: {} {} {} via {}",
            request.payment_request_id,
            request.amount_minor,
            request.currency,
            request.payment_method_type
        );

        let amount = serde_json::json!({
            "currency": request.currency,
            "value": request.amount_minor.to_string(),
        });

        let mut env = serde_json::json!({
            "terminalType": request.terminal_type,
            "clientIp": "1.2.3.4",
        });
        if request.terminal_type != "WEB" {
            if let Some(os_type) = &request.os_type {
                env["osType"] = serde_json::Value::String(os_type.clone());
            }
        }

        let mut payload = serde_json::json!({
            "productCode": "CASHIER_PAYMENT",
            "paymentRequestId": request.payment_request_id,
            "paymentAmount": amount,
            "paymentMethod": {
                "paymentMethodType": request.payment_method_type,
            },
            "order": {
                "referenceOrderId": request.reference_order_id,
                "orderDescription": request.order_description,
                "orderAmount": amount,
                "buyer": {
                    "referenceBuyerId": request.buyer_id,
                },
            },
            "env": env,
            "paymentNotifyUrl": request.notify_url,
            "paymentRedirectUrl": request.redirect_url,
        });

        // Card payments are authorised first and captured later
        if request.payment_method_type == "CARD" {
            payload["paymentFactor"] = serde_json::json!({ "isAuthorization": true });
        }

        let response: AntomEnvelope<AntomPayData> =
            self.make_request("/payments/pay", &payload).await?;

        let normal_url = response
            .data
            .normal_url
            .or_else(|| response.data.redirect_action_form.map(|form| form.redirect_url))
            .ok_or_else(|| GatewayError::invalid_response("pay response carries no redirect URL"))?;

        info!(
            "Antom payment created: payment_request_id={}, result_code={}",
            request.payment_request_id, response.result.result_code
        );

        Ok(CreatedPayment {
            payment_request_id: request.payment_request_id,
            normal_url,
            result_code: response.result.result_code,
        })
    }

    async fn inquire_payment(
        &self,
        payment_request_id: &str,
    ) -> Result<PaymentInquiry, GatewayError> {
        info!("Inquiring Antom payment: payment_request_id={}", payment_request_id);

        let payload = serde_json::json!({ "paymentRequestId": payment_request_id });
        let response: AntomEnvelope<AntomInquiryData> =
            self.make_request("/payments/inquiryPayment", &payload).await?;

        let status = response
            .data
            .payment_status
            .as_deref()
            .map(|s| s.parse::<PaymentStatus>().unwrap_or(PaymentStatus::Unknown))
            .unwrap_or(PaymentStatus::Processing);

        info!(
            "Antom payment status: payment_request_id={}, status={}",
            payment_request_id, status
        );

        Ok(PaymentInquiry {
            status,
            result_code: response.data.payment_result_code,
        })
    }

    async fn cancel_payment(&self, payment_request_id: &str) -> Result<(), GatewayError> {
        info!("Cancelling Antom payment: payment_request_id={}", payment_request_id);

        let payload = serde_json::json!({ "paymentRequestId": payment_request_id });
        let _: AntomEnvelope<serde_json::Value> =
            self.make_request("/payments/cancel", &payload).await?;

        Ok(())
    }

    fn verify_notification(
        &self,
        request: &SignedRequest<'_>,
        signature: &str,
    ) -> SignatureResult<bool> {
        self.verifier.verify(request, signature)
    }

    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

/// Parse a response body and turn a failed `result` into an error.
fn parse_envelope<T: DeserializeOwned>(text: &str) -> Result<AntomEnvelope<T>, GatewayError> {
    let envelope: AntomEnvelope<T> = serde_json::from_str(text).map_err(|e| {
        error!("Failed to parse Antom response: {}", e);
        GatewayError::invalid_response(format!("Invalid response format: {}", e))
    })?;

    if envelope.result.result_status == "F" {
        error!(
            "Antom API error: {} {}",
            envelope.result.result_code, envelope.result.result_message
        );
        return Err(GatewayError::rejected(
            envelope.result.result_code,
            envelope.result.result_message,
        ));
    }

    Ok(envelope)
}

// Common response wrapper
#[derive(Debug, Deserialize)]
struct AntomEnvelope<T> {
    result: AntomResult,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AntomResult {
    result_code: String,
    result_status: String,
    #[serde(default)]
    result_message: String,
}

// Pay response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AntomPayData {
    #[serde(default)]
    normal_url: Option<String>,
    #[serde(default)]
    redirect_action_form: Option<AntomRedirectActionForm>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AntomRedirectActionForm {
    redirect_url: String,
}

// Inquiry response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AntomInquiryData {
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_result_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT_PRIVATE: &str = include_str!("../../../tests/fixtures/merchant_private.pem");
    const OTHER_PUBLIC: &str = include_str!("../../../tests/fixtures/other_public.pem");

    fn test_config() -> AntomConfig {
        AntomConfig {
            client_id: "SANDBOX_5YEX0L302DFU04384".to_string(),
            merchant_private_key: MERCHANT_PRIVATE.to_string(),
            gateway_public_key: OTHER_PUBLIC.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_delay_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(base, 0), Duration::from_millis(100));
        assert_eq!(retry_delay(base, 1), Duration::from_millis(200));
        assert_eq!(retry_delay(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        assert_eq!(retry_delay(Duration::from_secs(1), 10), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::from_nanos(1), 32), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::from_nanos(1), u32::MAX), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::MAX, 1), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_antom_config_default() {
        let config = AntomConfig::default();
        assert_eq!(config.base_url, "https://open-sea-global.alipay.com");
        assert_eq!(config.api_path_prefix, "/ams/api/v1");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_provider_rejects_placeholder_keys() {
        let config = AntomConfig {
            merchant_private_key: "your_private_key".to_string(),
            ..test_config()
        };
        assert!(matches!(
            AntomProvider::new(config),
            Err(GatewayError::Signature(_))
        ));
    }

    #[test]
    fn test_endpoint_path() {
        let provider = AntomProvider::new(AntomConfig {
            api_path_prefix: "/ams/sandbox/api/v1".to_string(),
            ..test_config()
        })
        .unwrap();
        assert_eq!(
            provider.endpoint_path("/payments/pay"),
            "/ams/sandbox/api/v1/payments/pay"
        );
        assert_eq!(provider.client_id(), "SANDBOX_5YEX0L302DFU04384");
    }

    #[test]
    fn test_parse_pay_response() {
        let text = r#"{
            "result": {"resultCode": "PAYMENT_IN_PROCESS", "resultStatus": "U", "resultMessage": "payment in process"},
            "paymentRequestId": "req-1",
            "normalUrl": "https://open-sea.alipay.com/checkout?id=1"
        }"#;
        let envelope: AntomEnvelope<AntomPayData> = parse_envelope(text).unwrap();
        assert_eq!(envelope.result.result_code, "PAYMENT_IN_PROCESS");
        assert_eq!(
            envelope.data.normal_url.as_deref(),
            Some("https://open-sea.alipay.com/checkout?id=1")
        );
    }

    #[test]
    fn test_parse_redirect_action_form() {
        let text = r#"{
            "result": {"resultCode": "PAYMENT_IN_PROCESS", "resultStatus": "U"},
            "redirectActionForm": {"method": "GET", "redirectUrl": "https://pay.example/form"}
        }"#;
        let envelope: AntomEnvelope<AntomPayData> = parse_envelope(text).unwrap();
        assert!(envelope.data.normal_url.is_none());
        assert_eq!(
            envelope.data.redirect_action_form.unwrap().redirect_url,
            "https://pay.example/form"
        );
    }

    #[test]
    fn test_parse_failed_result() {
        let text = r#"{"result": {"resultCode": "ORDER_NOT_EXIST", "resultStatus": "F", "resultMessage": "order not exist"}}"#;
        let err = parse_envelope::<AntomInquiryData>(text).unwrap_err();
        match err {
            GatewayError::Rejected { code, message } => {
                assert_eq!(code, "ORDER_NOT_EXIST");
                assert_eq!(message, "order not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_envelope::<AntomInquiryData>("<html>"),
            Err(GatewayError::InvalidResponse { .. })
        ));
    }
}
