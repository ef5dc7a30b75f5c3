#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use edusmart_payments::api::{self, AppState};
use edusmart_payments::config::CheckoutConfig;
use edusmart_payments::database::{InMemoryPaymentStore, PaymentStore};
use edusmart_payments::payments::providers::GatewayError;
use edusmart_payments::payments::signature::{
    RequestSigner, SignatureResult, SignatureVerifier, SignedRequest,
};
use edusmart_payments::payments::types::{
    CreatePayment, CreatedPayment, PaymentInquiry, PaymentStatus, StatusUpdate,
};
use edusmart_payments::payments::PaymentGateway;

pub const CLIENT_ID: &str = "5YEX0L302DFU04384";
pub const NOTIFY_PATH: &str = "/payment/receivePaymentNotify";

pub const MERCHANT_PRIVATE: &str = include_str!("../fixtures/merchant_private.pem");
pub const MERCHANT_PUBLIC: &str = include_str!("../fixtures/merchant_public.pem");
pub const OTHER_PRIVATE: &str = include_str!("../fixtures/other_private.pem");
pub const OTHER_PUBLIC: &str = include_str!("../fixtures/other_public.pem");

/// Gateway double; notifications must be signed with the merchant fixture key
pub struct FakeGateway {
    verifier: SignatureVerifier,
    statuses: Mutex<HashMap<String, PaymentStatus>>,
    created: Mutex<Vec<CreatePayment>>,
    cancelled: Mutex<Vec<String>>,
    reject_payments: AtomicBool,
    status_during_create: Mutex<Option<(Arc<dyn PaymentStore>, PaymentStatus)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            verifier: SignatureVerifier::from_public_key(MERCHANT_PUBLIC).unwrap(),
            statuses: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            reject_payments: AtomicBool::new(false),
            status_during_create: Mutex::new(None),
        }
    }

    pub fn set_status(&self, payment_request_id: &str, status: PaymentStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(payment_request_id.to_string(), status);
    }

    pub fn reject_payments(&self) {
        self.reject_payments.store(true, Ordering::SeqCst);
    }

    /// Record `status` in `store` while the next payment is being created,
    /// as an early notification would
    pub fn apply_status_during_create(
        &self,
        store: Arc<dyn PaymentStore>,
        status: PaymentStatus,
    ) {
        *self.status_during_create.lock().unwrap() = Some((store, status));
    }

    pub fn created(&self) -> Vec<CreatePayment> {
        self.created.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(&self, request: CreatePayment) -> Result<CreatedPayment, GatewayError> {
        if self.reject_payments.load(Ordering::SeqCst) {
            return Err(GatewayError::rejected("ACCESS_DENIED", "Access is denied."));
        }

        let early = self.status_during_create.lock().unwrap().take();
        if let Some((store, status)) = early {
            store
                .apply_status(&StatusUpdate::new(request.payment_request_id.clone(), status))
                .await
                .unwrap();
        }

        let created = CreatedPayment {
            payment_request_id: request.payment_request_id.clone(),
            normal_url: format!("https://gateway.test/cashier/{}", request.payment_request_id),
            result_code: "PAYMENT_IN_PROCESS".to_string(),
        };
        self.created.lock().unwrap().push(request);
        Ok(created)
    }

    async fn inquire_payment(
        &self,
        payment_request_id: &str,
    ) -> Result<PaymentInquiry, GatewayError> {
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(payment_request_id)
            .copied()
            .unwrap_or(PaymentStatus::Processing);

        Ok(PaymentInquiry {
            status,
            result_code: Some("SUCCESS".to_string()),
        })
    }

    async fn cancel_payment(&self, payment_request_id: &str) -> Result<(), GatewayError> {
        self.cancelled
            .lock()
            .unwrap()
            .push(payment_request_id.to_string());
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
        CLIENT_ID
    }

    fn name(&self) -> &'static str {
        "Fake"
    }
}

pub fn checkout_settings() -> CheckoutConfig {
    CheckoutConfig {
        notify_url: format!("http://localhost:8080{}", NOTIFY_PATH),
        redirect_url: "http://localhost:8080/index.html".to_string(),
        order_description: "EduSmart Course".to_string(),
        buyer_id: "buyer-1".to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<InMemoryPaymentStore>,
}

pub fn test_app() -> TestApp {
    let gateway = Arc::new(FakeGateway::new());
    let store = Arc::new(InMemoryPaymentStore::new());
    let state = AppState::new(gateway.clone(), store.clone(), checkout_settings());

    TestApp {
        router: api::router(state),
        gateway,
        store,
    }
}

/// Signs notifications the way the gateway does
pub fn notification_signer() -> RequestSigner {
    RequestSigner::from_private_key(MERCHANT_PRIVATE, CLIENT_ID, "1").unwrap()
}

pub fn foreign_signer() -> RequestSigner {
    RequestSigner::from_private_key(OTHER_PRIVATE, CLIENT_ID, "1").unwrap()
}

pub fn notification_body(payment_request_id: &str, result_status: &str) -> String {
    let result_code = match result_status {
        "S" => "SUCCESS",
        "F" => "FAIL",
        _ => "PAYMENT_IN_PROCESS",
    };

    serde_json::json!({
        "notifyType": "PAYMENT_RESULT",
        "result": {
            "resultCode": result_code,
            "resultStatus": result_status,
            "resultMessage": "success.",
        },
        "paymentRequestId": payment_request_id,
        "paymentId": "2024011519400289010018A0000000001",
        "paymentAmount": { "currency": "JPY", "value": "6000" },
        "paymentCreateTime": "2024-01-15T04:00:00-08:00",
        "paymentTime": "2024-01-15T04:01:00-08:00",
    })
    .to_string()
}
