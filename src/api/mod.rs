//! HTTP routes of the checkout backend

pub mod health;
pub mod payment;
pub mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::CheckoutConfig;
use crate::database::PaymentStore;
use crate::payments::methods::{default_catalogue, PaymentMethod};
use crate::payments::PaymentGateway;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn PaymentStore>,
    pub catalogue: Arc<Vec<PaymentMethod>>,
    pub checkout: Arc<CheckoutConfig>,
    pub environment: String,
    pub sandbox: bool,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn PaymentStore>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            catalogue: Arc::new(default_catalogue()),
            checkout: Arc::new(checkout),
            environment: "development".to_string(),
            sandbox: false,
        }
    }

    pub fn with_catalogue(mut self, catalogue: Vec<PaymentMethod>) -> Self {
        self.catalogue = Arc::new(catalogue);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>, sandbox: bool) -> Self {
        self.environment = environment.into();
        self.sandbox = sandbox;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payment/pay", post(payment::pay))
        .route("/payment/inquiryPayment", post(payment::inquiry_payment))
        .route("/payment/cancel", post(payment::cancel))
        .route("/payment/methods", get(payment::methods))
        .route(
            "/payment/receivePaymentNotify",
            post(webhook::receive_payment_notify),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
