//! Payment gateway trait definitions
//!
//! Defines the interface the checkout backend needs from a payment gateway.

use crate::payments::providers::GatewayError;
use crate::payments::signature::{SignatureResult, SignedRequest};
use crate::payments::types::{CreatePayment, CreatedPayment, PaymentInquiry};
use async_trait::async_trait;

/// Trait for payment gateway implementations
///
/// The checkout backend only talks to the gateway through this trait, so the
/// HTTP routes can be exercised against an in-process fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a cashier payment
    ///
    /// Returns the page the buyer must be redirected to.
    async fn create_payment(&self, request: CreatePayment) -> Result<CreatedPayment, GatewayError>;

    /// Ask the gateway for the current status of a payment
    async fn inquire_payment(
        &self,
        payment_request_id: &str,
    ) -> Result<PaymentInquiry, GatewayError>;

    /// Cancel a payment that has not completed yet
    async fn cancel_payment(&self, payment_request_id: &str) -> Result<(), GatewayError>;

    /// Verify the signature of an inbound notification
    ///
    /// # Returns
    /// * `Ok(true)` - signature matches the gateway public key
    /// * `Ok(false)` - well-formed but invalid signature
    /// * `Err(_)` - the signature could not be decoded
    fn verify_notification(
        &self,
        request: &SignedRequest<'_>,
        signature: &str,
    ) -> SignatureResult<bool>;

    /// Client id the merchant is registered under
    fn client_id(&self) -> &str;

    /// Short provider name used in logs
    fn name(&self) -> &'static str;
}
