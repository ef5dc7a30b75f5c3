use tracing::{info, warn};

use crate::checkout::client::{CheckoutApi, CheckoutError};
use crate::checkout::context::CheckoutContext;
use crate::checkout::presenter::{Alert, ResultView};
use crate::payments::types::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationOutcome {
    /// Buyer was sent to the gateway page
    Redirected { normal_url: String },
    /// The payment was not started; an alert was shown
    Aborted(Alert),
    /// The backend could not be reached; `status` goes to the presenter
    Failed { status: PaymentStatus, reason: String },
}

/// Submits the checkout context and sends the buyer to the gateway
#[derive(Debug, Clone, Default)]
pub struct PaymentInitiator;

impl PaymentInitiator {
    pub fn new() -> Self {
        Self
    }

    pub async fn initiate<A, V>(
        &self,
        api: &A,
        context: &CheckoutContext,
        view: &mut V,
    ) -> InitiationOutcome
    where
        A: CheckoutApi + ?Sized,
        V: ResultView + ?Sized,
    {
        if !context.has_method() {
            let alert = Alert::warning("Warning", "Please select a payment method!");
            view.alert(&alert);
            return InitiationOutcome::Aborted(alert);
        }

        view.set_busy(true);
        let result = api.create_payment(context).await;
        view.set_busy(false);

        match result {
            Ok(normal_url) => {
                info!("Redirecting buyer to {}", normal_url);
                view.redirect(&normal_url);
                InitiationOutcome::Redirected { normal_url }
            }
            Err(CheckoutError::Rejected { reason }) => {
                warn!("Payment creation rejected: {}", reason);
                let alert = Alert::error("Error", reason);
                view.alert(&alert);
                InitiationOutcome::Aborted(alert)
            }
            Err(e) => {
                warn!("Payment creation failed: {}", e);
                InitiationOutcome::Failed {
                    status: PaymentStatus::Error,
                    reason: e.to_string(),
                }
            }
        }
    }
}
