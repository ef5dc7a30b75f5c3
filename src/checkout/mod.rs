//! Client side of the checkout flow
//!
//! [`Checkout::submit`] creates the payment and redirects the buyer to the
//! gateway. When the gateway sends the buyer back, [`Checkout::resume`] reads
//! `paymentRequestId` from the return URL, polls the backend and presents the
//! outcome.

pub mod client;
pub mod context;
pub mod initiator;
pub mod poller;
pub mod presenter;

pub use client::{CheckoutApi, CheckoutClient, CheckoutError};
pub use context::{CheckoutAmount, CheckoutContext};
pub use initiator::{InitiationOutcome, PaymentInitiator};
pub use poller::{payment_request_id_from_url, PollConfig, PollOutcome, StatusPoller};
pub use presenter::{Alert, AlertKind, Presentation, ResultPresenter, ResultView};

use tracing::debug;

pub struct Checkout<A> {
    api: A,
    initiator: PaymentInitiator,
    poller: StatusPoller,
    presenter: ResultPresenter,
}

impl<A: CheckoutApi> Checkout<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            initiator: PaymentInitiator::new(),
            poller: StatusPoller::default(),
            presenter: ResultPresenter::default(),
        }
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poller = StatusPoller::new(config);
        self
    }

    pub fn with_presenter(mut self, presenter: ResultPresenter) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Start a payment for `context`.
    ///
    /// A transport failure is presented as `ERROR`; a rejection only alerts.
    pub async fn submit<V: ResultView + ?Sized>(
        &self,
        context: &CheckoutContext,
        view: &mut V,
    ) -> InitiationOutcome {
        let outcome = self.initiator.initiate(&self.api, context, view).await;
        if let InitiationOutcome::Failed { status, .. } = &outcome {
            self.presenter.present(view, *status).await;
        }
        outcome
    }

    /// Resume after the gateway redirect. No polling without a request id.
    pub async fn resume<V: ResultView + ?Sized>(
        &self,
        return_url: &str,
        view: &mut V,
    ) -> Option<PollOutcome> {
        let Some(payment_request_id) = payment_request_id_from_url(return_url) else {
            debug!("No paymentRequestId in {}, nothing to poll", return_url);
            return None;
        };

        Some(self.follow(&payment_request_id, view).await)
    }

    /// Poll a known payment request and present its terminal status.
    pub async fn follow<V: ResultView + ?Sized>(
        &self,
        payment_request_id: &str,
        view: &mut V,
    ) -> PollOutcome {
        let outcome = self.poller.poll(&self.api, payment_request_id).await;
        self.presenter.present(view, outcome.status).await;
        outcome
    }
}
