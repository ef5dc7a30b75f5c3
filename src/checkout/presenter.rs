//! Result presentation for the checkout page
//!
//! Maps a terminal payment status to what the buyer sees, shows it on a
//! [`ResultView`] and resets the view after a fixed delay.

use std::time::Duration;

use crate::payments::types::PaymentStatus;

/// Delay before a shown result is cleared and the view returns home
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(8000);

pub const SUCCESS_ICON: &str =
    "https://mdn.alipayobjects.com/portal_pdqp4x/afts/file/A*ZLggSbkLKoMAAAAAAAAAAAAAAQAAAQ";
pub const ERROR_ICON: &str =
    "https://mdn.alipayobjects.com/portal_pdqp4x/afts/file/A*QzBHQ40jKZAAAAAAAAAAAAAAAQAAAQ";
pub const WARNING_ICON: &str =
    "https://mdn.alipayobjects.com/portal_pdqp4x/afts/file/A*7ShHRKjYcjoAAAAAAAAAAAAAAQAAAQ";

const ERROR_BACKGROUND: &str = "rgba(255, 91, 77, 0.10)";
const ERROR_BORDER: &str = "rgba(255, 91, 77, 0.20)";
const WARNING_BACKGROUND: &str = "rgba(255, 159, 26, 0.10)";
const WARNING_BORDER: &str = "rgba(255, 159, 26, 0.20)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub title: &'static str,
    pub message: &'static str,
    pub icon: &'static str,
    pub background: &'static str,
    pub border: &'static str,
}

impl Presentation {
    pub fn for_status(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Success => Self {
                title: "Payment Successful",
                message: "Thank you for your payment! We will ship out your order as soon as possible.",
                icon: SUCCESS_ICON,
                background: "#e5f7f1",
                border: "#b7e9d9",
            },
            PaymentStatus::Fail => Self {
                title: "Payment Failed",
                message: "Please return to the merchant order page and resubmit your payment.",
                icon: ERROR_ICON,
                background: ERROR_BACKGROUND,
                border: ERROR_BORDER,
            },
            PaymentStatus::Error => Self {
                title: "Error",
                message: "An error occurred while checking the payment status. Please try again or contact support.",
                icon: ERROR_ICON,
                background: ERROR_BACKGROUND,
                border: ERROR_BORDER,
            },
            PaymentStatus::Cancelled => Self {
                title: "Payment Cancelled",
                message: "The payment was cancelled. Please return to the merchant order page to start a new payment.",
                icon: WARNING_ICON,
                background: WARNING_BACKGROUND,
                border: WARNING_BORDER,
            },
            PaymentStatus::Processing | PaymentStatus::Unknown => Self {
                title: "Payment Processing",
                message: "Your payment is still being processed. Please check your order status later.",
                icon: WARNING_ICON,
                background: WARNING_BACKGROUND,
                border: WARNING_BORDER,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Warning,
    Error,
    Success,
}

impl AlertKind {
    pub fn icon(&self) -> &'static str {
        match self {
            AlertKind::Warning => WARNING_ICON,
            AlertKind::Error => ERROR_ICON,
            AlertKind::Success => SUCCESS_ICON,
        }
    }
}

/// Blocking dialog shown when a payment cannot be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Surface the checkout flow renders onto
pub trait ResultView: Send {
    fn show(&mut self, presentation: &Presentation);

    fn clear(&mut self);

    /// Back to the landing view of the checkout page
    fn navigate_home(&mut self);

    /// Leave for the gateway payment page
    fn redirect(&mut self, url: &str);

    fn alert(&mut self, alert: &Alert);

    /// Submit button state while a payment is being created
    fn set_busy(&mut self, _busy: bool) {}
}

#[derive(Debug, Clone)]
pub struct ResultPresenter {
    dismiss_after: Duration,
}

impl Default for ResultPresenter {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl ResultPresenter {
    pub fn new(dismiss_after: Duration) -> Self {
        Self { dismiss_after }
    }

    pub fn dismiss_after(&self) -> Duration {
        self.dismiss_after
    }

    /// Show the result for `status`, then clear the view and go home.
    pub async fn present<V: ResultView + ?Sized>(
        &self,
        view: &mut V,
        status: PaymentStatus,
    ) -> Presentation {
        let presentation = Presentation::for_status(status);
        view.show(&presentation);

        tokio::time::sleep(self.dismiss_after).await;

        view.clear();
        view.navigate_home();
        presentation
    }
}
