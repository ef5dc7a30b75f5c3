use std::time::Duration;
use tracing::{debug, info, warn};

use crate::checkout::client::CheckoutApi;
use crate::payments::types::PaymentStatus;

pub const PAYMENT_REQUEST_ID_PARAM: &str = "paymentRequestId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Terminal status handed to the presenter
    pub status: PaymentStatus,
    pub attempts: u32,
    /// The attempt budget ran out before `SUCCESS`
    pub exhausted: bool,
}

/// Take `paymentRequestId` from a return URL's query string.
pub fn payment_request_id_from_url(return_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(return_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == PAYMENT_REQUEST_ID_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until `SUCCESS` or the attempt budget is spent.
    ///
    /// A failed inquiry counts as an `ERROR` attempt and polling carries on.
    /// There is no delay after the last attempt.
    pub async fn poll<A: CheckoutApi + ?Sized>(
        &self,
        api: &A,
        payment_request_id: &str,
    ) -> PollOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            let status = match api.inquire_payment(payment_request_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        "Inquiry for {} failed on attempt {}: {}",
                        payment_request_id,
                        attempts + 1,
                        e
                    );
                    PaymentStatus::Error
                }
            };
            attempts += 1;
            debug!(
                "Payment {} is {} after attempt {}/{}",
                payment_request_id, status, attempts, max_attempts
            );

            if status == PaymentStatus::Success || attempts >= max_attempts {
                let exhausted = status != PaymentStatus::Success;
                info!(
                    "Polling for {} finished with {} after {} attempt(s)",
                    payment_request_id, status, attempts
                );
                return PollOutcome {
                    status,
                    attempts,
                    exhausted,
                };
            }

            tokio::time::sleep(self.config.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::client::CheckoutError;
    use crate::checkout::context::CheckoutContext;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replies from a script; `None` is a transport failure
    struct ScriptedApi {
        replies: Mutex<VecDeque<Option<PaymentStatus>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Option<PaymentStatus>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckoutApi for ScriptedApi {
        async fn create_payment(
            &self,
            _context: &CheckoutContext,
        ) -> Result<String, CheckoutError> {
            unreachable!("poller never creates payments")
        }

        async fn inquire_payment(&self, _id: &str) -> Result<PaymentStatus, CheckoutError> {
            self.calls.lock().unwrap().push(Instant::now());
            match self.replies.lock().unwrap().pop_front() {
                Some(Some(status)) => Ok(status),
                Some(None) => Err(CheckoutError::transport("connection reset")),
                None => Ok(PaymentStatus::Processing),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let api = ScriptedApi::new(vec![
            Some(PaymentStatus::Processing),
            Some(PaymentStatus::Success),
            Some(PaymentStatus::Processing),
        ]);

        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(
            outcome,
            PollOutcome {
                status: PaymentStatus::Success,
                attempts: 2,
                exhausted: false,
            }
        );
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_and_fixed_interval() {
        let api = ScriptedApi::new(vec![]);
        let start = Instant::now();

        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(outcome.status, PaymentStatus::Processing);
        assert_eq!(outcome.attempts, 5);
        assert!(outcome.exhausted);

        let calls = api.calls();
        assert_eq!(calls.len(), 5);
        for (i, at) in calls.iter().enumerate() {
            assert_eq!(*at - start, Duration::from_millis(2000) * i as u32);
        }
        // No sleep after the final attempt
        assert_eq!(Instant::now() - start, Duration::from_millis(8000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_transport_failures_end_in_error() {
        let api = ScriptedApi::new(vec![None, None, None, None, None]);
        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(outcome.status, PaymentStatus::Error);
        assert_eq!(outcome.attempts, 5);
        assert!(outcome.exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_loop() {
        let api = ScriptedApi::new(vec![None, Some(PaymentStatus::Success)]);
        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(outcome.status, PaymentStatus::Success);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_seen_status_is_terminal() {
        let api = ScriptedApi::new(vec![
            Some(PaymentStatus::Processing),
            None,
            Some(PaymentStatus::Processing),
            None,
            Some(PaymentStatus::Fail),
        ]);
        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(outcome.status, PaymentStatus::Fail);
        assert!(outcome.exhausted);

        let api = ScriptedApi::new(vec![Some(PaymentStatus::Fail), None, None, None, None]);
        let outcome = StatusPoller::default().poll(&api, "req-1").await;
        assert_eq!(outcome.status, PaymentStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_budget() {
        let api = ScriptedApi::new(vec![]);
        let poller = StatusPoller::new(PollConfig {
            max_attempts: 2,
            interval: Duration::from_millis(50),
        });
        assert_eq!(poller.poll(&api, "req-1").await.attempts, 2);
    }

    #[test]
    fn test_request_id_from_return_url() {
        assert_eq!(
            payment_request_id_from_url(
                "http://localhost:8080/index.html?paymentRequestId=abc-123"
            ),
            Some("abc-123".to_string())
        );
        assert_eq!(
            payment_request_id_from_url("https://shop.example/r?lang=en&paymentRequestId=a%2Fb"),
            Some("a/b".to_string())
        );
        assert_eq!(
            payment_request_id_from_url("http://localhost:8080/index.html"),
            None
        );
        assert_eq!(
            payment_request_id_from_url("http://localhost:8080/index.html?paymentRequestId="),
            None
        );
        assert_eq!(payment_request_id_from_url("not a url"), None);
    }
}
