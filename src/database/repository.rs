use crate::database::error::StoreResult;
use crate::payments::types::{PaymentRecord, PaymentStatus, StatusUpdate};
use async_trait::async_trait;

/// What applying a status update did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The payment request was unknown and has been created
    Created,
    /// The stored status changed
    Updated { previous: PaymentStatus },
    /// Same status as stored, or an out-of-order update against a final status
    Unchanged { current: PaymentStatus },
}

/// Decide how an update lands on the currently stored status.
///
/// Notifications are delivered at least once and may arrive out of order:
/// re-applying the stored status is a no-op and a final status is never
/// moved back to `PROCESSING`. Anything else is last-write-wins.
pub fn decide(current: Option<PaymentStatus>, next: PaymentStatus) -> ApplyOutcome {
    match current {
        None => ApplyOutcome::Created,
        Some(current) if current == next => ApplyOutcome::Unchanged { current },
        Some(current) if current.is_final() && next == PaymentStatus::Processing => {
            ApplyOutcome::Unchanged { current }
        }
        Some(previous) => ApplyOutcome::Updated { previous },
    }
}

/// Storage for payment requests, keyed by payment request id
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new payment request
    async fn insert(&self, record: &PaymentRecord) -> StoreResult<PaymentRecord>;

    /// Find a payment request by its id
    async fn find_by_id(&self, payment_request_id: &str) -> StoreResult<Option<PaymentRecord>>;

    /// Apply a gateway status idempotently, see [`decide`]
    async fn apply_status(&self, update: &StatusUpdate) -> StoreResult<ApplyOutcome>;

    /// Check if a payment request exists
    async fn exists(&self, payment_request_id: &str) -> StoreResult<bool> {
        Ok(self.find_by_id(payment_request_id).await?.is_some())
    }
}
