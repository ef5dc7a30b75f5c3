//! In-process payment store, used when no database is configured

use crate::database::error::{StoreError, StoreResult};
use crate::database::repository::{decide, ApplyOutcome, PaymentStore};
use crate::payments::types::{PaymentRecord, StatusUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    records: RwLock<HashMap<String, PaymentRecord>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> StoreResult<PaymentRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.payment_request_id) {
            return Err(StoreError::duplicate(
                "payment_request_id",
                record.payment_request_id.clone(),
            ));
        }
        records.insert(record.payment_request_id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn find_by_id(&self, payment_request_id: &str) -> StoreResult<Option<PaymentRecord>> {
        Ok(self.records.read().await.get(payment_request_id).cloned())
    }

    async fn apply_status(&self, update: &StatusUpdate) -> StoreResult<ApplyOutcome> {
        // Holding the write lock makes read-decide-write atomic per store
        let mut records = self.records.write().await;
        let current = records.get(&update.payment_request_id).map(|r| r.status);
        let outcome = decide(current, update.status);
        let now = Utc::now();

        match outcome {
            ApplyOutcome::Created => {
                records.insert(
                    update.payment_request_id.clone(),
                    PaymentRecord {
                        payment_request_id: update.payment_request_id.clone(),
                        amount_minor: update.amount_minor.unwrap_or_default(),
                        currency: update.currency.clone().unwrap_or_default(),
                        payment_method_type: None,
                        status: update.status,
                        result_code: update.result_code.clone(),
                        redirect_url: None,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            ApplyOutcome::Updated { .. } => {
                if let Some(record) = records.get_mut(&update.payment_request_id) {
                    record.status = update.status;
                    if update.result_code.is_some() {
                        record.result_code = update.result_code.clone();
                    }
                    record.updated_at = now;
                }
            }
            ApplyOutcome::Unchanged { .. } => {}
        }

        debug!(
            "Applied {} to {}: {:?}",
            update.status, update.payment_request_id, outcome
        );
        Ok(outcome)
    }
}
