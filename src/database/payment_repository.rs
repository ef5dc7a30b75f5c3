use crate::database::error::{StoreError, StoreErrorKind, StoreResult};
use crate::database::repository::{decide, ApplyOutcome, PaymentStore};
use crate::payments::types::{PaymentRecord, PaymentStatus, StatusUpdate};
use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

const COLUMNS: &str = "payment_request_id, amount_minor, currency, payment_method_type, status, \
                       result_code, redirect_url, created_at, updated_at";

/// Payment request row
#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    payment_request_id: String,
    amount_minor: i64,
    currency: String,
    payment_method_type: Option<String>,
    status: String,
    result_code: Option<String>,
    redirect_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().unwrap_or(PaymentStatus::Unknown);
        if !status.is_storable() {
            return Err(StoreError::new(StoreErrorKind::Corrupt {
                message: format!("status '{}' for {}", row.status, row.payment_request_id),
            }));
        }

        Ok(PaymentRecord {
            payment_request_id: row.payment_request_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            payment_method_type: row.payment_method_type,
            status,
            result_code: row.result_code,
            redirect_url: row.redirect_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn locked_status(
    conn: &mut PgConnection,
    payment_request_id: &str,
) -> StoreResult<Option<PaymentStatus>> {
    let status: Option<String> = sqlx::query_scalar(
        "SELECT status FROM payment_requests WHERE payment_request_id = $1 FOR UPDATE",
    )
    .bind(payment_request_id)
    .fetch_optional(conn)
    .await
    .map_err(StoreError::from_sqlx)?;

    Ok(status.map(|s| s.parse().unwrap_or(PaymentStatus::Unknown)))
}

/// PostgreSQL-backed payment store
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `payment_requests` table if it does not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS payment_requests (
                payment_request_id TEXT PRIMARY KEY,
                amount_minor BIGINT NOT NULL,
                currency TEXT NOT NULL,
                payment_method_type TEXT,
                status TEXT NOT NULL,
                result_code TEXT,
                redirect_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn insert(&self, record: &PaymentRecord) -> StoreResult<PaymentRecord> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO payment_requests ({columns})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {columns}",
            columns = COLUMNS
        ))
        .bind(&record.payment_request_id)
        .bind(record.amount_minor)
        .bind(&record.currency)
        .bind(&record.payment_method_type)
        .bind(record.status.as_str())
        .bind(&record.result_code)
        .bind(&record.redirect_url)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        PaymentRecord::try_from(row)
    }

    async fn find_by_id(&self, payment_request_id: &str) -> StoreResult<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payment_requests WHERE payment_request_id = $1",
            COLUMNS
        ))
        .bind(payment_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn apply_status(&self, update: &StatusUpdate) -> StoreResult<ApplyOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::new(StoreErrorKind::TransactionError {
                message: e.to_string(),
            })
            .with_context("begin apply_status")
        })?;

        // Row lock serialises concurrent deliveries for the same request
        let mut outcome = decide(
            locked_status(&mut *tx, &update.payment_request_id).await?,
            update.status,
        );

        if outcome == ApplyOutcome::Created {
            let inserted = sqlx::query(
                "INSERT INTO payment_requests
                    (payment_request_id, amount_minor, currency, status, result_code)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (payment_request_id) DO NOTHING",
            )
            .bind(&update.payment_request_id)
            .bind(update.amount_minor.unwrap_or_default())
            .bind(update.currency.clone().unwrap_or_default())
            .bind(update.status.as_str())
            .bind(&update.result_code)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?
            .rows_affected();

            if inserted == 0 {
                // A concurrent delivery created the row after our lookup
                let current = locked_status(&mut *tx, &update.payment_request_id).await?;
                if current.is_none() {
                    return Err(StoreError::new(StoreErrorKind::TransactionError {
                        message: format!(
                            "payment request {} vanished during upsert",
                            update.payment_request_id
                        ),
                    }));
                }
                outcome = decide(current, update.status);
            }
        }

        if let ApplyOutcome::Updated { .. } = outcome {
            sqlx::query(
                "UPDATE payment_requests
                 SET status = $2, result_code = COALESCE($3, result_code), updated_at = NOW()
                 WHERE payment_request_id = $1",
            )
            .bind(&update.payment_request_id)
            .bind(update.status.as_str())
            .bind(&update.result_code)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        }

        tx.commit().await.map_err(|e| {
            StoreError::new(StoreErrorKind::TransactionError {
                message: e.to_string(),
            })
            .with_context("commit apply_status")
        })?;

        debug!(
            "Applied {} to {}: {:?}",
            update.status, update.payment_request_id, outcome
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(status: &str) -> PaymentRow {
        PaymentRow {
            payment_request_id: "req-1".to_string(),
            amount_minor: 1999,
            currency: "USD".to_string(),
            payment_method_type: Some("CARD".to_string()),
            status: status.to_string(),
            result_code: None,
            redirect_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let record = PaymentRecord::try_from(row("SUCCESS")).unwrap();
        assert_eq!(record.status, PaymentStatus::Success);
        assert_eq!(record.amount_minor, 1999);
    }

    #[test]
    fn test_row_with_unstorable_status() {
        assert!(PaymentRecord::try_from(row("ERROR")).is_err());
        assert!(PaymentRecord::try_from(row("garbage")).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires database running
    async fn test_apply_status_against_postgres() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = crate::database::init_pool(&url, None).await.unwrap();
        let repo = PaymentRepository::new(pool);
        repo.ensure_schema().await.unwrap();

        let id = format!("test-{}", uuid::Uuid::new_v4());
        let update = StatusUpdate::new(id.clone(), PaymentStatus::Success);
        assert_eq!(repo.apply_status(&update).await.unwrap(), ApplyOutcome::Created);
        assert_eq!(
            repo.apply_status(&update).await.unwrap(),
            ApplyOutcome::Unchanged {
                current: PaymentStatus::Success
            }
        );
    }

    #[tokio::test]
    #[ignore] // Requires database running
    async fn test_concurrent_first_deliveries_keep_final_status() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = crate::database::init_pool(&url, None).await.unwrap();
        let repo = std::sync::Arc::new(PaymentRepository::new(pool));
        repo.ensure_schema().await.unwrap();

        for _ in 0..20 {
            let id = format!("test-{}", uuid::Uuid::new_v4());
            let success = StatusUpdate::new(id.clone(), PaymentStatus::Success);
            let processing = StatusUpdate::new(id.clone(), PaymentStatus::Processing);

            let (first, second) = {
                let (a, b) = (repo.clone(), repo.clone());
                tokio::join!(
                    tokio::spawn(async move { a.apply_status(&success).await }),
                    tokio::spawn(async move { b.apply_status(&processing).await })
                )
            };
            let outcomes = [first.unwrap().unwrap(), second.unwrap().unwrap()];
            let created = outcomes.iter().filter(|o| **o == ApplyOutcome::Created);
            assert_eq!(created.count(), 1);

            let stored = repo.find_by_id(&id).await.unwrap().unwrap();
            assert_eq!(stored.status, PaymentStatus::Success);
        }
    }
}
