//! Repository for the `purchases` table.

use examly_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::purchase::{CreatePurchase, Purchase};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, product_id, email, payment_id, status, \
                        paid_at, receipt_url, raw_payload, created_at, updated_at";

/// Provides CRUD operations for purchases.
pub struct PurchaseRepo;

impl PurchaseRepo {
    /// Insert a new purchase in `Created` state, returning the created row.
    ///
    /// Fails with a `uq_purchases_active` unique violation when the
    /// (user, product) pair already has a pending or paid purchase.
    pub async fn create(pool: &PgPool, input: &CreatePurchase) -> Result<Purchase, sqlx::Error> {
        let query = format!(
            "INSERT INTO purchases (user_id, product_id, email, payment_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(input.user_id)
            .bind(input.product_id)
            .bind(&input.email)
            .bind(&input.payment_id)
            .fetch_one(pool)
            .await
    }

    /// Find a purchase by its correlation payment id.
    pub async fn find_by_payment_id(
        pool: &PgPool,
        payment_id: &str,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM purchases WHERE payment_id = $1");
        sqlx::query_as::<_, Purchase>(&query)
            .bind(payment_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the pending or paid purchase for a (user, product) pair, if any.
    ///
    /// The partial unique index guarantees at most one such row.
    pub async fn find_active(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM purchases
             WHERE user_id = $1 AND product_id = $2 AND status IN ('Created', 'Paid')"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(pool)
            .await
    }

    /// List all purchases of a user, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Purchase>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM purchases WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Move a purchase to `Paid`, recording the paid timestamp, receipt
    /// reference, and the raw webhook body.
    ///
    /// Re-applying the same event is harmless: the row ends in the same
    /// terminal state. Returns `None` when no row matches `payment_id`.
    pub async fn mark_paid(
        pool: &PgPool,
        payment_id: &str,
        paid_at: Option<Timestamp>,
        receipt_url: Option<&str>,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!(
            "UPDATE purchases SET
                status = 'Paid',
                paid_at = COALESCE($2, paid_at, NOW()),
                receipt_url = COALESCE($3, receipt_url),
                raw_payload = $4,
                updated_at = NOW()
             WHERE payment_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(payment_id)
            .bind(paid_at)
            .bind(receipt_url)
            .bind(raw_payload)
            .fetch_optional(pool)
            .await
    }

    /// Move a purchase to `Canceled` unless it already reached `Paid`.
    ///
    /// Returns `None` when no row matches or the purchase is paid.
    pub async fn mark_canceled(
        pool: &PgPool,
        payment_id: &str,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!(
            "UPDATE purchases SET
                status = 'Canceled',
                raw_payload = $2,
                updated_at = NOW()
             WHERE payment_id = $1 AND status <> 'Paid'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(payment_id)
            .bind(raw_payload)
            .fetch_optional(pool)
            .await
    }

    /// Cancel `Created` purchases older than the given instant.
    ///
    /// For a housekeeping job: a record stuck in `Created` means the
    /// provider call failed or the buyer abandoned checkout. Returns the
    /// count of canceled rows.
    pub async fn cancel_stale_created(
        pool: &PgPool,
        older_than: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE purchases SET status = 'Canceled', updated_at = NOW()
             WHERE status = 'Created' AND created_at < $1",
        )
        .bind(older_than)
        .execute(pool)
        .await?;
        let canceled = result.rows_affected();
        if canceled > 0 {
            tracing::info!(canceled, "Canceled stale Created purchases");
        }
        Ok(canceled)
    }
}
