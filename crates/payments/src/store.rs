//! Narrow persistence contracts consumed by the payment lifecycle.
//!
//! Production wires in the Postgres adapters; tests use in-memory
//! implementations with the same uniqueness semantics.

use async_trait::async_trait;

use examly_core::error::CoreError;
use examly_core::types::{DbId, Timestamp};
use examly_db::models::product::Product;
use examly_db::models::purchase::{CreatePurchase, Purchase};
use examly_db::repositories::{ProductRepo, PurchaseRepo};
use examly_db::DbPool;

/// Purchase record lookup and mutation contract.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// The pending or paid purchase for a (user, product) pair, if any.
    async fn find_active(
        &self,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Purchase>, CoreError>;

    async fn find_by_payment_id(&self, payment_id: &str)
        -> Result<Option<Purchase>, CoreError>;

    /// Insert a purchase in `Created` state.
    ///
    /// Fails with [`CoreError::PaymentAlreadyActive`] when the
    /// active-purchase uniqueness guard rejects the row -- the
    /// authoritative answer to two concurrent intents racing past the
    /// pre-check.
    async fn create(&self, input: CreatePurchase) -> Result<Purchase, CoreError>;

    /// Move to `Paid`; returns `None` when no row matches.
    async fn mark_paid(
        &self,
        payment_id: &str,
        paid_at: Option<Timestamp>,
        receipt_url: Option<&str>,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, CoreError>;

    /// Move to `Canceled` unless already `Paid`; returns `None` when no
    /// row was changed.
    async fn mark_canceled(
        &self,
        payment_id: &str,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, CoreError>;
}

/// Product lookup contract; the lifecycle only needs slug resolution.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, CoreError>;
}

/// Map a sqlx error, folding active-purchase unique violations into
/// [`CoreError::PaymentAlreadyActive`].
fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some("uq_purchases_active")
        {
            return CoreError::PaymentAlreadyActive("active".to_string());
        }
    }
    CoreError::Repo(err.to_string())
}

/// Postgres-backed [`PurchaseStore`] over [`PurchaseRepo`].
pub struct PgPurchaseStore {
    pool: DbPool,
}

impl PgPurchaseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseStore for PgPurchaseStore {
    async fn find_active(
        &self,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Purchase>, CoreError> {
        PurchaseRepo::find_active(&self.pool, user_id, product_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Purchase>, CoreError> {
        PurchaseRepo::find_by_payment_id(&self.pool, payment_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, input: CreatePurchase) -> Result<Purchase, CoreError> {
        PurchaseRepo::create(&self.pool, &input)
            .await
            .map_err(map_sqlx_error)
    }

    async fn mark_paid(
        &self,
        payment_id: &str,
        paid_at: Option<Timestamp>,
        receipt_url: Option<&str>,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, CoreError> {
        PurchaseRepo::mark_paid(&self.pool, payment_id, paid_at, receipt_url, raw_payload)
            .await
            .map_err(map_sqlx_error)
    }

    async fn mark_canceled(
        &self,
        payment_id: &str,
        raw_payload: &serde_json::Value,
    ) -> Result<Option<Purchase>, CoreError> {
        PurchaseRepo::mark_canceled(&self.pool, payment_id, raw_payload)
            .await
            .map_err(map_sqlx_error)
    }
}

/// Postgres-backed [`ProductCatalog`] over [`ProductRepo`].
pub struct PgProductCatalog {
    pool: DbPool,
}

impl PgProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, CoreError> {
        ProductRepo::find_by_slug(&self.pool, slug)
            .await
            .map_err(map_sqlx_error)
    }
}
