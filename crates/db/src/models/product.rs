//! Product read model.

use examly_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    /// Price in kopecks; the gateway formats this as `rubles.kk`.
    pub price_kopecks: i64,
    pub created_at: Timestamp,
}

/// DTO for creating a product.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub slug: String,
    pub name: String,
    pub price_kopecks: i64,
}
