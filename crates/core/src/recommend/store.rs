//! Data access port consumed by the recommendation engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::order::{OrderId, UserId};
use crate::domain::product::{Product, ProductId};

use super::types::{EventType, RecommendationEvent, RecommendationStats, StatsKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A product id paired with an occurrence count from a grouped count query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductCount {
    pub product_id: ProductId,
    pub count: u64,
}

/// Read access to catalog and order history plus write access to
/// recommendation events and aggregated stats.
///
/// Implementations are expected to be cheap to call repeatedly; the engine
/// holds no cache and re-queries on every request. All product-returning
/// queries resolve active products only unless stated otherwise.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn find_product_by_id(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Resolve products preserving no particular order; callers re-order.
    async fn find_products_by_ids(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError>;

    /// Active products in a category, newest-created first, minus `exclude`.
    async fn find_products_by_category(
        &self,
        category: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError>;

    /// Newest-created active products, minus `exclude`.
    async fn find_recent_active_products(
        &self,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError>;

    async fn find_order_ids_containing_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<OrderId>, StoreError>;

    /// Grouped count of products appearing in `order_ids`, excluding
    /// `exclude_product_id`. Presence per order counts once regardless of
    /// quantity. Only counts strictly greater than `min_count` are
    /// returned, ordered by count descending.
    async fn count_co_occurring_products(
        &self,
        order_ids: &[OrderId],
        exclude_product_id: &ProductId,
        min_count: u32,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError>;

    /// Per-product occurrence counts across all orders, count descending.
    async fn count_product_occurrences_globally(
        &self,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError>;

    async fn find_order_ids_for_user(&self, user_id: &UserId)
        -> Result<Vec<OrderId>, StoreError>;

    /// Product ids appearing in the given orders; duplicates across orders
    /// are preserved, callers de-duplicate.
    async fn find_product_ids_in_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<ProductId>, StoreError>;

    async fn find_recommendation_stats(
        &self,
        key: &StatsKey,
    ) -> Result<Option<RecommendationStats>, StoreError>;

    /// Atomic increment-or-create of the stats row for `key`, bumping the
    /// counter matching `event_type`. Concurrent calls for the same key
    /// must not lose updates.
    async fn upsert_recommendation_stats(
        &self,
        key: &StatsKey,
        event_type: EventType,
    ) -> Result<(), StoreError>;

    async fn insert_recommendation_event(
        &self,
        event: RecommendationEvent,
    ) -> Result<(), StoreError>;
}
