//! sqlx implementation of the recommendation data access port.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use shoprec_core::recommend::store::{ProductCount, RecommendationStore, StoreError};
use shoprec_core::recommend::{
    EventType, RecommendationEvent, RecommendationStats, RecommendationType, StatsKey,
};
use shoprec_core::{OrderId, Product, ProductId, UserId};

use crate::DbPool;

pub struct SqlRecommendationStore {
    pool: DbPool,
}

impl SqlRecommendationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(error.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn decode_error(error: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(error.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode_error)
}

fn row_to_product(row: &SqliteRow) -> Result<Product, StoreError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let image: Option<String> = row.try_get("image").map_err(decode_error)?;
    let price_raw: String = row.try_get("price").map_err(decode_error)?;
    let category: Option<String> = row.try_get("category").map_err(decode_error)?;
    let stock: i64 = row.try_get("stock").map_err(decode_error)?;
    let active: bool = row.try_get("active").map_err(decode_error)?;
    let created_at_raw: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Product {
        id: ProductId(id),
        name,
        image,
        price: Decimal::from_str(&price_raw).map_err(decode_error)?,
        category,
        stock: u32::try_from(stock.max(0)).unwrap_or(u32::MAX),
        active,
        created_at: parse_timestamp(&created_at_raw)?,
    })
}

fn row_to_count(row: &SqliteRow) -> Result<ProductCount, StoreError> {
    let product_id: String = row.try_get("product_id").map_err(decode_error)?;
    let count: i64 = row.try_get("cnt").map_err(decode_error)?;
    Ok(ProductCount { product_id: ProductId(product_id), count: count.max(0) as u64 })
}

fn row_to_stats(row: &SqliteRow) -> Result<RecommendationStats, StoreError> {
    let product_id: String = row.try_get("product_id").map_err(decode_error)?;
    let recommended_product_id: String =
        row.try_get("recommended_product_id").map_err(decode_error)?;
    let recommendation_type_raw: String =
        row.try_get("recommendation_type").map_err(decode_error)?;
    let view_count: i64 = row.try_get("view_count").map_err(decode_error)?;
    let click_count: i64 = row.try_get("click_count").map_err(decode_error)?;
    let conversion_count: i64 = row.try_get("conversion_count").map_err(decode_error)?;
    let last_updated_at_raw: String = row.try_get("last_updated_at").map_err(decode_error)?;

    let recommendation_type =
        RecommendationType::from_str(&recommendation_type_raw).map_err(decode_error)?;

    Ok(RecommendationStats {
        key: StatsKey {
            product_id: ProductId(product_id),
            recommended_product_id: ProductId(recommended_product_id),
            recommendation_type,
        },
        view_count: view_count.max(0) as u64,
        click_count: click_count.max(0) as u64,
        conversion_count: conversion_count.max(0) as u64,
        last_updated_at: parse_timestamp(&last_updated_at_raw)?,
    })
}

/// `?, ?, ...` for dynamically sized `IN (...)` lists.
fn placeholders(count: usize) -> String {
    let mut list = String::from("?");
    for _ in 1..count {
        list.push_str(", ?");
    }
    list
}

const PRODUCT_COLUMNS: &str = "id, name, image, price, category, stock, active, created_at";

#[async_trait]
impl RecommendationStore for SqlRecommendationStore {
    async fn find_product_by_id(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_products_by_ids(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({})",
            placeholders(ids.len())
        );
        if active_only {
            sql.push_str(" AND active = 1");
        }

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(&id.0);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(store_error)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn find_products_by_category(
        &self,
        category: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let mut sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = 1 AND category = ?"
        );
        if !exclude.is_empty() {
            sql.push_str(&format!(" AND id NOT IN ({})", placeholders(exclude.len())));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ?");

        let mut query = sqlx::query(&sql).bind(category);
        for id in exclude {
            query = query.bind(&id.0);
        }
        let rows =
            query.bind(limit as i64).fetch_all(&self.pool).await.map_err(store_error)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn find_recent_active_products(
        &self,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE active = 1");
        if !exclude.is_empty() {
            sql.push_str(&format!(" AND id NOT IN ({})", placeholders(exclude.len())));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ?");

        let mut query = sqlx::query(&sql);
        for id in exclude {
            query = query.bind(&id.0);
        }
        let rows =
            query.bind(limit as i64).fetch_all(&self.pool).await.map_err(store_error)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn find_order_ids_containing_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<OrderId>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT order_id FROM order_items WHERE product_id = ? ORDER BY order_id",
        )
        .bind(&product_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("order_id").map(OrderId).map_err(decode_error)
            })
            .collect()
    }

    async fn count_co_occurring_products(
        &self,
        order_ids: &[OrderId],
        exclude_product_id: &ProductId,
        min_count: u32,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        // presence per order, not quantity, drives the count
        let sql = format!(
            "SELECT product_id, COUNT(DISTINCT order_id) AS cnt
             FROM order_items
             WHERE order_id IN ({}) AND product_id != ?
             GROUP BY product_id
             HAVING COUNT(DISTINCT order_id) > ?
             ORDER BY cnt DESC, product_id ASC
             LIMIT ?",
            placeholders(order_ids.len())
        );

        let mut query = sqlx::query(&sql);
        for id in order_ids {
            query = query.bind(&id.0);
        }
        let rows = query
            .bind(&exclude_product_id.0)
            .bind(i64::from(min_count))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows.iter().map(row_to_count).collect()
    }

    async fn count_product_occurrences_globally(
        &self,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, COUNT(DISTINCT order_id) AS cnt
             FROM order_items
             GROUP BY product_id
             ORDER BY cnt DESC, product_id ASC
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows.iter().map(row_to_count).collect()
    }

    async fn find_order_ids_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<OrderId>, StoreError> {
        let rows = sqlx::query(
            "SELECT id FROM orders WHERE user_id = ? ORDER BY created_at DESC, id ASC",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map(OrderId).map_err(decode_error))
            .collect()
    }

    async fn find_product_ids_in_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<ProductId>, StoreError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT product_id FROM order_items WHERE order_id IN ({})
             ORDER BY order_id, product_id",
            placeholders(order_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in order_ids {
            query = query.bind(&id.0);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(store_error)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("product_id").map(ProductId).map_err(decode_error)
            })
            .collect()
    }

    async fn find_recommendation_stats(
        &self,
        key: &StatsKey,
    ) -> Result<Option<RecommendationStats>, StoreError> {
        let row = sqlx::query(
            "SELECT product_id, recommended_product_id, recommendation_type,
                    view_count, click_count, conversion_count, last_updated_at
             FROM recommendation_stats
             WHERE product_id = ? AND recommended_product_id = ? AND recommendation_type = ?",
        )
        .bind(&key.product_id.0)
        .bind(&key.recommended_product_id.0)
        .bind(key.recommendation_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.as_ref().map(row_to_stats).transpose()
    }

    async fn upsert_recommendation_stats(
        &self,
        key: &StatsKey,
        event_type: EventType,
    ) -> Result<(), StoreError> {
        let (views, clicks, conversions) = match event_type {
            EventType::View => (1i64, 0i64, 0i64),
            EventType::Click => (0, 1, 0),
            EventType::Conversion => (0, 0, 1),
        };

        // one statement, so concurrent trackers on the same key cannot
        // lose updates
        sqlx::query(
            "INSERT INTO recommendation_stats
                (product_id, recommended_product_id, recommendation_type,
                 view_count, click_count, conversion_count, last_updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(product_id, recommended_product_id, recommendation_type) DO UPDATE SET
                view_count = view_count + excluded.view_count,
                click_count = click_count + excluded.click_count,
                conversion_count = conversion_count + excluded.conversion_count,
                last_updated_at = excluded.last_updated_at",
        )
        .bind(&key.product_id.0)
        .bind(&key.recommended_product_id.0)
        .bind(key.recommendation_type.as_str())
        .bind(views)
        .bind(clicks)
        .bind(conversions)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn insert_recommendation_event(
        &self,
        event: RecommendationEvent,
    ) -> Result<(), StoreError> {
        let metadata = event.metadata.as_ref().map(|value| value.to_string());
        sqlx::query(
            "INSERT INTO recommendation_events
                (id, user_id, product_id, recommended_product_id,
                 event_type, recommendation_type, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(event.user_id.as_ref().map(|user| user.0.as_str()))
        .bind(&event.product_id.0)
        .bind(&event.recommended_product_id.0)
        .bind(event.event_type.as_str())
        .bind(event.recommendation_type.as_str())
        .bind(metadata)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
