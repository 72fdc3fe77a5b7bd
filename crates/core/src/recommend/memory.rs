//! In-memory implementation of the data access port.
//!
//! Backs the engine tests and the adapter contract tests; also usable as a
//! lightweight store for demos. Not meant for production catalogs.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::domain::order::{Order, OrderId, OrderItem, UserId};
use crate::domain::product::{Product, ProductId};

use super::store::{ProductCount, RecommendationStore, StoreError};
use super::types::{EventType, RecommendationEvent, RecommendationStats, StatsKey};

#[derive(Default)]
pub struct InMemoryRecommendationStore {
    products: RwLock<Vec<Product>>,
    orders: RwLock<Vec<Order>>,
    items: RwLock<Vec<OrderItem>>,
    events: RwLock<Vec<RecommendationEvent>>,
    stats: RwLock<HashMap<StatsKey, RecommendationStats>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        write(&self.products).push(product);
    }

    /// Record an order holding one line item per given product id.
    pub fn add_order(&self, order: Order, product_ids: &[ProductId]) {
        let order_id = order.id.clone();
        write(&self.orders).push(order);
        let mut items = write(&self.items);
        for product_id in product_ids {
            items.push(OrderItem {
                order_id: order_id.clone(),
                product_id: product_id.clone(),
                quantity: 1,
            });
        }
    }

    pub fn events(&self) -> Vec<RecommendationEvent> {
        read(&self.events).clone()
    }

    pub fn stats_rows(&self) -> Vec<RecommendationStats> {
        read(&self.stats).values().cloned().collect()
    }
}

fn newest_first(products: &mut Vec<Product>) {
    products.sort_by(|a, b| {
        b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0))
    });
}

#[async_trait::async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn find_product_by_id(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(read(&self.products).iter().find(|p| &p.id == id).cloned())
    }

    async fn find_products_by_ids(
        &self,
        ids: &[ProductId],
        active_only: bool,
    ) -> Result<Vec<Product>, StoreError> {
        let wanted: HashSet<&str> = ids.iter().map(|id| id.0.as_str()).collect();
        Ok(read(&self.products)
            .iter()
            .filter(|p| wanted.contains(p.id.0.as_str()) && (!active_only || p.active))
            .cloned()
            .collect())
    }

    async fn find_products_by_category(
        &self,
        category: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let excluded: HashSet<&str> = exclude.iter().map(|id| id.0.as_str()).collect();
        let mut matching: Vec<Product> = read(&self.products)
            .iter()
            .filter(|p| {
                p.active
                    && p.category.as_deref() == Some(category)
                    && !excluded.contains(p.id.0.as_str())
            })
            .cloned()
            .collect();
        newest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn find_recent_active_products(
        &self,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let excluded: HashSet<&str> = exclude.iter().map(|id| id.0.as_str()).collect();
        let mut matching: Vec<Product> = read(&self.products)
            .iter()
            .filter(|p| p.active && !excluded.contains(p.id.0.as_str()))
            .cloned()
            .collect();
        newest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn find_order_ids_containing_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<OrderId>, StoreError> {
        let mut seen = HashSet::new();
        Ok(read(&self.items)
            .iter()
            .filter(|item| &item.product_id == product_id)
            .filter(|item| seen.insert(item.order_id.0.clone()))
            .map(|item| item.order_id.clone())
            .collect())
    }

    async fn count_co_occurring_products(
        &self,
        order_ids: &[OrderId],
        exclude_product_id: &ProductId,
        min_count: u32,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError> {
        let wanted: HashSet<&str> = order_ids.iter().map(|id| id.0.as_str()).collect();
        let mut counted: HashSet<(String, String)> = HashSet::new();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for item in read(&self.items).iter() {
            if !wanted.contains(item.order_id.0.as_str())
                || &item.product_id == exclude_product_id
            {
                continue;
            }
            // presence per order, not quantity
            if counted.insert((item.order_id.0.clone(), item.product_id.0.clone())) {
                *counts.entry(item.product_id.0.clone()).or_insert(0) += 1;
            }
        }
        let mut rows: Vec<ProductCount> = counts
            .into_iter()
            .filter(|(_, count)| *count > u64::from(min_count))
            .map(|(id, count)| ProductCount { product_id: ProductId(id), count })
            .collect();
        rows.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| a.product_id.0.cmp(&b.product_id.0))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_product_occurrences_globally(
        &self,
        limit: usize,
    ) -> Result<Vec<ProductCount>, StoreError> {
        let mut counted: HashSet<(String, String)> = HashSet::new();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for item in read(&self.items).iter() {
            if counted.insert((item.order_id.0.clone(), item.product_id.0.clone())) {
                *counts.entry(item.product_id.0.clone()).or_insert(0) += 1;
            }
        }
        let mut rows: Vec<ProductCount> = counts
            .into_iter()
            .map(|(id, count)| ProductCount { product_id: ProductId(id), count })
            .collect();
        rows.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| a.product_id.0.cmp(&b.product_id.0))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn find_order_ids_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<OrderId>, StoreError> {
        Ok(read(&self.orders)
            .iter()
            .filter(|order| &order.user_id == user_id)
            .map(|order| order.id.clone())
            .collect())
    }

    async fn find_product_ids_in_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<Vec<ProductId>, StoreError> {
        let wanted: HashSet<&str> = order_ids.iter().map(|id| id.0.as_str()).collect();
        Ok(read(&self.items)
            .iter()
            .filter(|item| wanted.contains(item.order_id.0.as_str()))
            .map(|item| item.product_id.clone())
            .collect())
    }

    async fn find_recommendation_stats(
        &self,
        key: &StatsKey,
    ) -> Result<Option<RecommendationStats>, StoreError> {
        Ok(read(&self.stats).get(key).cloned())
    }

    async fn upsert_recommendation_stats(
        &self,
        key: &StatsKey,
        event_type: EventType,
    ) -> Result<(), StoreError> {
        // single critical section per call; nothing is read outside the lock
        let mut stats = write(&self.stats);
        let row = stats.entry(key.clone()).or_insert_with(|| RecommendationStats {
            key: key.clone(),
            view_count: 0,
            click_count: 0,
            conversion_count: 0,
            last_updated_at: Utc::now(),
        });
        match event_type {
            EventType::View => row.view_count += 1,
            EventType::Click => row.click_count += 1,
            EventType::Conversion => row.conversion_count += 1,
        }
        row.last_updated_at = Utc::now();
        Ok(())
    }

    async fn insert_recommendation_event(
        &self,
        event: RecommendationEvent,
    ) -> Result<(), StoreError> {
        write(&self.events).push(event);
        Ok(())
    }
}
