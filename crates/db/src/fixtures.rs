//! Deterministic demo fixtures.
//!
//! A small catalog with a known co-purchase pattern so `shoprec seed`
//! and the adapter tests produce predictable recommendations: the solar
//! panel was ordered five times, four of them together with the power
//! bank.

use chrono::{TimeZone, Utc};
use sqlx::Row;

use crate::DbPool;

struct ProductSeed {
    id: &'static str,
    name: &'static str,
    image: Option<&'static str>,
    price: &'static str,
    category: Option<&'static str>,
    stock: i64,
    active: bool,
    created_day: u32,
}

const PRODUCT_SEEDS: &[ProductSeed] = &[
    ProductSeed {
        id: "sku-solar-panel",
        name: "Solar Panel 200W",
        image: Some("/images/solar-panel.png"),
        price: "189.90",
        category: Some("Energy"),
        stock: 24,
        active: true,
        created_day: 20,
    },
    ProductSeed {
        id: "sku-power-bank",
        name: "Power Bank 20Ah",
        image: None,
        price: "59.00",
        category: Some("Energy"),
        stock: 80,
        active: true,
        created_day: 18,
    },
    ProductSeed {
        id: "sku-inverter",
        name: "Inverter 500W",
        image: None,
        price: "129.50",
        category: Some("Energy"),
        stock: 12,
        active: true,
        created_day: 15,
    },
    ProductSeed {
        id: "sku-legacy-cell",
        name: "Legacy Cell",
        image: None,
        price: "35.00",
        category: Some("Energy"),
        stock: 0,
        active: false,
        created_day: 22,
    },
    ProductSeed {
        id: "sku-garden-hose",
        name: "Garden Hose 25m",
        image: None,
        price: "22.40",
        category: Some("Garden"),
        stock: 31,
        active: true,
        created_day: 10,
    },
    ProductSeed {
        id: "sku-trowel",
        name: "Hand Trowel",
        image: None,
        price: "9.95",
        category: Some("Garden"),
        stock: 54,
        active: true,
        created_day: 12,
    },
    ProductSeed {
        id: "sku-headphones",
        name: "Wireless Headphones",
        image: None,
        price: "79.00",
        category: None,
        stock: 17,
        active: true,
        created_day: 25,
    },
];

struct OrderSeed {
    id: &'static str,
    user_id: &'static str,
    day: u32,
    product_ids: &'static [&'static str],
}

const ORDER_SEEDS: &[OrderSeed] = &[
    OrderSeed {
        id: "ord-1001",
        user_id: "user-alice",
        day: 1,
        product_ids: &["sku-solar-panel", "sku-power-bank", "sku-inverter"],
    },
    OrderSeed {
        id: "ord-1002",
        user_id: "user-bob",
        day: 2,
        product_ids: &["sku-solar-panel", "sku-power-bank"],
    },
    OrderSeed {
        id: "ord-1003",
        user_id: "user-carol",
        day: 3,
        product_ids: &["sku-solar-panel", "sku-power-bank"],
    },
    OrderSeed {
        id: "ord-1004",
        user_id: "user-dave",
        day: 4,
        product_ids: &["sku-solar-panel", "sku-power-bank"],
    },
    OrderSeed {
        id: "ord-1005",
        user_id: "user-erin",
        day: 5,
        product_ids: &["sku-solar-panel", "sku-inverter"],
    },
    OrderSeed {
        id: "ord-1006",
        user_id: "user-alice",
        day: 6,
        product_ids: &["sku-garden-hose", "sku-trowel"],
    },
    OrderSeed {
        id: "ord-1007",
        user_id: "user-bob",
        day: 7,
        product_ids: &["sku-headphones"],
    },
];

/// Row counts after seeding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: u64,
    pub orders: u64,
    pub order_items: u64,
}

/// Load the demo catalog and order history. Idempotent: rows that already
/// exist are left untouched, so repeated seeding never duplicates data.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<SeedSummary, sqlx::Error> {
    for seed in PRODUCT_SEEDS {
        let created_at = Utc
            .with_ymd_and_hms(2026, 1, seed.created_day, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        sqlx::query(
            "INSERT INTO products (id, name, image, price, category, stock, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(seed.id)
        .bind(seed.name)
        .bind(seed.image)
        .bind(seed.price)
        .bind(seed.category)
        .bind(seed.stock)
        .bind(seed.active)
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await?;
    }

    for seed in ORDER_SEEDS {
        let created_at = Utc
            .with_ymd_and_hms(2026, 2, seed.day, 14, 30, 0)
            .single()
            .unwrap_or_else(Utc::now);
        sqlx::query(
            "INSERT INTO orders (id, user_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(seed.id)
        .bind(seed.user_id)
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await?;

        for product_id in seed.product_ids {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity) VALUES (?, ?, 1)
                 ON CONFLICT(order_id, product_id) DO NOTHING",
            )
            .bind(seed.id)
            .bind(product_id)
            .execute(pool)
            .await?;
        }
    }

    let products: i64 =
        sqlx::query("SELECT COUNT(*) AS count FROM products")
            .fetch_one(pool)
            .await?
            .get("count");
    let orders: i64 =
        sqlx::query("SELECT COUNT(*) AS count FROM orders").fetch_one(pool).await?.get("count");
    let order_items: i64 = sqlx::query("SELECT COUNT(*) AS count FROM order_items")
        .fetch_one(pool)
        .await?
        .get("count");

    Ok(SeedSummary {
        products: products.max(0) as u64,
        orders: orders.max(0) as u64,
        order_items: order_items.max(0) as u64,
    })
}
