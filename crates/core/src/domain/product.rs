use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog product as the recommendation core sees it.
///
/// `price` stays a `Decimal` until result construction; scoring never needs
/// it, only the outward result record carries a float.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub stock: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
