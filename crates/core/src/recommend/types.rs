//! Types for the recommendation engine.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::order::UserId;
use crate::errors::DomainError;

/// A scored recommendation, computed per request and never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub category: String,
    /// Strategy score, always within `[0, 1]`.
    pub score: f64,
}

impl RecommendationResult {
    /// Build a result record from a resolved product.
    ///
    /// The placeholder image and the `Uncategorized` label are applied here,
    /// at the construction boundary, so call sites never carry defaults.
    pub fn from_product(product: &Product, score: f64) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            image: product
                .image
                .clone()
                .unwrap_or_else(|| super::PLACEHOLDER_IMAGE.to_owned()),
            price: product.price.to_f64().unwrap_or(0.0),
            category: product
                .category
                .clone()
                .unwrap_or_else(|| super::UNCATEGORIZED.to_owned()),
            score,
        }
    }
}

/// Kind of tracked interaction with a shown recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Click,
    Conversion,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Click => "click",
            EventType::Conversion => "conversion",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "click" => Ok(Self::Click),
            "conversion" => Ok(Self::Conversion),
            other => Err(DomainError::InvalidOption(format!(
                "unsupported event type `{other}` (expected view|click|conversion)"
            ))),
        }
    }
}

/// Which strategy produced the recommendation an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    FrequentlyBoughtTogether,
    Personalized,
    CategoryBased,
    CartRelated,
    OrderRelated,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::FrequentlyBoughtTogether => "frequently_bought_together",
            RecommendationType::Personalized => "personalized",
            RecommendationType::CategoryBased => "category_based",
            RecommendationType::CartRelated => "cart_related",
            RecommendationType::OrderRelated => "order_related",
        }
    }
}

impl std::str::FromStr for RecommendationType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "frequently_bought_together" => Ok(Self::FrequentlyBoughtTogether),
            "personalized" => Ok(Self::Personalized),
            "category_based" => Ok(Self::CategoryBased),
            "cart_related" => Ok(Self::CartRelated),
            "order_related" => Ok(Self::OrderRelated),
            other => Err(DomainError::InvalidOption(format!(
                "unsupported recommendation type `{other}`"
            ))),
        }
    }
}

/// Composite key of the stats aggregate: at most one counter row exists per
/// (product, recommended product, strategy) triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatsKey {
    pub product_id: ProductId,
    pub recommended_product_id: ProductId,
    pub recommendation_type: RecommendationType,
}

/// Append-only record of one tracked interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEvent {
    pub id: String,
    pub user_id: Option<UserId>,
    pub product_id: ProductId,
    pub recommended_product_id: ProductId,
    pub event_type: EventType,
    pub recommendation_type: RecommendationType,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Running view/click/conversion counters for one [`StatsKey`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub key: StatsKey,
    pub view_count: u64,
    pub click_count: u64,
    pub conversion_count: u64,
    pub last_updated_at: DateTime<Utc>,
}

/// Caller input for [`RecommendationEngine::track_event`].
///
/// [`RecommendationEngine::track_event`]: super::RecommendationEngine::track_event
#[derive(Clone, Debug)]
pub struct TrackEventInput {
    pub user_id: Option<UserId>,
    pub product_id: ProductId,
    pub recommended_product_id: ProductId,
    pub event_type: EventType,
    pub recommendation_type: RecommendationType,
    pub metadata: Option<serde_json::Value>,
}

fn unit_interval(name: &str, value: f64) -> Result<(), DomainError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DomainError::InvalidOption(format!(
            "{name} must be within 0.0..=1.0, got {value}"
        )));
    }
    Ok(())
}

fn at_least_one(name: &str, value: usize) -> Result<(), DomainError> {
    if value == 0 {
        return Err(DomainError::InvalidOption(format!("{name} must be at least 1")));
    }
    Ok(())
}

/// Tuning knobs for the co-occurrence analyzer.
#[derive(Clone, Debug, PartialEq)]
pub struct CoOccurrenceOptions {
    /// Count threshold; candidates must exceed it strictly.
    pub min_co_occurrence: u32,
    /// Confidence floor, within `[0, 1]`.
    pub min_confidence: f64,
    /// Cap on surviving candidates before resolution.
    pub max_candidates: usize,
}

impl Default for CoOccurrenceOptions {
    fn default() -> Self {
        Self {
            min_co_occurrence: super::DEFAULT_MIN_CO_OCCURRENCE,
            min_confidence: super::DEFAULT_MIN_CONFIDENCE,
            max_candidates: super::DEFAULT_MAX_RESULTS,
        }
    }
}

impl CoOccurrenceOptions {
    pub fn validate(&self) -> Result<(), DomainError> {
        unit_interval("min_confidence", self.min_confidence)?;
        at_least_one("max_candidates", self.max_candidates)
    }
}

/// Options for the frequently-bought-together strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequentlyBoughtTogetherOptions {
    pub min_co_occurrence: u32,
    pub min_confidence: f64,
    pub max_results: usize,
}

impl Default for FrequentlyBoughtTogetherOptions {
    fn default() -> Self {
        Self {
            min_co_occurrence: super::DEFAULT_MIN_CO_OCCURRENCE,
            min_confidence: super::DEFAULT_MIN_CONFIDENCE,
            max_results: super::DEFAULT_MAX_RESULTS,
        }
    }
}

impl FrequentlyBoughtTogetherOptions {
    pub fn with_min_co_occurrence(mut self, value: u32) -> Self {
        self.min_co_occurrence = value;
        self
    }

    pub fn with_min_confidence(mut self, value: f64) -> Self {
        self.min_confidence = value;
        self
    }

    pub fn with_max_results(mut self, value: usize) -> Self {
        self.max_results = value;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        unit_interval("min_confidence", self.min_confidence)?;
        at_least_one("max_results", self.max_results)
    }
}

/// Options for per-user personalized recommendations.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonalizedOptions {
    pub limit: usize,
    pub min_score: f64,
    pub exclude_product_ids: Vec<ProductId>,
}

impl Default for PersonalizedOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonalizedOptions {
    pub fn new() -> Self {
        Self {
            limit: super::DEFAULT_LIMIT,
            min_score: super::DEFAULT_MIN_SCORE,
            exclude_product_ids: Vec::new(),
        }
    }

    pub fn with_limit(mut self, value: usize) -> Self {
        self.limit = value;
        self
    }

    pub fn with_min_score(mut self, value: f64) -> Self {
        self.min_score = value;
        self
    }

    pub fn with_exclusions(mut self, ids: Vec<ProductId>) -> Self {
        self.exclude_product_ids = ids;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        unit_interval("min_score", self.min_score)?;
        at_least_one("limit", self.limit)
    }
}

/// Options for category-based recommendations.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryOptions {
    pub limit: usize,
    pub exclude_product_ids: Vec<ProductId>,
}

impl Default for CategoryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryOptions {
    pub fn new() -> Self {
        Self { limit: super::DEFAULT_LIMIT, exclude_product_ids: Vec::new() }
    }

    pub fn with_limit(mut self, value: usize) -> Self {
        self.limit = value;
        self
    }

    pub fn with_exclusions(mut self, ids: Vec<ProductId>) -> Self {
        self.exclude_product_ids = ids;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        at_least_one("limit", self.limit)
    }
}

/// Options for cart-based recommendations.
#[derive(Clone, Debug, PartialEq)]
pub struct CartOptions {
    pub limit: usize,
    pub exclude_product_ids: Vec<ProductId>,
}

impl Default for CartOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CartOptions {
    pub fn new() -> Self {
        Self { limit: super::DEFAULT_LIMIT, exclude_product_ids: Vec::new() }
    }

    pub fn with_limit(mut self, value: usize) -> Self {
        self.limit = value;
        self
    }

    pub fn with_exclusions(mut self, ids: Vec<ProductId>) -> Self {
        self.exclude_product_ids = ids;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        at_least_one("limit", self.limit)
    }
}
