//! Product recommendation engine.
//!
//! Collaborative-filtering recommendations derived from order history:
//! frequently-bought-together, personalized, category-based, and cart-based
//! strategies over a shared co-occurrence primitive, with a popularity
//! fallback chain and view/click/conversion event tracking. The engine owns
//! no storage; every call re-derives its answer through the
//! [`RecommendationStore`] port.

mod analyzer;
mod engine;
mod memory;
mod tracker;
mod types;

pub mod store;

pub use analyzer::CoOccurrenceAnalyzer;
pub use engine::RecommendationEngine;
pub use memory::InMemoryRecommendationStore;
pub use store::{ProductCount, RecommendationStore, StoreError};
pub use types::*;

use crate::errors::EngineError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Default result count for personalized, category, and cart strategies.
pub const DEFAULT_LIMIT: usize = 10;

/// Default confidence floor used by the personalized accumulation.
pub const DEFAULT_MIN_SCORE: f64 = 0.1;

/// Default co-occurrence count threshold. Candidates must exceed it
/// strictly; a count equal to the threshold is dropped.
pub const DEFAULT_MIN_CO_OCCURRENCE: u32 = 2;

/// Default confidence floor for the co-occurrence analyzer.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.1;

/// Default candidate cap for frequently-bought-together.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Fixed score for category-based results; the strategy carries recency
/// only, no learned signal.
pub const CATEGORY_BASED_SCORE: f64 = 0.5;

/// Low-confidence score assigned when a cold catalog forces the
/// newest-products fallback.
pub const COLD_CATALOG_SCORE: f64 = 0.3;

/// Cap applied to the category fallback inside frequently-bought-together.
pub const CATEGORY_FALLBACK_CAP: usize = 5;

/// Image URI substituted when a product carries none.
pub const PLACEHOLDER_IMAGE: &str = "/images/product-placeholder.png";

/// Category label substituted when a product carries none.
pub const UNCATEGORIZED: &str = "Uncategorized";
