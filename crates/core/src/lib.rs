pub mod config;
pub mod domain;
pub mod errors;
pub mod recommend;

pub use chrono;

pub use domain::order::{Order, OrderId, OrderItem, UserId};
pub use domain::product::{Product, ProductId};
pub use errors::{DomainError, EngineError};
pub use recommend::{
    CartOptions, CategoryOptions, CoOccurrenceAnalyzer, CoOccurrenceOptions, EventType,
    FrequentlyBoughtTogetherOptions, InMemoryRecommendationStore, PersonalizedOptions,
    RecommendationEngine, RecommendationEvent, RecommendationResult, RecommendationStats,
    RecommendationStore, RecommendationType, StatsKey, StoreError, TrackEventInput,
};
