//! View/click/conversion event tracking.

use chrono::Utc;
use uuid::Uuid;

use super::store::RecommendationStore;
use super::types::{RecommendationEvent, RecommendationStats, StatsKey, TrackEventInput};
use super::{EngineResult, RecommendationEngine};

impl<S: RecommendationStore> RecommendationEngine<S> {
    /// Record one interaction with a shown recommendation.
    ///
    /// Appends an event row and bumps the stats aggregate for the
    /// (product, recommended product, strategy) key through the store's
    /// atomic upsert. A failure here fails the tracking call only; callers
    /// are expected to invoke tracking fire-and-forget so it never blocks
    /// the user action it is attached to.
    pub async fn track_event(&self, input: TrackEventInput) -> EngineResult<()> {
        let key = StatsKey {
            product_id: input.product_id.clone(),
            recommended_product_id: input.recommended_product_id.clone(),
            recommendation_type: input.recommendation_type,
        };
        let event = RecommendationEvent {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            product_id: input.product_id,
            recommended_product_id: input.recommended_product_id,
            event_type: input.event_type,
            recommendation_type: input.recommendation_type,
            metadata: input.metadata,
            created_at: Utc::now(),
        };

        self.store().insert_recommendation_event(event).await?;
        self.store().upsert_recommendation_stats(&key, input.event_type).await?;
        Ok(())
    }

    /// Read the aggregate counters for one stats key.
    pub async fn stats_for(&self, key: &StatsKey) -> EngineResult<Option<RecommendationStats>> {
        Ok(self.store().find_recommendation_stats(key).await?)
    }
}
