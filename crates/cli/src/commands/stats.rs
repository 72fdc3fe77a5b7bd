use shoprec_core::config::AppConfig;
use shoprec_core::recommend::{RecommendationEngine, RecommendationType, StatsKey};
use shoprec_core::{EngineError, ProductId};
use shoprec_db::SqlRecommendationStore;

use super::{connect_pool, runtime, CommandError, CommandResult};
use crate::StatsArgs;

pub fn run(config: &AppConfig, args: StatsArgs) -> CommandResult {
    let recommendation_type = match args.recommendation_type.parse::<RecommendationType>() {
        Ok(recommendation_type) => recommendation_type,
        Err(error) => {
            return CommandResult::failure("stats", "invalid_options", error.to_string(), 2);
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("stats", error_class, message, exit_code);
        }
    };

    let key = StatsKey {
        product_id: ProductId(args.product_id.clone()),
        recommended_product_id: ProductId(args.recommended_product_id.clone()),
        recommendation_type,
    };
    let result = runtime.block_on(async {
        let pool = connect_pool(config).await?;
        let engine = RecommendationEngine::new(SqlRecommendationStore::new(pool.clone()));
        let stats = engine.stats_for(&key).await.map_err(|error| match error {
            EngineError::Domain(error) => ("invalid_options", error.to_string(), 2u8),
            EngineError::Store(error) => ("storage", error.to_string(), 5u8),
        })?;
        pool.close().await;
        Ok::<_, CommandError>(stats)
    });

    match result {
        Ok(Some(stats)) => CommandResult::success_with_data(
            "stats",
            "stats found",
            serde_json::json!({
                "views": stats.view_count,
                "clicks": stats.click_count,
                "conversions": stats.conversion_count,
                "last_updated_at": stats.last_updated_at.to_rfc3339(),
            }),
        ),
        Ok(None) => CommandResult::success("stats", "no stats recorded for this pairing"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("stats", error_class, message, exit_code)
        }
    }
}
