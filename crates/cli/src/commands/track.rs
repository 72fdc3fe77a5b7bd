use shoprec_core::config::AppConfig;
use shoprec_core::recommend::{
    EventType, RecommendationEngine, RecommendationType, TrackEventInput,
};
use shoprec_core::{EngineError, ProductId, UserId};
use shoprec_db::SqlRecommendationStore;

use super::{connect_pool, runtime, CommandError, CommandResult};
use crate::TrackArgs;

pub fn run(config: &AppConfig, args: TrackArgs) -> CommandResult {
    let event_type = match args.event.parse::<EventType>() {
        Ok(event_type) => event_type,
        Err(error) => {
            return CommandResult::failure("track", "invalid_options", error.to_string(), 2);
        }
    };
    let recommendation_type = match args.recommendation_type.parse::<RecommendationType>() {
        Ok(recommendation_type) => recommendation_type,
        Err(error) => {
            return CommandResult::failure("track", "invalid_options", error.to_string(), 2);
        }
    };
    let metadata = match args
        .metadata
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
    {
        Ok(metadata) => metadata,
        Err(error) => {
            return CommandResult::failure(
                "track",
                "invalid_options",
                format!("metadata is not valid JSON: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("track", error_class, message, exit_code);
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_pool(config).await?;
        let engine = RecommendationEngine::new(SqlRecommendationStore::new(pool.clone()));
        engine
            .track_event(TrackEventInput {
                user_id: args.user.clone().map(UserId),
                product_id: ProductId(args.product_id.clone()),
                recommended_product_id: ProductId(args.recommended_product_id.clone()),
                event_type,
                recommendation_type,
                metadata,
            })
            .await
            .map_err(|error| match error {
                EngineError::Domain(error) => ("invalid_options", error.to_string(), 2u8),
                EngineError::Store(error) => ("tracking", error.to_string(), 5u8),
            })?;
        pool.close().await;
        Ok::<(), CommandError>(())
    });

    match result {
        Ok(()) => {
            tracing::info!(
                event_name = "cli.track.recorded",
                event_type = event_type.as_str(),
                recommendation_type = recommendation_type.as_str(),
                "recommendation event recorded"
            );
            CommandResult::success(
                "track",
                format!("recorded {} event", event_type.as_str()),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("track", error_class, message, exit_code)
        }
    }
}
