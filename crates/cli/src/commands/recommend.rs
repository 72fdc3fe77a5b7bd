use shoprec_core::config::AppConfig;
use shoprec_core::recommend::{
    CartOptions, CategoryOptions, FrequentlyBoughtTogetherOptions, PersonalizedOptions,
    RecommendationEngine, RecommendationResult,
};
use shoprec_core::{EngineError, ProductId, UserId};
use shoprec_db::SqlRecommendationStore;

use super::{connect_pool, product_ids, runtime, CommandError, CommandResult};
use crate::RecommendCommand;

fn engine_error(error: EngineError) -> CommandError {
    match error {
        EngineError::Domain(error) => ("invalid_options", error.to_string(), 2),
        EngineError::Store(error) => ("storage", error.to_string(), 5),
    }
}

pub fn run(config: &AppConfig, strategy: RecommendCommand) -> CommandResult {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("recommend", error_class, message, exit_code);
        }
    };

    let defaults = &config.recommendations;
    let result = runtime.block_on(async {
        let pool = connect_pool(config).await?;
        let engine = RecommendationEngine::new(SqlRecommendationStore::new(pool.clone()));

        let (label, results): (&'static str, Vec<RecommendationResult>) = match strategy {
            RecommendCommand::BoughtTogether {
                product_id,
                min_co_occurrence,
                min_confidence,
                max_results,
            } => {
                let options = FrequentlyBoughtTogetherOptions {
                    min_co_occurrence: min_co_occurrence
                        .unwrap_or(defaults.min_co_occurrence),
                    min_confidence: min_confidence.unwrap_or(defaults.min_confidence),
                    max_results: max_results.unwrap_or(defaults.max_results),
                };
                let results = engine
                    .frequently_bought_together(&ProductId(product_id), options)
                    .await
                    .map_err(engine_error)?;
                ("recommend.bought_together", results)
            }
            RecommendCommand::Personalized { user_id, limit, min_score, exclude } => {
                let options = PersonalizedOptions {
                    limit: limit.unwrap_or(defaults.default_limit),
                    min_score: min_score.unwrap_or(defaults.min_score),
                    exclude_product_ids: product_ids(&exclude),
                };
                let results = engine
                    .personalized(&UserId(user_id), options)
                    .await
                    .map_err(engine_error)?;
                ("recommend.personalized", results)
            }
            RecommendCommand::OrderHistory { user_id, limit, min_score, exclude } => {
                let options = PersonalizedOptions {
                    limit: limit.unwrap_or(defaults.default_limit),
                    min_score: min_score.unwrap_or(defaults.min_score),
                    exclude_product_ids: product_ids(&exclude),
                };
                let results = engine
                    .order_history(&UserId(user_id), options)
                    .await
                    .map_err(engine_error)?;
                ("recommend.order_history", results)
            }
            RecommendCommand::Category { category, limit, exclude } => {
                let options = CategoryOptions {
                    limit: limit.unwrap_or(defaults.default_limit),
                    exclude_product_ids: product_ids(&exclude),
                };
                let results =
                    engine.category_based(&category, options).await.map_err(engine_error)?;
                ("recommend.category", results)
            }
            RecommendCommand::Cart { product_ids: cart, limit, exclude } => {
                let options = CartOptions {
                    limit: limit.unwrap_or(defaults.default_limit),
                    exclude_product_ids: product_ids(&exclude),
                };
                let results = engine
                    .cart_based(&product_ids(&cart), options)
                    .await
                    .map_err(engine_error)?;
                ("recommend.cart", results)
            }
        };

        pool.close().await;
        Ok::<(&'static str, Vec<RecommendationResult>), CommandError>((label, results))
    });

    match result {
        Ok((label, results)) => {
            tracing::info!(
                event_name = "cli.recommend.computed",
                strategy = label,
                count = results.len(),
                "recommendations computed"
            );
            CommandResult::success_with_data(
                label,
                format!("{} recommendation(s)", results.len()),
                serde_json::json!(results),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}
