use shoprec_core::config::AppConfig;
use shoprec_db::{fixtures, migrations};

use super::{connect_pool, runtime, CommandError, CommandResult};

pub fn run(config: &AppConfig) -> CommandResult {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("seed", error_class, message, exit_code);
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_pool(config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let summary = fixtures::seed_demo_catalog(&pool)
            .await
            .map_err(|error| ("seed", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<fixtures::SeedSummary, CommandError>(summary)
    });

    match result {
        Ok(summary) => {
            tracing::info!(
                event_name = "cli.seed.loaded",
                products = summary.products,
                orders = summary.orders,
                order_items = summary.order_items,
                "demo fixtures loaded"
            );
            CommandResult::success_with_data(
                "seed",
                "loaded demo fixtures",
                serde_json::json!({
                    "products": summary.products,
                    "orders": summary.orders,
                    "order_items": summary.order_items,
                }),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
