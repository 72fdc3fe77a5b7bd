use serde::Serialize;
use sqlx::Row;

use shoprec_core::config::AppConfig;

use super::{connect_pool, runtime, CommandResult};

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: &'static str,
    detail: String,
}

const EXPECTED_TABLES: &[&str] =
    &["products", "orders", "order_items", "recommendation_events", "recommendation_stats"];

pub fn run(config: &AppConfig) -> CommandResult {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("doctor", error_class, message, exit_code);
        }
    };

    let mut checks = vec![Check {
        name: "config",
        status: "ok",
        detail: format!("database.url = {}", config.database.url),
    }];

    let connectivity = runtime.block_on(async {
        let pool = connect_pool(config).await.map_err(|(_, message, _)| message)?;

        let missing: Vec<&str> = {
            let mut missing = Vec::new();
            for table in EXPECTED_TABLES {
                let count: i64 = sqlx::query(
                    "SELECT COUNT(*) AS count FROM sqlite_master
                     WHERE type = 'table' AND name = ?",
                )
                .bind(table)
                .fetch_one(&pool)
                .await
                .map(|row| row.get("count"))
                .map_err(|error| error.to_string())?;
                if count == 0 {
                    missing.push(*table);
                }
            }
            missing
        };
        pool.close().await;
        Ok::<Vec<&str>, String>(missing)
    });

    let healthy = match connectivity {
        Ok(missing) if missing.is_empty() => {
            checks.push(Check {
                name: "database",
                status: "ok",
                detail: "connected".to_string(),
            });
            checks.push(Check {
                name: "schema",
                status: "ok",
                detail: "all recommendation tables present".to_string(),
            });
            true
        }
        Ok(missing) => {
            checks.push(Check {
                name: "database",
                status: "ok",
                detail: "connected".to_string(),
            });
            checks.push(Check {
                name: "schema",
                status: "error",
                detail: format!("missing tables: {} (run `shoprec migrate`)", missing.join(", ")),
            });
            false
        }
        Err(message) => {
            checks.push(Check { name: "database", status: "error", detail: message });
            false
        }
    };

    let data = serde_json::json!({ "checks": checks });
    if healthy {
        CommandResult::success_with_data("doctor", "all checks passed", data)
    } else {
        // keep the per-check details in the envelope even on failure
        CommandResult::failure_with_data(
            "doctor",
            "readiness",
            "one or more checks failed",
            4,
            data,
        )
    }
}
