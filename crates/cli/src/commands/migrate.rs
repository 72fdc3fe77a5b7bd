use shoprec_core::config::AppConfig;
use shoprec_db::migrations;

use super::{connect_pool, runtime, CommandError, CommandResult};

pub fn run(config: &AppConfig) -> CommandResult {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("migrate", error_class, message, exit_code);
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_pool(config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), CommandError>(())
    });

    match result {
        Ok(()) => {
            tracing::info!(event_name = "cli.migrate.applied", "migrations applied");
            CommandResult::success("migrate", "applied pending migrations")
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
