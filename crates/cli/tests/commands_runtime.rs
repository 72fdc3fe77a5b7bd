use serde_json::Value;

use shoprec_cli::commands::{doctor, migrate, recommend, seed, stats, track};
use shoprec_cli::{RecommendCommand, StatsArgs, TrackArgs};
use shoprec_core::config::AppConfig;

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn config_for(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url =
        format!("sqlite://{}/shoprec.db?mode=rwc", dir.path().to_string_lossy());
    config
}

#[test]
fn migrate_then_doctor_reports_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);

    let before = doctor::run(&config);
    assert_eq!(before.exit_code, 4, "schema should be missing before migrate");
    let payload = parse_payload(&before.output);
    assert_eq!(payload["error_class"], "readiness");

    let result = migrate::run(&config);
    assert_eq!(result.exit_code, 0, "expected successful migrate run");
    assert_eq!(parse_payload(&result.output)["status"], "ok");

    let after = doctor::run(&config);
    assert_eq!(after.exit_code, 0, "doctor should pass after migrate");
    let payload = parse_payload(&after.output);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["checks"].as_array().map(Vec::len), Some(3));
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);

    let first = seed::run(&config);
    assert_eq!(first.exit_code, 0, "expected first seed invocation success");
    let first_payload = parse_payload(&first.output);
    assert_eq!(first_payload["status"], "ok");
    assert_eq!(first_payload["data"]["products"], 7);

    let second = seed::run(&config);
    assert_eq!(second.exit_code, 0, "expected second seed invocation success");
    let second_payload = parse_payload(&second.output);
    assert_eq!(first_payload["data"], second_payload["data"]);
}

#[test]
fn recommend_returns_scored_results_from_the_seeded_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);
    assert_eq!(seed::run(&config).exit_code, 0);

    let result = recommend::run(
        &config,
        RecommendCommand::BoughtTogether {
            product_id: "sku-solar-panel".to_string(),
            min_co_occurrence: None,
            min_confidence: None,
            max_results: None,
        },
    );
    assert_eq!(result.exit_code, 0, "expected recommendation success");
    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "recommend.bought_together");
    let data = payload["data"].as_array().expect("results array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "sku-power-bank");

    let cart = recommend::run(
        &config,
        RecommendCommand::Cart {
            product_ids: vec!["sku-solar-panel".to_string()],
            limit: Some(3),
            exclude: vec![],
        },
    );
    assert_eq!(cart.exit_code, 0);
    assert_eq!(parse_payload(&cart.output)["command"], "recommend.cart");
}

#[test]
fn recommend_rejects_out_of_range_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);
    assert_eq!(migrate::run(&config).exit_code, 0);

    let result = recommend::run(
        &config,
        RecommendCommand::BoughtTogether {
            product_id: "sku-solar-panel".to_string(),
            min_co_occurrence: None,
            min_confidence: Some(2.0),
            max_results: None,
        },
    );
    assert_eq!(result.exit_code, 2, "expected invalid options failure");
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_options");
}

#[test]
fn track_then_stats_round_trips_the_counters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);
    assert_eq!(migrate::run(&config).exit_code, 0);

    for _ in 0..2 {
        let result = track::run(
            &config,
            TrackArgs {
                product_id: "sku-solar-panel".to_string(),
                recommended_product_id: "sku-power-bank".to_string(),
                event: "conversion".to_string(),
                recommendation_type: "frequently_bought_together".to_string(),
                user: Some("user-alice".to_string()),
                metadata: None,
            },
        );
        assert_eq!(result.exit_code, 0, "expected track success");
    }

    let result = stats::run(
        &config,
        StatsArgs {
            product_id: "sku-solar-panel".to_string(),
            recommended_product_id: "sku-power-bank".to_string(),
            recommendation_type: "frequently_bought_together".to_string(),
        },
    );
    assert_eq!(result.exit_code, 0);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["conversions"], 2);
    assert_eq!(payload["data"]["views"], 0);
}

#[test]
fn track_rejects_unknown_event_type() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_for(&dir);

    let result = track::run(
        &config,
        TrackArgs {
            product_id: "p1".to_string(),
            recommended_product_id: "p2".to_string(),
            event: "purchase".to_string(),
            recommendation_type: "frequently_bought_together".to_string(),
            user: None,
            metadata: None,
        },
    );
    assert_eq!(result.exit_code, 2, "expected invalid options failure");
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_options");
}
