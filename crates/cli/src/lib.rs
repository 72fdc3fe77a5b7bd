pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use shoprec_core::config::{AppConfig, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "shoprec",
    about = "Shoprec recommendation operator CLI",
    long_about = "Operate the shoprec recommendation store: migrations, demo fixtures, \
                  strategy queries, and event tracking.",
    after_help = "Examples:\n  shoprec migrate\n  shoprec seed\n  shoprec recommend bought-together sku-solar-panel\n  shoprec track sku-solar-panel sku-power-bank --event click --type frequently_bought_together"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to shoprec.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the database URL")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and order history")]
    Seed,
    #[command(about = "Validate configuration and probe database readiness")]
    Doctor,
    #[command(subcommand, about = "Compute recommendations with one of the strategies")]
    Recommend(RecommendCommand),
    #[command(about = "Record a view/click/conversion event for a shown recommendation")]
    Track(TrackArgs),
    #[command(about = "Read the aggregated counters for one recommendation pairing")]
    Stats(StatsArgs),
}

#[derive(Debug, Subcommand)]
pub enum RecommendCommand {
    #[command(about = "Products frequently bought together with a product")]
    BoughtTogether {
        product_id: String,
        #[arg(long, help = "Co-occurrence count a candidate must strictly exceed")]
        min_co_occurrence: Option<u32>,
        #[arg(long, help = "Confidence floor within 0.0..=1.0")]
        min_confidence: Option<f64>,
        #[arg(long, help = "Maximum number of candidates")]
        max_results: Option<usize>,
    },
    #[command(about = "Personalized recommendations from a user's order history")]
    Personalized {
        user_id: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, help = "Confidence floor within 0.0..=1.0")]
        min_score: Option<f64>,
        #[arg(long, help = "Product ids to exclude (repeatable)")]
        exclude: Vec<String>,
    },
    #[command(about = "Personalized recommendations via the order-history entry point")]
    OrderHistory {
        user_id: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, help = "Confidence floor within 0.0..=1.0")]
        min_score: Option<f64>,
        #[arg(long, help = "Product ids to exclude (repeatable)")]
        exclude: Vec<String>,
    },
    #[command(about = "Newest active products in a category")]
    Category {
        category: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, help = "Product ids to exclude (repeatable)")]
        exclude: Vec<String>,
    },
    #[command(about = "Recommendations for the current cart contents")]
    Cart {
        #[arg(help = "Product ids currently in the cart")]
        product_ids: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, help = "Product ids to exclude (repeatable)")]
        exclude: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    pub product_id: String,
    pub recommended_product_id: String,
    #[arg(long, help = "view | click | conversion")]
    pub event: String,
    #[arg(long = "type", help = "Strategy that produced the recommendation")]
    pub recommendation_type: String,
    #[arg(long, help = "User the event belongs to")]
    pub user: Option<String>,
    #[arg(long, help = "Opaque JSON metadata attached to the event")]
    pub metadata: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    pub product_id: String,
    pub recommended_product_id: String,
    #[arg(long = "type", help = "Strategy that produced the recommendation")]
    pub recommendation_type: String,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        database_url: cli.database_url.clone(),
        log_level: cli.log_level.clone(),
    };
    let config = match AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: false,
        overrides,
    }) {
        Ok(config) => config,
        Err(error) => {
            let result = commands::CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
            println!("{}", result.output);
            return ExitCode::from(result.exit_code);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&config),
        Command::Seed => commands::seed::run(&config),
        Command::Doctor => commands::doctor::run(&config),
        Command::Recommend(strategy) => commands::recommend::run(&config, strategy),
        Command::Track(args) => commands::track::run(&config, args),
        Command::Stats(args) => commands::stats::run(&config, args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    use shoprec_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
