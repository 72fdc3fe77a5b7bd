//! SQLite adapter for the shoprec recommendation core.
//!
//! Implements the core's data access port with sqlx, owns the embedded
//! migrations, and ships deterministic demo fixtures.

pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{seed_demo_catalog, SeedSummary};
pub use store::SqlRecommendationStore;
