pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod models;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod verses;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the songs API using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).await?.run().await
}
