use std::sync::Arc;

use anyhow::Context;
use sqlx::MySqlPool;

use crate::{
    config::Config,
    store::{MemoryStore, MySqlStore, SchoolStore},
};

/// Opens the configured backend. MySQL gets the bundled migrations applied
/// before the first request is served.
pub async fn init_store(config: &Config) -> anyhow::Result<Arc<dyn SchoolStore>> {
    if config.uses_memory_store() {
        tracing::warn!("DATABASE_URL selects the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = MySqlPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database ready");
    Ok(Arc::new(MySqlStore::new(pool)))
}
