pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod validate;

use std::sync::Arc;

use chama_common::SnowflakeGenerator;
use config::Config;
use db::kv::{KeyValueStore, MemoryStore};
use db::pool::DbPool;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub kv: Arc<dyn KeyValueStore>,
    pub config: Arc<Config>,
    pub snowflake: Arc<SnowflakeGenerator>,
}

impl AppState {
    /// Build state with a lazily-connecting pool and an in-memory session store.
    pub fn new(config: Config) -> Self {
        let db = db::pool::connect(&config.database_url, config.database_pool_size);
        let snowflake = SnowflakeGenerator::new(0).expect("worker 0 is always valid");

        Self {
            db,
            kv: Arc::new(MemoryStore::new()),
            config: Arc::new(config),
            snowflake: Arc::new(snowflake),
        }
    }
}
