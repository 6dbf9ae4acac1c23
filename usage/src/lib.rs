use std::sync::Arc;

use common::{
    env_config::{Config, UsageStoreConfig},
    error::Res,
};

pub mod accountant;
pub mod clock;
pub mod counter;
pub mod period;

pub mod stores {
    pub mod memory;
    pub mod postgres;
    pub mod redis;
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use accountant::UsageAccountant;
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{Increment, UsageCounter, UsageStore};

/// Connects the usage store selected by `USAGE_STORE`.
pub async fn setup_store(config: &Config) -> Res<Arc<dyn UsageStore>> {
    let store: Arc<dyn UsageStore> = match &config.usage_store {
        UsageStoreConfig::Memory => {
            log::warn!("Usage counters are kept in process memory and will not survive a restart");
            Arc::new(stores::memory::MemoryStore::new())
        }
        UsageStoreConfig::Redis { url } => Arc::new(stores::redis::RedisStore::connect(url).await?),
        UsageStoreConfig::Postgres { url } => {
            let pool = db::setup(url, config.is_production()).await?;
            Arc::new(stores::postgres::PostgresStore::new(pool))
        }
    };
    log::info!("Usage store ready: {}", config.usage_store);
    Ok(store)
}
