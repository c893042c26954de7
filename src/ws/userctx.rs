use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::clients::{ClientError, UserDirectory};

/// Display names looked up in the user directory, cached per editor id.
///
/// Only names are cached here. Permission decisions are always asked fresh.
pub struct UserCtxCache {
    cache: Cache<String, String>,
    directory: Arc<dyn UserDirectory>,
}

impl UserCtxCache {
    pub fn new(directory: Arc<dyn UserDirectory>, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(time_to_idle)
            .build();
        info!("User cache initialized");
        Self { cache, directory }
    }

    pub async fn get_or_fetch_username(&self, editor_id: &str) -> Result<Option<String>, ClientError> {
        if let Some(username) = self.cache.get(editor_id).await {
            return Ok(Some(username));
        }

        info!("User cache miss for editor {}. Asking the user directory.", editor_id);
        let fetched = self.directory.username(editor_id).await.map_err(|e| {
            error!("Failed to look up editor {}: {}", editor_id, e);
            e
        })?;

        if let Some(username) = &fetched {
            self.cache.insert(editor_id.to_string(), username.clone()).await;
        }
        Ok(fetched)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
