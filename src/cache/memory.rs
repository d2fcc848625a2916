//! 进程内缓存

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ContentCache;
use crate::error::MarretaResult;

/// 基于 HashMap 的内存缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentCache for MemoryCache {
    async fn exists(&self, url: &str) -> bool {
        self.entries.read().await.contains_key(url)
    }

    async fn get(&self, url: &str) -> MarretaResult<Option<String>> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn set(&self, url: &str, raw_html: &str) -> MarretaResult<()> {
        self.entries
            .write()
            .await
            .insert(url.to_string(), raw_html.to_string());
        Ok(())
    }
}
