//! 缓存模块：URL → 原始（未处理）HTML
//! 处理后的内容从不缓存，命中后总是按当前规则重新处理
pub mod disk;
pub mod memory;

use async_trait::async_trait;

use crate::error::MarretaResult;

pub use self::disk::DiskCache;
pub use self::memory::MemoryCache;

/// 原始HTML缓存接口
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// 是否存在该URL的缓存
    async fn exists(&self, url: &str) -> bool;

    /// 读取原始HTML
    async fn get(&self, url: &str) -> MarretaResult<Option<String>>;

    /// 写入原始HTML
    async fn set(&self, url: &str, raw_html: &str) -> MarretaResult<()>;
}
