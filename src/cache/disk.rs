//! 磁盘缓存
//! 每个URL一个 MessagePack 文件，文件名为URL的 SHA-256 十六进制摘要

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rmp_serde::{Serializer, from_slice};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::ContentCache;
use crate::error::{MarretaError, MarretaResult};

/// 缓存文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub url: String,
    pub stored_at: DateTime<Utc>,
    pub body: String,
}

/// 目录型磁盘缓存
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// 创建缓存，目录不存在时自动创建
    pub async fn new(dir: impl Into<PathBuf>) -> MarretaResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// URL 对应的缓存文件路径
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.mp", hex::encode(digest)))
    }

    async fn load_record(&self, url: &str) -> MarretaResult<Option<CacheRecord>> {
        let path = self.path_for(url);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // MessagePack反序列化
        let record: CacheRecord = from_slice(&data)
            .map_err(|e| MarretaError::MsgPackError(format!("反序列化失败：{}", e)))?;

        // 摘要碰撞或文件被替换时视为未命中
        if record.url != url {
            warn!("缓存文件URL不匹配：期望 {}，实际 {}", url, record.url);
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// 清除单个URL的缓存
    pub async fn remove(&self, url: &str) -> MarretaResult<()> {
        let path = self.path_for(url);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentCache for DiskCache {
    async fn exists(&self, url: &str) -> bool {
        tokio::fs::try_exists(self.path_for(url)).await.unwrap_or(false)
    }

    async fn get(&self, url: &str) -> MarretaResult<Option<String>> {
        Ok(self.load_record(url).await?.map(|record| record.body))
    }

    async fn set(&self, url: &str, raw_html: &str) -> MarretaResult<()> {
        let record = CacheRecord {
            url: url.to_string(),
            stored_at: Utc::now(),
            body: raw_html.to_string(),
        };

        // MessagePack序列化
        let mut data = Vec::new();
        record
            .serialize(&mut Serializer::new(&mut data))
            .map_err(|e| MarretaError::MsgPackError(format!("序列化失败：{}", e)))?;

        // 先写临时文件再重命名，避免并发读到半个文件
        let path = self.path_for(url);
        // 临时文件名每次写入唯一，同一URL的并发写入互不干扰
        let tmp = path.with_extension(format!("mp.{}.{:016x}.tmp", std::process::id(), rand::random::<u64>()));
        let written = match tokio::fs::write(&tmp, &data).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("原始HTML已缓存：{}，{} 字节", url, data.len());
        Ok(())
    }
}
