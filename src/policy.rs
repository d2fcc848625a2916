//! 访问策略：封锁域名、DMCA 下架列表、受限关键词
//! 全部检查在任何网络请求之前完成

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarretaError, MarretaResult};
use crate::utils::{is_domain_match, normalize_domain};

/// DMCA 下架条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmcaEntry {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 拒绝访问列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DenyLists {
    pub blocked_domains: HashSet<String>,
    pub dmca_domains: Vec<DmcaEntry>,
    pub restricted_keywords: Vec<String>,
}

impl DenyLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(json: &str) -> MarretaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从本地 JSON 文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> MarretaResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MarretaError::InvalidInput(format!("{}：{}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    pub fn block_domain(mut self, host: impl Into<String>) -> Self {
        self.blocked_domains.insert(host.into().to_ascii_lowercase());
        self
    }

    pub fn dmca(mut self, host: impl Into<String>, message: Option<String>) -> Self {
        self.dmca_domains.push(DmcaEntry { host: host.into(), message });
        self
    }

    pub fn restrict_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.restricted_keywords.push(keyword.into());
        self
    }

    /// URL 是否包含受限关键词（不区分大小写）
    pub fn is_restricted(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.restricted_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lowered.contains(&k))
    }

    /// 匹配 DMCA 条目：精确主机或其子域名
    pub fn dmca_match(&self, host: &str) -> Option<&DmcaEntry> {
        self.dmca_domains.iter().find(|entry| {
            let target = normalize_domain(&entry.host);
            !target.is_empty() && is_domain_match(host, &target)
        })
    }

    /// 主机是否在封锁列表中（精确匹配）
    pub fn is_blocked(&self, host: &str) -> bool {
        self.blocked_domains.iter().any(|d| d.trim().eq_ignore_ascii_case(host))
    }
}
