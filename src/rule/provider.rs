//! 规则提供者
//! 按主机名查询规则集，支持子域名继承父域名规则、全局规则合并与热替换

use std::path::Path;
use std::sync::RwLock;

use tracing::debug;

use super::model::{RuleSet, RuleTable};
use crate::error::{MarretaError, MarretaResult};
use crate::utils::normalize_domain;

/// 规则查询接口
pub trait RuleProvider: Send + Sync {
    /// 主机（或其父域名）是否存在专属规则
    fn has_rules(&self, host: &str) -> bool;

    /// 主机的有效规则集（全局规则 + 父域名 + 自身，越具体优先级越高）
    fn rules(&self, host: &str) -> RuleSet;
}

/// 基于 JSON 规则表的提供者
#[derive(Debug, Default)]
pub struct JsonRuleProvider {
    table: RwLock<RuleTable>,
}

impl JsonRuleProvider {
    /// 空规则表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由规则表创建，域名键统一规范化
    pub fn new(table: RuleTable) -> Self {
        Self {
            table: RwLock::new(normalize_table(table)),
        }
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(json: &str) -> MarretaResult<Self> {
        let table: RuleTable = serde_json::from_str(json)
            .map_err(|e| MarretaError::RuleParseError(format!("规则表反序列化失败：{}", e)))?;
        Ok(Self::new(table))
    }

    /// 从本地 JSON 文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> MarretaResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MarretaError::RuleLoadError(format!("{}：{}", path.display(), e)))?;
        let provider = Self::from_json_str(&data)?;
        debug!("规则表加载成功：{}，域名规则数：{}", path.display(), provider.domain_count());
        Ok(provider)
    }

    /// 热替换整张规则表
    pub fn replace_table(&self, table: RuleTable) {
        let mut guard = self.table.write().unwrap_or_else(|e| e.into_inner());
        *guard = normalize_table(table);
    }

    /// 新增或覆盖单个域名的规则
    pub fn insert_domain(&self, domain: &str, rules: RuleSet) {
        let mut guard = self.table.write().unwrap_or_else(|e| e.into_inner());
        guard.domains.insert(normalize_domain(domain), rules);
    }

    /// 域名规则数量
    pub fn domain_count(&self) -> usize {
        self.table.read().unwrap_or_else(|e| e.into_inner()).domains.len()
    }
}

impl RuleProvider for JsonRuleProvider {
    fn has_rules(&self, host: &str) -> bool {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        domain_chain(host).iter().any(|d| table.domains.contains_key(d))
    }

    fn rules(&self, host: &str) -> RuleSet {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());

        // 由父域名到子域名依次合并
        let mut specific = RuleSet::default();
        for domain in domain_chain(host).iter().rev() {
            if let Some(rules) = table.domains.get(domain) {
                specific.merge(rules);
            }
        }

        let mut effective = table.global.without(&specific.exclude_global_rules);
        effective.merge(&specific);
        effective
    }
}

fn normalize_table(table: RuleTable) -> RuleTable {
    RuleTable {
        global: table.global,
        domains: table
            .domains
            .into_iter()
            .map(|(domain, rules)| (normalize_domain(&domain), rules))
            .collect(),
    }
}

/// 主机及其各级父域名（至少保留两级），从具体到宽泛
/// `a.valor.globo.com` → [`a.valor.globo.com`, `valor.globo.com`, `globo.com`]
fn domain_chain(host: &str) -> Vec<String> {
    let normalized = normalize_domain(host);
    let labels: Vec<&str> = normalized.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return if normalized.is_empty() { Vec::new() } else { vec![normalized] };
    }
    (0..=labels.len() - 2).map(|i| labels[i..].join(".")).collect()
}
