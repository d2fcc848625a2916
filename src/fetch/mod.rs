//! 抓取模块：状态探测 + 三种可互换的抓取器
pub mod client;
pub mod direct;
pub mod identity;
pub mod status;
pub mod wayback;
pub mod webdriver;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GlobalConfig;
use crate::error::{FetchError, MarretaResult};
use crate::rule::{BrowserEngine, FetchStrategy, RuleSet};

pub use self::direct::DirectFetcher;
pub use self::status::{StatusChecker, StatusInfo, StatusProbe};
pub use self::wayback::WaybackFetcher;
pub use self::webdriver::WebDriverFetcher;

/// 单次抓取的输入
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub rules: &'a RuleSet,
    pub engine: BrowserEngine,
}

/// 抓取结果：有内容 / 成功但为空
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Content(String),
    Empty,
}

impl FetchOutcome {
    /// 空白内容归一为 Empty
    pub fn from_body(body: String) -> Self {
        if body.trim().is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Content(body)
        }
    }
}

/// 抓取器接口
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, FetchError>;
}

/// 三种抓取策略对应的抓取器
#[derive(Clone)]
pub struct FetcherSet {
    pub direct: Arc<dyn Fetcher>,
    pub wayback: Arc<dyn Fetcher>,
    pub browser: Arc<dyn Fetcher>,
}

impl FetcherSet {
    /// 基于配置构建默认的 HTTP 抓取器
    pub fn from_config(config: &GlobalConfig) -> MarretaResult<Self> {
        Ok(Self {
            direct: Arc::new(DirectFetcher::new(config)?),
            wayback: Arc::new(WaybackFetcher::new(config)?),
            browser: Arc::new(WebDriverFetcher::new(config)?),
        })
    }

    pub fn get(&self, strategy: FetchStrategy) -> &Arc<dyn Fetcher> {
        match strategy {
            FetchStrategy::Direct => &self.direct,
            FetchStrategy::Wayback => &self.wayback,
            FetchStrategy::Browser => &self.browser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_body() {
        assert_eq!(FetchOutcome::from_body("  \n".into()), FetchOutcome::Empty);
        assert_eq!(
            FetchOutcome::from_body("<html/>".into()),
            FetchOutcome::Content("<html/>".into())
        );
    }
}
