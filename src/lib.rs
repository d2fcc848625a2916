//! marreta - 付费墙绕过抓取编排与基于域名规则的HTML重写引擎

// 导出全局错误类型
pub use self::error::{
    AnalysisResult, AnalyzerError, ErrorKind, FetchError, MarretaError, MarretaResult,
};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{BrowserEngine, FetchStrategy, JsonRuleProvider, RuleProvider, RuleSet, RuleTable};

// 导出访问策略与事件日志
pub use self::logger::{AnalysisEvent, EventLogger, TracingEventLogger};
pub use self::policy::{DenyLists, DmcaEntry};

// 导出缓存、抓取、处理模块核心接口
pub use self::cache::{ContentCache, DiskCache, MemoryCache};
pub use self::extractor::TextExtractor;
pub use self::fetch::{
    DirectFetcher, FetchOutcome, FetchRequest, Fetcher, FetcherSet, StatusChecker, StatusInfo,
    StatusProbe, WaybackFetcher, WebDriverFetcher,
};
pub use self::processor::{ActivatedRules, ContentProcessor};

// 导出分析入口
pub use self::analyzer::{AnalysisOutcome, UrlAnalyzer, UrlAnalyzerBuilder};

// 导出工具函数
pub use self::utils::{host_of, is_domain_match, normalize_domain};

// 声明所有子模块
pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod logger;
pub mod policy;
pub mod processor;
pub mod rule;
pub mod utils;
