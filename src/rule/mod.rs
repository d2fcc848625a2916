//! 规则模块：规则数据模型与按域名的规则查询
pub mod model;
pub mod provider;

// 导出核心接口
pub use self::model::{BrowserEngine, FetchStrategy, RuleSet, RuleTable};
pub use self::provider::{JsonRuleProvider, RuleProvider};
