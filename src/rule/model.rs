//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Deserialize, Serialize};

/// 抓取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchStrategy {
    /// 直接HTTP抓取
    #[serde(rename = "fetchContent")]
    Direct,
    /// Wayback Machine 归档快照
    #[serde(rename = "fetchFromWaybackMachine")]
    Wayback,
    /// 无头浏览器渲染
    #[serde(rename = "fetchFromSelenium")]
    Browser,
}

impl FetchStrategy {
    /// 默认回退顺序：直接抓取 → 归档 → 浏览器（最昂贵，放最后）
    pub const FALLBACK_ORDER: [FetchStrategy; 3] =
        [FetchStrategy::Direct, FetchStrategy::Wayback, FetchStrategy::Browser];

    /// 稳定标识，写入已激活规则
    pub fn id(&self) -> &'static str {
        match self {
            FetchStrategy::Direct => "fetchContent",
            FetchStrategy::Wayback => "fetchFromWaybackMachine",
            FetchStrategy::Browser => "fetchFromSelenium",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 浏览器引擎
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    #[default]
    Firefox,
    Chrome,
}

impl BrowserEngine {
    /// WebDriver capabilities 中的 browserName
    pub fn browser_name(&self) -> &'static str {
        match self {
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Chrome => "chrome",
        }
    }
}

/// 单个域名的规则集合，缺省字段表示该规则不适用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    // 元素处理规则
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class_attr_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_elements_by_tag: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_element_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class_element_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contains_element_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub script_tag_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_custom_attr: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookie_prefix_remove: Vec<String>,

    // 注入规则
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_code: Option<String>,

    // 抓取规则
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_strategies: Option<FetchStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngine>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    // 值为 null 表示不发送该 Cookie
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    // 从全局规则中排除的条目：规则类型 → 值列表
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exclude_global_rules: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    /// 按规则类型名获取列表字段
    pub fn list_mut(&mut self, kind: &str) -> Option<&mut Vec<String>> {
        match kind {
            "classAttrRemove" => Some(&mut self.class_attr_remove),
            "removeElementsByTag" => Some(&mut self.remove_elements_by_tag),
            "idElementRemove" => Some(&mut self.id_element_remove),
            "classElementRemove" => Some(&mut self.class_element_remove),
            "containsElementRemove" => Some(&mut self.contains_element_remove),
            "scriptTagRemove" => Some(&mut self.script_tag_remove),
            "removeCustomAttr" => Some(&mut self.remove_custom_attr),
            "cookiePrefixRemove" => Some(&mut self.cookie_prefix_remove),
            _ => None,
        }
    }

    /// 合并更具体的规则：列表去重追加，标量与映射由 specific 覆盖
    pub fn merge(&mut self, specific: &RuleSet) {
        extend_unique(&mut self.class_attr_remove, &specific.class_attr_remove);
        extend_unique(&mut self.remove_elements_by_tag, &specific.remove_elements_by_tag);
        extend_unique(&mut self.id_element_remove, &specific.id_element_remove);
        extend_unique(&mut self.class_element_remove, &specific.class_element_remove);
        extend_unique(&mut self.contains_element_remove, &specific.contains_element_remove);
        extend_unique(&mut self.script_tag_remove, &specific.script_tag_remove);
        extend_unique(&mut self.remove_custom_attr, &specific.remove_custom_attr);
        extend_unique(&mut self.cookie_prefix_remove, &specific.cookie_prefix_remove);

        if specific.custom_style.is_some() {
            self.custom_style = specific.custom_style.clone();
        }
        if specific.custom_code.is_some() {
            self.custom_code = specific.custom_code.clone();
        }
        if specific.fetch_strategies.is_some() {
            self.fetch_strategies = specific.fetch_strategies;
        }
        if specific.browser.is_some() {
            self.browser = specific.browser;
        }
        if specific.referer.is_some() {
            self.referer = specific.referer.clone();
        }
        if specific.user_agent.is_some() {
            self.user_agent = specific.user_agent.clone();
        }
        self.headers.extend(specific.headers.clone());
        self.cookies.extend(specific.cookies.clone());
        for (kind, values) in &specific.exclude_global_rules {
            let entry = self.exclude_global_rules.entry(kind.clone()).or_default();
            extend_unique(entry, values);
        }
    }

    /// 从当前（全局）规则中剔除被排除的条目
    pub fn without(&self, excluded: &BTreeMap<String, Vec<String>>) -> RuleSet {
        let mut filtered = self.clone();
        for (kind, values) in excluded {
            if let Some(list) = filtered.list_mut(kind) {
                list.retain(|v| !values.contains(v));
            }
        }
        filtered
    }
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// 完整规则表：全局规则 + 按域名的规则
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleTable {
    pub global: RuleSet,
    pub domains: HashMap<String, RuleSet>,
}
