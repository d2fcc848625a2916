//! 内容处理模块：对原始HTML应用固定结构变换与域名规则，输出可渲染的HTML
//!
//! 变换顺序固定（后续步骤依赖前序结果）：
//! 1. 替换 canonical 链接
//! 2. 相对URL改写为绝对URL
//! 3. 应用域名规则（注入 / 删除元素 / 删除属性）
//! 4. 清理内联样式中的遮挡属性
//! 5. 注入品牌栏
//! 6. 调试模式下注入已激活规则面板
pub mod overlay;
pub mod rules;
pub mod styles;
pub mod urls;

use std::fmt;
use std::sync::Arc;

use dom_query::Document;
use serde::Serialize;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::error::{AnalysisResult, AnalyzerError, ErrorKind};
use crate::rule::RuleProvider;

/// 单次分析内已触发的规则（按触发顺序），仅用于诊断展示
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivatedRules(Vec<String>);

impl ActivatedRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl Into<String>) {
        self.0.push(rule.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.0.iter().any(|r| r == rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ActivatedRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// 内容处理器
#[derive(Clone)]
pub struct ContentProcessor {
    rules: Arc<dyn RuleProvider>,
    config: Arc<GlobalConfig>,
}

impl ContentProcessor {
    pub fn new(rules: Arc<dyn RuleProvider>, config: Arc<GlobalConfig>) -> Self {
        Self { rules, config }
    }

    /// 处理原始HTML
    /// 内容过短（错误页 / 空壳）时返回 ContentError
    pub fn process(
        &self,
        raw_html: &str,
        host: &str,
        url: &str,
        activated: &mut ActivatedRules,
    ) -> AnalysisResult<String> {
        if raw_html.len() < self.config.min_content_length {
            debug!("内容过短：{}，{} 字节", url, raw_html.len());
            return Err(AnalyzerError::of(ErrorKind::ContentError));
        }

        let doc = Document::from(raw_html);
        let domain_rules = self.rules.rules(host);

        urls::replace_canonical(&doc, url);
        urls::fix_relative_urls(&doc, url);
        rules::apply_rules(&doc, &domain_rules, activated);
        styles::clean_inline_styles(&doc);
        overlay::add_brand_bar(&doc, url, &self.config.site_url);
        if self.config.debug {
            overlay::add_debug_panel(&doc, activated);
        }

        Ok(doc.html().to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::build_html;
    use super::*;
    use crate::rule::{JsonRuleProvider, RuleSet};

    fn processor(rules: RuleSet, debug: bool) -> ContentProcessor {
        let provider = JsonRuleProvider::empty();
        provider.insert_domain("valor.globo.com", rules);
        let config = crate::ConfigManager::custom()
            .debug(debug)
            .site_url("https://bypass.example")
            .build();
        ContentProcessor::new(Arc::new(provider), Arc::new(config))
    }

    #[test]
    fn test_short_content_is_rejected_regardless_of_rules() {
        let rules = RuleSet {
            contains_element_remove: vec!["paywall".into()],
            ..Default::default()
        };
        let mut activated = ActivatedRules::new();
        let err = processor(rules, false)
            .process("<html><body>tiny</body></html>", "valor.globo.com", "https://valor.globo.com/a", &mut activated)
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ContentError);
        assert!(activated.is_empty());
    }

    #[test]
    fn test_contains_rule_removes_elements() {
        let rules = RuleSet {
            contains_element_remove: vec!["paywall".into(), "piano".into()],
            ..Default::default()
        };
        let html = build_html(
            r#"<div class="content">ok</div><div class="article-paywall-wrapper">hidden</div><section id="piano-overlay">overlay</section>"#,
        );
        let mut activated = ActivatedRules::new();
        let result = processor(rules, false)
            .process(&html, "valor.globo.com", "https://valor.globo.com/a", &mut activated)
            .unwrap();

        assert!(result.contains(r#"class="content""#));
        assert!(!result.contains("article-paywall-wrapper"));
        assert!(!result.contains("piano-overlay"));
        assert_eq!(
            activated.iter().filter(|r| *r == "containsElementRemove: paywall").count(),
            1
        );
        assert!(activated.contains("containsElementRemove: piano"));
    }

    #[test]
    fn test_custom_style_and_code_are_injected() {
        let rules = RuleSet {
            custom_style: Some(".paywall { display: none; }".into()),
            custom_code: Some("window.__bypass_test = true;".into()),
            ..Default::default()
        };
        let html = build_html(r#"<div class="content">ok</div>"#);
        let mut activated = ActivatedRules::new();
        let result = processor(rules, false)
            .process(&html, "valor.globo.com", "https://valor.globo.com/a", &mut activated)
            .unwrap();

        assert!(result.contains(".paywall { display: none; }"));
        assert!(result.contains("window.__bypass_test = true;"));
        assert!(activated.contains("customStyle"));
    }

    #[test]
    fn test_pipeline_canonical_brand_bar_and_debug_panel() {
        let html = build_html(
            r#"<link rel="canonical" href="https://web.archive.org/x"><img src="/x.png"><p style="color: red; overflow: hidden">t</p>"#,
        );
        let mut activated = ActivatedRules::new();
        let result = processor(RuleSet::default(), true)
            .process(&html, "site.example", "https://site.example/a/b", &mut activated)
            .unwrap();

        assert!(!result.contains("https://web.archive.org/x"));
        assert!(result.contains(r#"href="https://site.example/a/b""#));
        assert!(result.contains(r#"src="https://site.example/x.png""#));
        assert!(result.contains(r#"style="color: red""#));
        assert!(result.contains("https://bypass.example"));
        assert!(result.contains(overlay::NO_RULES_PLACEHOLDER));
    }

    #[test]
    fn test_debug_panel_absent_without_debug() {
        let html = build_html("<p>t</p>");
        let mut activated = ActivatedRules::new();
        let result = processor(RuleSet::default(), false)
            .process(&html, "site.example", "https://site.example/", &mut activated)
            .unwrap();
        assert!(!result.contains(overlay::NO_RULES_PLACEHOLDER));
    }
}
