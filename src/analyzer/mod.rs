//! URL分析器：访问策略检查 → 缓存 → 状态探测 → 抓取回退链 → 内容处理
//!
//! 所有协作者均以 trait 对象注入，`UrlAnalyzer` 自身无可变状态，
//! 已激活规则按调用隔离，可在多个任务间共享同一实例。
pub mod paywall;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{ContentCache, DiskCache, MemoryCache};
use crate::config::GlobalConfig;
use crate::error::{
    classify_escaped, classify_exhausted, AnalysisResult, AnalyzerError, ErrorKind, MarretaResult,
};
use crate::fetch::{FetchOutcome, FetchRequest, FetcherSet, StatusChecker, StatusInfo, StatusProbe};
use crate::logger::{AnalysisEvent, EventLogger, TracingEventLogger};
use crate::policy::DenyLists;
use crate::processor::{ActivatedRules, ContentProcessor};
use crate::rule::{BrowserEngine, FetchStrategy, JsonRuleProvider, RuleProvider, RuleSet};
use crate::utils::host_of;

pub use self::paywall::validate_hard_paywall;

/// 单次分析的结果
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// 处理后的HTML
    pub content: String,
    /// 本次调用中触发的规则（按顺序）
    pub activated_rules: ActivatedRules,
    /// 是否由缓存的原始HTML生成
    pub from_cache: bool,
    /// 产出内容的抓取策略，缓存命中时为 None
    pub strategy: Option<FetchStrategy>,
}

/// URL分析器
pub struct UrlAnalyzer {
    config: Arc<GlobalConfig>,
    rules: Arc<dyn RuleProvider>,
    cache: Arc<dyn ContentCache>,
    fetchers: FetcherSet,
    probe: Arc<dyn StatusProbe>,
    deny_lists: Arc<DenyLists>,
    events: Arc<dyn EventLogger>,
    processor: ContentProcessor,
}

impl UrlAnalyzer {
    pub fn builder(config: GlobalConfig) -> UrlAnalyzerBuilder {
        UrlAnalyzerBuilder::new(config)
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 探测URL状态（HEAD）
    pub async fn check_status(&self, url: &str) -> StatusInfo {
        self.probe.check_status(url).await
    }

    /// 分析URL，仅返回处理后的HTML
    pub async fn analyze_html(&self, url: &str) -> AnalysisResult<String> {
        self.analyze(url).await.map(|outcome| outcome.content)
    }

    /// 分析URL
    pub async fn analyze(&self, url: &str) -> AnalysisResult<AnalysisOutcome> {
        let host = host_of(url).ok_or_else(|| AnalyzerError::of(ErrorKind::InvalidUrl))?;

        if self.deny_lists.is_restricted(url) {
            self.events.log_event(url, AnalysisEvent::RestrictedUrl, None);
            return Err(AnalyzerError::of(ErrorKind::RestrictedUrl));
        }

        // DMCA 检查先于任何缓存或网络访问
        if let Some(entry) = self.deny_lists.dmca_match(&host) {
            self.events.log_event(url, AnalysisEvent::DmcaDomain, None);
            return Err(AnalyzerError::with_message(
                ErrorKind::DmcaDomain,
                entry.message.clone().unwrap_or_default(),
            ));
        }

        let mut activated = ActivatedRules::new();

        if let Some(raw) = self.cached_raw(url).await {
            debug!("缓存命中：{}", url);
            let content = self.render(&raw, &host, url, &mut activated)?;
            return Ok(AnalysisOutcome {
                content,
                activated_rules: activated,
                from_cache: true,
                strategy: None,
            });
        }

        if self.deny_lists.is_blocked(&host) {
            self.events.log_event(url, AnalysisEvent::BlockedDomain, None);
            return Err(AnalyzerError::of(ErrorKind::BlockedDomain));
        }

        // 有专属规则的站点跳过状态探测（常对爬虫返回非 200）
        if !self.rules.has_rules(&host) {
            let status = self.probe.check_status(url).await;
            if status.http_code != 200 {
                let detail = format!("HTTP {}", status.http_code);
                self.events.log_event(url, AnalysisEvent::InvalidStatusCode, Some(&detail));
                return Err(match status.http_code {
                    404 => AnalyzerError::of(ErrorKind::NotFound),
                    code => AnalyzerError::new(ErrorKind::HttpError, code.to_string()),
                });
            }
        }

        let rules = self.rules.rules(&host);
        self.fetch_chain(url, &host, &rules, activated).await
    }

    /// 读取缓存；读失败按未命中处理
    async fn cached_raw(&self, url: &str) -> Option<String> {
        if !self.cache.exists(url).await {
            return None;
        }
        match self.cache.get(url).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("缓存读取失败，按未命中处理：{}，{}", url, e);
                None
            }
        }
    }

    /// 首选策略（如有）→ 默认回退链
    async fn fetch_chain(
        &self,
        url: &str,
        host: &str,
        rules: &RuleSet,
        mut activated: ActivatedRules,
    ) -> AnalysisResult<AnalysisOutcome> {
        if let Some(preferred) = rules.fetch_strategies {
            let request = FetchRequest {
                url,
                rules,
                engine: rules.browser.unwrap_or_default(),
            };
            match self.fetchers.get(preferred).fetch(request).await {
                Ok(FetchOutcome::Content(raw)) => {
                    return match self.accept(url, host, preferred, raw, &mut activated).await {
                        Ok(content) => Ok(AnalysisOutcome {
                            content,
                            activated_rules: activated,
                            from_cache: false,
                            strategy: Some(preferred),
                        }),
                        Err(e) => {
                            self.events
                                .log_event(url, AnalysisEvent::StrategyError(preferred), Some(&e.message));
                            Err(e)
                        }
                    };
                }
                Ok(FetchOutcome::Empty) => debug!("首选策略 {} 返回空内容，继续默认回退链：{}", preferred, url),
                // 首选策略失败不再回退
                Err(e) => {
                    let message = e.to_string();
                    self.events
                        .log_event(url, AnalysisEvent::StrategyError(preferred), Some(&message));
                    return Err(classify_escaped(&message));
                }
            }
        }

        let mut last_failure: Option<String> = None;
        for strategy in FetchStrategy::FALLBACK_ORDER {
            let request = FetchRequest {
                url,
                rules,
                engine: BrowserEngine::Firefox,
            };
            let started = Instant::now();
            match self.fetchers.get(strategy).fetch(request).await {
                Ok(FetchOutcome::Content(raw)) => {
                    debug!("{} 抓取成功：{}，耗时 {:?}", strategy, url, started.elapsed());
                    let content = self.accept(url, host, strategy, raw, &mut activated).await?;
                    return Ok(AnalysisOutcome {
                        content,
                        activated_rules: activated,
                        from_cache: false,
                        strategy: Some(strategy),
                    });
                }
                Ok(FetchOutcome::Empty) => debug!("{} 返回空内容：{}", strategy, url),
                Err(e) => {
                    warn!("{}_ERROR：{}，{}", strategy.id().to_ascii_uppercase(), url, e);
                    last_failure = Some(e.to_string());
                }
            }
        }

        self.events.log_event(url, AnalysisEvent::GeneralFetchError, last_failure.as_deref());
        Err(classify_exhausted(last_failure.as_deref()))
    }

    /// 记录策略、写入原始HTML缓存、处理内容
    async fn accept(
        &self,
        url: &str,
        host: &str,
        strategy: FetchStrategy,
        raw: String,
        activated: &mut ActivatedRules,
    ) -> AnalysisResult<String> {
        activated.push(format!("fetchStrategy: {}", strategy.id()));
        if let Err(e) = self.cache.set(url, &raw).await {
            warn!("缓存写入失败：{}，{}", url, e);
        }
        self.render(&raw, host, url, activated)
    }

    fn render(
        &self,
        raw: &str,
        host: &str,
        url: &str,
        activated: &mut ActivatedRules,
    ) -> AnalysisResult<String> {
        let content = self.processor.process(raw, host, url, activated)?;
        validate_hard_paywall(host, &content)?;
        Ok(content)
    }
}

/// 分析器构建器，未指定的协作者使用基于配置的默认实现
pub struct UrlAnalyzerBuilder {
    config: GlobalConfig,
    rules: Option<Arc<dyn RuleProvider>>,
    cache: Option<Arc<dyn ContentCache>>,
    fetchers: Option<FetcherSet>,
    probe: Option<Arc<dyn StatusProbe>>,
    deny_lists: Option<Arc<DenyLists>>,
    events: Option<Arc<dyn EventLogger>>,
}

impl UrlAnalyzerBuilder {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            rules: None,
            cache: None,
            fetchers: None,
            probe: None,
            deny_lists: None,
            events: None,
        }
    }

    pub fn rules(mut self, rules: Arc<dyn RuleProvider>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fetchers(mut self, fetchers: FetcherSet) -> Self {
        self.fetchers = Some(fetchers);
        self
    }

    pub fn status_probe(mut self, probe: Arc<dyn StatusProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn deny_lists(mut self, deny_lists: DenyLists) -> Self {
        self.deny_lists = Some(Arc::new(deny_lists));
        self
    }

    pub fn event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn build(self) -> MarretaResult<UrlAnalyzer> {
        let config = Arc::new(self.config);

        let rules: Arc<dyn RuleProvider> = match self.rules {
            Some(rules) => rules,
            None => Arc::new(JsonRuleProvider::empty()),
        };
        let cache: Arc<dyn ContentCache> = match (self.cache, &config.cache_dir) {
            (Some(cache), _) => cache,
            (None, Some(dir)) => Arc::new(DiskCache::new(dir.clone()).await?),
            (None, None) => Arc::new(MemoryCache::new()),
        };
        let fetchers = match self.fetchers {
            Some(fetchers) => fetchers,
            None => FetcherSet::from_config(&config)?,
        };
        let probe: Arc<dyn StatusProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(StatusChecker::new(&config)?),
        };

        let events: Arc<dyn EventLogger> = match self.events {
            Some(events) => events,
            None => Arc::new(TracingEventLogger),
        };

        Ok(UrlAnalyzer {
            processor: ContentProcessor::new(rules.clone(), config.clone()),
            config,
            rules,
            cache,
            fetchers,
            probe,
            deny_lists: self.deny_lists.unwrap_or_default(),
            events,
        })
    }
}
