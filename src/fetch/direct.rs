//! 直接抓取：以爬虫身份 GET 页面，附加域名规则中的请求头/Cookie/Referer

use async_trait::async_trait;
use reqwest::header::{HeaderValue, COOKIE, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;

use super::client::build_client;
use super::identity::{crawler_headers, extend_headers};
use super::{FetchOutcome, FetchRequest, Fetcher};
use crate::config::GlobalConfig;
use crate::error::{FetchError, MarretaResult};
use crate::rule::RuleSet;

const DEFAULT_REFERER: &str = "https://www.google.com/";

/// 直接HTTP抓取器
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(config: &GlobalConfig) -> MarretaResult<Self> {
        let client = build_client(config, config.fetch_timeout, Policy::limited(5))?;
        Ok(Self { client })
    }

    /// 由规则生成 Cookie 头，值为 None 的条目不发送
    fn cookie_header(rules: &RuleSet) -> Option<String> {
        let pairs: Vec<String> = rules
            .cookies
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{}={}", name, v)))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }
}

#[async_trait]
impl Fetcher for DirectFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, FetchError> {
        let rules = request.rules;

        let mut headers = crawler_headers();
        extend_headers(&mut headers, &rules.headers);
        if let Some(ua) = rules.user_agent.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(USER_AGENT, ua);
        }
        let referer = rules.referer.as_deref().unwrap_or(DEFAULT_REFERER);
        if let Ok(referer) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, referer);
        }
        if let Some(cookie) = Self::cookie_header(rules).and_then(|c| HeaderValue::from_str(&c).ok()) {
            headers.insert(COOKIE, cookie);
        }

        let response = self.client.get(request.url).headers(headers).send().await?;
        let status = response.status().as_u16();
        match status {
            200 => {}
            404 => return Err(FetchError::NotFound(request.url.to_string())),
            code => return Err(FetchError::Http(code)),
        }

        let bytes = response.bytes().await?;
        debug!("直接抓取完成：{}，{} 字节", request.url, bytes.len());
        Ok(FetchOutcome::from_body(String::from_utf8_lossy(&bytes).into_owned()))
    }
}
