//! 浏览器渲染抓取：通过 W3C WebDriver 协议驱动远程浏览器（Selenium Hub 等）
//! 会话在任何情况下都会被删除

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use super::client::build_client;
use super::{FetchOutcome, FetchRequest, Fetcher};
use crate::config::GlobalConfig;
use crate::error::{FetchError, MarretaResult};
use crate::rule::BrowserEngine;

/// WebDriver 响应外层
#[derive(Debug, Deserialize)]
struct WdResponse {
    value: Value,
}

/// 浏览器渲染抓取器
#[derive(Debug, Clone)]
pub struct WebDriverFetcher {
    client: Client,
    hub_url: String,
    settle: Duration,
    user_agent: String,
}

impl WebDriverFetcher {
    pub fn new(config: &GlobalConfig) -> MarretaResult<Self> {
        let client = build_client(config, config.browser_timeout, Policy::none())?;
        Ok(Self {
            client,
            hub_url: config.webdriver_url.trim_end_matches('/').to_string(),
            settle: config.browser_settle,
            user_agent: config.user_agent.clone(),
        })
    }

    /// 新建会话的 capabilities（无头模式 + 爬虫 UA）
    fn capabilities(&self, engine: BrowserEngine, user_agent: &str) -> Value {
        let mut always_match = json!({ "browserName": engine.browser_name() });
        match engine {
            BrowserEngine::Firefox => {
                always_match["moz:firefoxOptions"] = json!({
                    "args": ["-headless"],
                    "prefs": { "general.useragent.override": user_agent }
                });
            }
            BrowserEngine::Chrome => {
                always_match["goog:chromeOptions"] = json!({
                    "args": ["--headless=new", "--disable-gpu", "--no-sandbox", format!("--user-agent={}", user_agent)]
                });
            }
        }
        json!({ "capabilities": { "alwaysMatch": always_match } })
    }

    /// 发送命令并解析 value，WebDriver 错误转换为 FetchError
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.hub_url, path);
        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let payload: WdResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Other(format!("invalid WebDriver response from {}: {}", path, e)))?;

        if status.is_success() {
            return Ok(payload.value);
        }

        let error = payload.value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = payload.value.get("message").and_then(Value::as_str).unwrap_or("");
        Err(webdriver_error(error, message))
    }

    async fn render(&self, session: &str, request: &FetchRequest<'_>) -> Result<String, FetchError> {
        let base = format!("/session/{}", encode_path_segment(session));
        self.command(Method::POST, &format!("{}/url", base), Some(json!({ "url": request.url })))
            .await?;

        // 清理计数型付费墙使用的 Cookie 后重新加载
        if !request.rules.cookie_prefix_remove.is_empty() {
            let cookies = self.command(Method::GET, &format!("{}/cookie", base), None).await?;
            let mut removed = 0usize;
            for name in cookies
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .filter(|name| request.rules.cookie_prefix_remove.iter().any(|p| name.starts_with(p.as_str())))
            {
                self.command(Method::DELETE, &format!("{}/cookie/{}", base, encode_path_segment(name)), None)
                    .await?;
                removed += 1;
            }
            if removed > 0 {
                debug!("已删除 {} 个匹配前缀的 Cookie，重新加载页面", removed);
                self.command(Method::POST, &format!("{}/refresh", base), Some(json!({}))).await?;
            }
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let source = self.command(Method::GET, &format!("{}/source", base), None).await?;
        Ok(source.as_str().unwrap_or_default().to_string())
    }
}

/// 百分号编码单个路径段（Cookie 名可含空格、`/`、`?` 等）
fn encode_path_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

/// WebDriver 错误码映射为带分类标记的失败
fn webdriver_error(error: &str, message: &str) -> FetchError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("dnsnotfound") || lowered.contains("err_name_not_resolved") {
        FetchError::Dns(message.to_string())
    } else if lowered.contains("connectionfailure") || lowered.contains("err_connection") || error == "timeout" {
        FetchError::Connection(format!("{}: {}", error, message))
    } else {
        FetchError::Other(format!("WebDriver {}: {}", error, message))
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, FetchError> {
        let user_agent = request.rules.user_agent.as_deref().unwrap_or(&self.user_agent);
        let session = self
            .command(Method::POST, "/session", Some(self.capabilities(request.engine, user_agent)))
            .await?;
        let session_id = session
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Other("WebDriver session without sessionId".to_string()))?
            .to_string();
        debug!("WebDriver 会话已创建：{}（{}）", session_id, request.engine.browser_name());

        let rendered = self.render(&session_id, &request).await;

        if let Err(e) = self
            .command(Method::DELETE, &format!("/session/{}", encode_path_segment(&session_id)), None)
            .await
        {
            warn!("WebDriver 会话删除失败：{}：{}", session_id, e);
        }

        Ok(FetchOutcome::from_body(rendered?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, sniff_failure_kind};
    use crate::rule::RuleSet;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> WebDriverFetcher {
        let config = crate::ConfigManager::custom()
            .webdriver_url(format!("{}/wd/hub", server.uri()))
            .browser_settle(Duration::ZERO)
            .build();
        WebDriverFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_renders_page_and_deletes_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wd/hub/session"))
            .and(body_partial_json(json!({"capabilities": {"alwaysMatch": {"browserName": "chrome"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": {"sessionId": "abc", "capabilities": {}}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wd/hub/session/abc/url"))
            .and(body_partial_json(json!({"url": "https://site.example/a"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wd/hub/session/abc/cookie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
                {"name": "_pc_meter"},
                {"name": "_pc_a b/c"},
                {"name": "keep"}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wd/hub/session/abc/cookie/_pc_meter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wd/hub/session/abc/cookie/_pc_a%20b%2Fc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wd/hub/session/abc/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wd/hub/session/abc/source"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "<html>rendered</html>"})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wd/hub/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;

        let rules = RuleSet {
            cookie_prefix_remove: vec!["_pc_".into()],
            ..Default::default()
        };
        let outcome = fetcher(&server)
            .fetch(FetchRequest { url: "https://site.example/a", rules: &rules, engine: BrowserEngine::Chrome })
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Content("<html>rendered</html>".into()));
    }

    #[tokio::test]
    async fn test_navigation_error_still_deletes_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wd/hub/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": {"sessionId": "s1"}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wd/hub/session/s1/url"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"value": {
                "error": "unknown error",
                "message": "Reached error page: about:neterror?e=dnsNotFound"
            }})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wd/hub/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;

        let rules = RuleSet::default();
        let err = fetcher(&server)
            .fetch(FetchRequest { url: "https://nowhere.invalid/", rules: &rules, engine: BrowserEngine::Firefox })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Dns(_)));
        assert_eq!(sniff_failure_kind(&err.to_string()), Some(ErrorKind::DnsFailure));
    }

    #[test]
    fn test_path_segment_encoding() {
        assert_eq!(encode_path_segment("_pc_meter"), "_pc_meter");
        assert_eq!(encode_path_segment("_pc_a b/c"), "_pc_a%20b%2Fc");
        assert_eq!(encode_path_segment("x?y#z%"), "x%3Fy%23z%25");
    }
}
