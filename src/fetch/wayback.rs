//! Wayback Machine 归档抓取
//! 通过可用性接口查询最近快照，再以原始（id_）形式获取快照HTML

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::client::build_client;
use super::{FetchOutcome, FetchRequest, Fetcher};
use crate::config::GlobalConfig;
use crate::error::{FetchError, MarretaResult};

/// 快照URL：时间戳后插入 `id_` 即可获得未注入工具栏的原始页面
static SNAPSHOT_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://web\.archive\.org/web/(\d+)/(.+)$").expect("valid snapshot regex")
});

/// 兜底：移除快照中注入的 Wayback 工具栏
static TOOLBAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!-- BEGIN WAYBACK TOOLBAR INSERT -->.*?<!-- END WAYBACK TOOLBAR INSERT -->")
        .expect("valid toolbar regex")
});

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    available: bool,
    url: String,
}

/// 归档抓取器
#[derive(Debug, Clone)]
pub struct WaybackFetcher {
    client: Client,
    api_url: String,
}

impl WaybackFetcher {
    pub fn new(config: &GlobalConfig) -> MarretaResult<Self> {
        let client = build_client(config, config.archive_timeout, Policy::limited(5))?;
        Ok(Self {
            client,
            api_url: config.wayback_api_url.clone(),
        })
    }

    /// 将快照URL改写为原始形式（https + id_）
    pub fn raw_snapshot_url(snapshot_url: &str) -> String {
        match SNAPSHOT_URL_REGEX.captures(snapshot_url) {
            Some(caps) => format!("https://web.archive.org/web/{}id_/{}", &caps[1], &caps[2]),
            None => snapshot_url.to_string(),
        }
    }

    async fn closest_snapshot(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", url)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let availability: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Other(format!("invalid archive availability payload: {}", e)))?;

        match availability.archived_snapshots.closest {
            Some(snapshot) if snapshot.available => Ok(snapshot.url),
            _ => Err(FetchError::NotFound(format!("no archived snapshot for {}", url))),
        }
    }
}

#[async_trait]
impl Fetcher for WaybackFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutcome, FetchError> {
        let snapshot_url = self.closest_snapshot(request.url).await?;
        let raw_url = Self::raw_snapshot_url(&snapshot_url);
        debug!("归档快照：{} → {}", request.url, raw_url);

        let response = self.client.get(&raw_url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }
        let body = response.text().await?;
        let body = TOOLBAR_REGEX.replace_all(&body, "").into_owned();

        Ok(FetchOutcome::from_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BrowserEngine, RuleSet};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> WaybackFetcher {
        let config = crate::ConfigManager::custom()
            .wayback_api_url(format!("{}/wayback/available", server.uri()))
            .build();
        WaybackFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_raw_snapshot_url() {
        assert_eq!(
            WaybackFetcher::raw_snapshot_url("http://web.archive.org/web/20240101000000/https://site.example/a"),
            "https://web.archive.org/web/20240101000000id_/https://site.example/a"
        );
        assert_eq!(WaybackFetcher::raw_snapshot_url("http://other/x"), "http://other/x");
    }

    #[tokio::test]
    async fn test_fetches_closest_snapshot_and_strips_toolbar() {
        let server = MockServer::start().await;
        let snapshot = format!("{}/snap/1", server.uri());
        Mock::given(method("GET"))
            .and(path("/wayback/available"))
            .and(query_param("url", "https://site.example/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "archived_snapshots": {"closest": {"available": true, "url": snapshot, "status": "200"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/snap/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><!-- BEGIN WAYBACK TOOLBAR INSERT --><div>bar</div><!-- END WAYBACK TOOLBAR INSERT --><p>body</p></html>",
            ))
            .mount(&server)
            .await;

        let rules = RuleSet::default();
        let outcome = fetcher(&server)
            .fetch(FetchRequest { url: "https://site.example/a", rules: &rules, engine: BrowserEngine::Firefox })
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Content("<html><p>body</p></html>".into()));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/wayback/available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"archived_snapshots": {}})))
            .mount(&server)
            .await;

        let rules = RuleSet::default();
        let err = fetcher(&server)
            .fetch(FetchRequest { url: "https://site.example/a", rules: &rules, engine: BrowserEngine::Firefox })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }
}
