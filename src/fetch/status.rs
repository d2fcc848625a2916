//! 状态探测：以爬虫身份发送无响应体的 HEAD 请求，获取状态码与最终URL

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::client::build_client;
use super::identity::crawler_headers;
use crate::config::GlobalConfig;
use crate::error::MarretaResult;

/// 探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub final_url: String,
    pub has_redirect: bool,
    /// 传输失败时可能为 0
    pub http_code: u16,
}

/// 状态探测接口
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn check_status(&self, url: &str) -> StatusInfo;
}

/// 基于 reqwest 的状态探测器
#[derive(Debug, Clone)]
pub struct StatusChecker {
    client: Client,
}

impl StatusChecker {
    pub fn new(config: &GlobalConfig) -> MarretaResult<Self> {
        let client = build_client(config, config.status_timeout, Policy::limited(10))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusProbe for StatusChecker {
    async fn check_status(&self, url: &str) -> StatusInfo {
        let response = self
            .client
            .head(url)
            .headers(crawler_headers())
            .send()
            .await;

        match response {
            Ok(resp) => {
                let final_url = resp.url().to_string();
                let http_code = resp.status().as_u16();
                debug!("状态探测完成：{} → {}（{}）", url, final_url, http_code);
                StatusInfo {
                    has_redirect: final_url != url,
                    final_url,
                    http_code,
                }
            }
            Err(e) => {
                debug!("状态探测失败：{}：{}", url, e);
                StatusInfo {
                    final_url: url.to_string(),
                    has_redirect: false,
                    http_code: e.status().map(|s| s.as_u16()).unwrap_or(0),
                }
            }
        }
    }
}
