//! 爬虫身份伪装：请求头与 X-Forwarded-For

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Googlebot 出口网段内的随机地址（66.249.64.0/19）
pub fn googlebot_forwarded_for() -> String {
    let mut rng = rand::thread_rng();
    format!("66.249.{}.{}", rng.gen_range(64..=95), rng.gen_range(1..=254))
}

/// 爬虫身份的基础请求头（不含 User-Agent）
pub fn crawler_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(reqwest::header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(reqwest::header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(reqwest::header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(reqwest::header::FROM, HeaderValue::from_static("googlebot(at)googlebot.com"));
    if let Ok(ip) = HeaderValue::from_str(&googlebot_forwarded_for()) {
        headers.insert(HeaderName::from_static("x-forwarded-for"), ip);
    }
    headers
}

/// 追加自定义请求头，非法的键值跳过并告警
pub fn extend_headers<'a, I>(headers: &mut HeaderMap, extra: I)
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (name, value) in extra {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("忽略无效的自定义请求头：{}", name),
        }
    }
}
