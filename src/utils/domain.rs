//! 域名匹配工具
//! DMCA 列表与硬付费墙域名判定共用

use url::Url;

/// 规范化域名：去除首尾空白、转小写、去掉开头的 `www.`
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// 判断 input 是否等于 target 或为其子域名（必须以 `.` 为边界）
pub fn is_domain_match(input_host: &str, target_host: &str) -> bool {
    let input = normalize_domain(input_host);
    let target = normalize_domain(target_host);
    if target.is_empty() {
        return false;
    }

    input == target
        || (input.len() > target.len()
            && input.ends_with(target.as_str())
            && input.as_bytes()[input.len() - target.len() - 1] == b'.')
}

/// 从URL中提取主机名，无法解析或主机为空时返回 None
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_string())
}
