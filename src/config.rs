//! 全局配置管理,存储所有可配置项

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MarretaError, MarretaResult};

/// 爬虫身份（Googlebot 移动版）
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/W.X.Y.Z Mobile Safari/537.36 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 服务自身站点URL（品牌栏链接）
    pub site_url: String,
    // 调试模式：注入已激活规则面板
    pub debug: bool,
    // 是否校验TLS证书
    pub verify_ssl: bool,
    // 自定义DNS服务器，空表示使用系统解析
    pub dns_servers: Vec<IpAddr>,
    // 状态探测超时
    pub status_timeout: Duration,
    // 直接抓取超时
    pub fetch_timeout: Duration,
    // 归档抓取超时
    pub archive_timeout: Duration,
    // 浏览器渲染超时
    pub browser_timeout: Duration,
    // 页面加载后的等待时间（浏览器渲染）
    pub browser_settle: Duration,
    // WebDriver Hub 地址
    pub webdriver_url: String,
    // Wayback 可用性接口
    pub wayback_api_url: String,
    // 原始HTML磁盘缓存目录，None 表示使用内存缓存
    pub cache_dir: Option<PathBuf>,
    // 低于该字节数的内容视为无效页面
    pub min_content_length: usize,
    // 抓取使用的 User-Agent
    pub user_agent: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            site_url: "https://marreta.pcdomanual.com".to_string(),
            debug: false,
            verify_ssl: true,
            dns_servers: Vec::new(),
            status_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            archive_timeout: Duration::from_secs(15),
            browser_timeout: Duration::from_secs(30),
            browser_settle: Duration::from_secs(2),
            webdriver_url: "http://localhost:4444/wd/hub".to_string(),
            wayback_api_url: "https://archive.org/wayback/available".to_string(),
            cache_dir: None,
            min_content_length: 5120,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GlobalConfig {
    /// 从环境变量读取配置
    pub fn from_env() -> MarretaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取配置，未设置的项保持默认值
    pub fn from_lookup<F>(lookup: F) -> MarretaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(site_url) = lookup("SITE_URL") {
            config.site_url = site_url.trim_end_matches('/').to_string();
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.debug = level.eq_ignore_ascii_case("DEBUG");
        }
        if let Some(verify) = lookup("VERIFY_SSL") {
            config.verify_ssl = parse_bool(&verify)
                .ok_or_else(|| MarretaError::ConfigError(format!("VERIFY_SSL 取值无效：{}", verify)))?;
        }
        if let Some(servers) = lookup("DNS_SERVERS") {
            config.dns_servers = parse_dns_servers(&servers)?;
        }
        if let Some(host) = lookup("SELENIUM_HOST") {
            config.webdriver_url = if host.starts_with("http") {
                host
            } else {
                format!("http://{}/wd/hub", host)
            };
        }
        if let Some(dir) = lookup("CACHE_DIR") {
            if !dir.trim().is_empty() {
                config.cache_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 解析逗号分隔的DNS服务器列表
fn parse_dns_servers(value: &str) -> MarretaResult<Vec<IpAddr>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| MarretaError::ConfigError(format!("DNS服务器地址无效：{}", s)))
        })
        .collect()
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_url = url.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.config.verify_ssl = verify;
        self
    }

    pub fn dns_servers(mut self, servers: Vec<IpAddr>) -> Self {
        self.config.dns_servers = servers;
        self
    }

    pub fn status_timeout(mut self, timeout: Duration) -> Self {
        self.config.status_timeout = timeout;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    pub fn archive_timeout(mut self, timeout: Duration) -> Self {
        self.config.archive_timeout = timeout;
        self
    }

    pub fn browser_timeout(mut self, timeout: Duration) -> Self {
        self.config.browser_timeout = timeout;
        self
    }

    pub fn browser_settle(mut self, settle: Duration) -> Self {
        self.config.browser_settle = settle;
        self
    }

    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.config.webdriver_url = url.into();
        self
    }

    pub fn wayback_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.wayback_api_url = url.into();
        self
    }

    pub fn cache_dir(mut self, path: PathBuf) -> Self {
        self.config.cache_dir = Some(path);
        self
    }

    pub fn min_content_length(mut self, len: usize) -> Self {
        self.config.min_content_length = len;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
