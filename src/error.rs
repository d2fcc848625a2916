//! 全局错误类型定义
//! - `MarretaError`：基础设施错误（规则加载、缓存、配置、HTTP客户端构建）
//! - `AnalyzerError`：面向调用方的分类错误（封闭枚举 `ErrorKind`）
//! - `FetchError`：抓取器原始失败，消息中携带分类标记

use std::fmt;

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

/// 失败消息分类标记：抓取器的错误消息必须包含其中之一才能被正确归类
pub const MARKER_DNS: &str = "DNS";
pub const MARKER_CONNECTION: &str = "CURL";
pub const MARKER_HTTP: &str = "HTTP";
pub const MARKER_NOT_FOUND: &str = "not found";

#[derive(Error, Debug)]
pub enum MarretaError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则解析失败：{0}")]
    RuleParseError(String),

    // 缓存相关错误
    #[error("缓存读写失败：{0}")]
    CacheError(String),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 配置相关错误
    #[error("配置无效：{0}")]
    ConfigError(String),

    // 网络相关错误
    #[error("HTTP客户端初始化失败：{0}")]
    HttpClientError(#[from] reqwest::Error),

    // 基础错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type MarretaResult<T> = Result<T, MarretaError>;

/// 分析结果类型
pub type AnalysisResult<T> = Result<T, AnalyzerError>;

/// 封闭错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    RestrictedUrl,
    DmcaDomain,
    BlockedDomain,
    NotFound,
    HttpError,
    DnsFailure,
    ConnectionError,
    ContentError,
    GenericError,
}

impl ErrorKind {
    /// 建议的HTTP状态码
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::InvalidUrl => 400,
            ErrorKind::RestrictedUrl => 403,
            ErrorKind::DmcaDomain => 451,
            ErrorKind::BlockedDomain => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::HttpError => 502,
            ErrorKind::DnsFailure => 504,
            ErrorKind::ConnectionError => 503,
            ErrorKind::ContentError => 502,
            ErrorKind::GenericError => 500,
        }
    }

    /// 稳定的错误标识（日志 / 传输层使用）
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "INVALID_URL",
            ErrorKind::RestrictedUrl => "RESTRICTED_URL",
            ErrorKind::DmcaDomain => "DMCA_DOMAIN",
            ErrorKind::BlockedDomain => "BLOCKED_DOMAIN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::DnsFailure => "DNS_FAILURE",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::ContentError => "CONTENT_ERROR",
            ErrorKind::GenericError => "GENERIC_ERROR",
        }
    }

    /// 默认的用户可读消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "Invalid URL",
            ErrorKind::RestrictedUrl => "This URL is not allowed",
            ErrorKind::DmcaDomain => "This domain was removed following a DMCA request",
            ErrorKind::BlockedDomain => "This domain is blocked",
            ErrorKind::NotFound => "Page not found",
            ErrorKind::HttpError => "The server returned an error while fetching the page",
            ErrorKind::DnsFailure => "Could not resolve the domain",
            ErrorKind::ConnectionError => "Could not connect to the server",
            ErrorKind::ContentError => "Could not retrieve usable content",
            ErrorKind::GenericError => "An unexpected error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 分类后的分析错误，构造后原样向上传递
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AnalyzerError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: u16,
    pub detail: Option<String>,
}

impl AnalyzerError {
    /// 构造分类错误，非空 detail 追加到默认消息之后
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let (message, detail) = if detail.trim().is_empty() {
            (kind.default_message().to_string(), None)
        } else {
            (format!("{}: {}", kind.default_message(), detail), Some(detail))
        };

        Self {
            kind,
            message,
            status: kind.status(),
            detail,
        }
    }

    /// 不带附加信息的分类错误
    pub fn of(kind: ErrorKind) -> Self {
        Self::new(kind, "")
    }

    /// 以自定义消息替换默认消息（DMCA 自定义说明、硬付费墙提示），空消息退回默认
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::of(kind);
        }
        Self {
            kind,
            message: message.clone(),
            status: kind.status(),
            detail: Some(message),
        }
    }
}

/// 抓取器失败
/// 每个变体的消息都包含对应的分类标记（见 `MARKER_*`）
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    #[error("CURL connection error: {0}")]
    Connection(String),
    #[error("HTTP error: status {0}")]
    Http(u16),
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return if status.as_u16() == 404 {
                FetchError::NotFound(e.to_string())
            } else {
                FetchError::Http(status.as_u16())
            };
        }

        let chain = error_chain(&e);
        if chain.contains("dns error") || chain.contains("failed to lookup address") {
            return FetchError::Dns(chain);
        }
        if e.is_timeout() || e.is_connect() || e.is_request() {
            return FetchError::Connection(chain);
        }
        FetchError::Other(chain)
    }
}

/// 展开错误链，拼接为单行消息
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// 按子串标记识别失败类型（尽力而为，非穷举）
pub fn sniff_failure_kind(message: &str) -> Option<ErrorKind> {
    if message.contains(MARKER_DNS) {
        Some(ErrorKind::DnsFailure)
    } else if message.contains(MARKER_CONNECTION) {
        Some(ErrorKind::ConnectionError)
    } else if message.contains(MARKER_HTTP) {
        Some(ErrorKind::HttpError)
    } else if message.contains(MARKER_NOT_FOUND) {
        Some(ErrorKind::NotFound)
    } else {
        None
    }
}

/// 抓取链耗尽时的分类：没有保留任何失败则为 ContentError，
/// 有失败但无可识别标记则与逃逸失败相同（GenericError 携带原始消息）
pub fn classify_exhausted(last_failure: Option<&str>) -> AnalyzerError {
    match last_failure {
        Some(message) => classify_escaped(message),
        None => AnalyzerError::of(ErrorKind::ContentError),
    }
}

/// 逃逸到外层边界的未分类失败：无可识别标记则为 GenericError（携带原始消息）
pub fn classify_escaped(message: &str) -> AnalyzerError {
    match sniff_failure_kind(message) {
        Some(kind) => AnalyzerError::of(kind),
        None => AnalyzerError::new(ErrorKind::GenericError, message),
    }
}
