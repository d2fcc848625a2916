//! 分析事件日志
//! 事件上报为“发出即忘”，不影响控制流

use std::borrow::Cow;
use std::fmt;

use tracing::info;

use crate::rule::FetchStrategy;

/// 分析过程中上报的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisEvent {
    RestrictedUrl,
    DmcaDomain,
    BlockedDomain,
    InvalidStatusCode,
    StrategyError(FetchStrategy),
    GeneralFetchError,
}

impl AnalysisEvent {
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            AnalysisEvent::RestrictedUrl => Cow::Borrowed("RESTRICTED_URL"),
            AnalysisEvent::DmcaDomain => Cow::Borrowed("DMCA_DOMAIN"),
            AnalysisEvent::BlockedDomain => Cow::Borrowed("BLOCKED_DOMAIN"),
            AnalysisEvent::InvalidStatusCode => Cow::Borrowed("INVALID_STATUS_CODE"),
            AnalysisEvent::StrategyError(strategy) => {
                Cow::Owned(format!("{}_ERROR", strategy.id().to_ascii_uppercase()))
            }
            AnalysisEvent::GeneralFetchError => Cow::Borrowed("GENERAL_FETCH_ERROR"),
        }
    }
}

impl fmt::Display for AnalysisEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// 事件日志接口
pub trait EventLogger: Send + Sync {
    fn log_event(&self, url: &str, event: AnalysisEvent, detail: Option<&str>);
}

/// 基于 tracing 的事件日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log_event(&self, url: &str, event: AnalysisEvent, detail: Option<&str>) {
        info!(
            target: "marreta::events",
            url = url,
            event = %event,
            detail = detail.unwrap_or(""),
            "analysis event"
        );
    }
}
