//! 硬付费墙校验：处理后正文过短的指定站点视为订阅专享内容

use crate::error::{AnalysisResult, AnalyzerError, ErrorKind};
use crate::extractor::TextExtractor;
use crate::utils::normalize_domain;

pub const HARD_PAYWALL_DOMAIN: &str = "valor.globo.com";
pub const HARD_PAYWALL_MIN_CHARS: usize = 200;
pub const HARD_PAYWALL_MESSAGE: &str =
    "Este artigo do Valor Economico e exclusivo para assinantes (hard paywall).";

/// 校验处理后的HTML，仅对 `valor.globo.com` 生效（`www.` 前缀视为相同主机，子域名不适用）
pub fn validate_hard_paywall(host: &str, processed_html: &str) -> AnalysisResult<()> {
    if normalize_domain(host) != HARD_PAYWALL_DOMAIN {
        return Ok(());
    }

    let text = TextExtractor::plain_text(processed_html);
    if text.chars().count() < HARD_PAYWALL_MIN_CHARS {
        return Err(AnalyzerError::with_message(ErrorKind::ContentError, HARD_PAYWALL_MESSAGE));
    }
    Ok(())
}
