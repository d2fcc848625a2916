//! 提取模块：从HTML中提取可见纯文本
pub mod text_extractor;

pub use self::text_extractor::TextExtractor;
