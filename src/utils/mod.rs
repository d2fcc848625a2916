//! 工具模块
pub mod domain;

pub use self::domain::{host_of, is_domain_match, normalize_domain};
