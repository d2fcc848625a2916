//! 页面覆盖层：品牌栏与调试面板

use dom_query::Document;
use html_escape::{encode_double_quoted_attribute, encode_text};

use super::ActivatedRules;

/// 没有规则触发时调试面板显示的占位文本
pub const NO_RULES_PLACEHOLDER: &str = "No rules activated / Nenhuma regra ativada";

const BAR_STYLE: &str = "z-index: 2147483647; position: fixed; top: 0; right: 1rem; display: flex; gap: 8px;";
const LINK_STYLE: &str = "color: #fff; line-height: 1em; z-index: 2147483647; text-decoration: none; font-weight: bold; background: rgba(37,99,235, 0.9); box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); padding: 6px 10px; margin: 0px; overflow: hidden; border-bottom-left-radius: 8px; border-bottom-right-radius: 8px;";
const DEBUG_STYLE: &str = "z-index: 2147483647; position: fixed; bottom: 1rem; right: 1rem; max-width: 400px; padding: 1rem; color: #000; background: rgba(255, 255, 255, 0.9); border: 1px solid #e5e7eb; border-radius: 0.5rem; overflow: auto; max-height: 80vh; font-family: monospace; font-size: 13px; line-height: 1.4;";

/// 在 body 末尾追加品牌栏：原文链接 + 服务站点链接
pub fn add_brand_bar(doc: &Document, url: &str, site_url: &str) {
    let body = doc.select("body");
    if !body.exists() {
        return;
    }

    body.append_html(format!(
        r#"<div data-marreta="brand" style="{bar}"><a href="{url}" style="{link}" target="_blank">Original</a><a href="{site}" style="{link}" target="_blank">Marreta</a></div>"#,
        bar = BAR_STYLE,
        link = LINK_STYLE,
        url = encode_double_quoted_attribute(url),
        site = encode_double_quoted_attribute(site_url),
    ));
}

/// 在 body 末尾追加调试面板，逐条列出已激活规则
pub fn add_debug_panel(doc: &Document, activated: &ActivatedRules) {
    let body = doc.select("body");
    if !body.exists() {
        return;
    }

    let rows: String = if activated.is_empty() {
        format!("<div>{}</div>", NO_RULES_PLACEHOLDER)
    } else {
        activated
            .iter()
            .map(|rule| format!("<div>{}</div>", encode_text(rule)))
            .collect()
    };

    body.append_html(format!(
        r#"<div data-marreta="debug" style="{}">{}</div>"#,
        DEBUG_STYLE, rows
    ));
}
