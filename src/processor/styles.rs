//! 内联样式清理：去除常用于遮挡正文的声明

use dom_query::{Document, Selection};

const BLOCKING_PROPERTIES: [&str; 6] = ["max-height", "height", "overflow", "position", "display", "visibility"];

/// 按声明切分：括号与引号内的分号不作分隔（`url(data:...;base64,...)`、`content: "a;b"`）
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}

fn is_blocking(decl: &str) -> bool {
    let name = decl.split(':').next().unwrap_or_default().trim().to_ascii_lowercase();
    BLOCKING_PROPERTIES.contains(&name.as_str())
}

/// 过滤单个 style 属性值，按属性名精确匹配（`line-height` 等不受影响）
/// 保留的声明原文不变；没有可删除的声明时原样返回
fn clean_declarations(style: &str) -> String {
    let declarations: Vec<&str> = split_declarations(style)
        .into_iter()
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .collect();

    if !declarations.iter().any(|decl| is_blocking(decl)) {
        return style.to_string();
    }

    declarations
        .into_iter()
        .filter(|decl| !is_blocking(decl))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 清理所有元素的内联样式，清理后为空则删除 style 属性
pub fn clean_inline_styles(doc: &Document) {
    for node in doc.select("[style]").nodes() {
        let el = Selection::from(node.clone());
        let Some(style) = el.attr("style") else {
            continue;
        };

        let cleaned = clean_declarations(&style);
        if cleaned.is_empty() {
            el.remove_attr("style");
        } else if cleaned != &*style {
            el.set_attr("style", &cleaned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_declarations_are_dropped() {
        assert_eq!(
            clean_declarations("color: red; max-height: 100px; OVERFLOW:hidden;line-height: 1.5"),
            "color: red; line-height: 1.5"
        );
        assert_eq!(clean_declarations("display:none"), "");
    }

    #[test]
    fn test_semicolons_inside_urls_and_strings_are_kept() {
        assert_eq!(
            clean_declarations("background-image: url(data:image/png;base64,iVBORw0KGgo=); height: 10px"),
            "background-image: url(data:image/png;base64,iVBORw0KGgo=)"
        );
        assert_eq!(
            clean_declarations(r#"font-family: "a;b", serif; overflow: hidden; content: 'x;)'"#),
            r#"font-family: "a;b", serif; content: 'x;)'"#
        );
    }

    #[test]
    fn test_style_without_blocking_declarations_is_untouched() {
        let style = "color:red ;  margin:0;background: url('a;b.png')";
        assert_eq!(clean_declarations(style), style);

        let doc = Document::from(format!(r#"<html><body><p id="a" style="{}">a</p></body></html>"#, style));
        clean_inline_styles(&doc);
        assert_eq!(doc.select("#a").attr("style").as_deref(), Some(style));
    }

    #[test]
    fn test_empty_style_attribute_is_removed() {
        let doc = Document::from(
            r#"<html><body><div id="a" style="position: fixed; height: 100vh">a</div><p id="b" style="margin: 0">b</p></body></html>"#,
        );
        clean_inline_styles(&doc);

        assert!(!doc.select("#a").has_attr("style"));
        assert_eq!(doc.select("#b").attr("style").as_deref(), Some("margin: 0"));
    }
}
