//! 域名规则执行：注入样式/脚本、删除元素、删除属性
//! 每类规则仅在至少命中一个元素时记录 `<类型>: <值>`

use dom_query::{Document, NodeRef, Selection};
use regex::Regex;
use tracing::debug;

use super::ActivatedRules;
use crate::rule::RuleSet;

/// 按固定顺序执行规则集
pub fn apply_rules(doc: &Document, rules: &RuleSet, activated: &mut ActivatedRules) {
    inject(doc, rules, activated);

    for class in &rules.class_attr_remove {
        if strip_class_token(doc, class) {
            activated.push(format!("classAttrRemove: {}", class));
        }
    }
    for tag in &rules.remove_elements_by_tag {
        if remove_by_tag(doc, tag) {
            activated.push(format!("removeElementsByTag: {}", tag));
        }
    }
    for id in &rules.id_element_remove {
        if remove_first_by_id(doc, id) {
            activated.push(format!("idElementRemove: {}", id));
        }
    }
    for class in &rules.class_element_remove {
        if remove_by_class(doc, class) {
            activated.push(format!("classElementRemove: {}", class));
        }
    }
    for keyword in &rules.contains_element_remove {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            continue;
        }
        if remove_containing(doc, &keyword) {
            activated.push(format!("containsElementRemove: {}", keyword));
        }
    }
    for script in &rules.script_tag_remove {
        if remove_scripts(doc, script) {
            activated.push(format!("scriptTagRemove: {}", script));
        }
    }
    for pattern in &rules.remove_custom_attr {
        if remove_attributes(doc, pattern) {
            activated.push(format!("removeCustomAttr: {}", pattern));
        }
    }
}

/// 注入自定义样式（head）与自定义脚本（body）
fn inject(doc: &Document, rules: &RuleSet, activated: &mut ActivatedRules) {
    if let Some(style) = rules.custom_style.as_deref() {
        let head = doc.select("head");
        if head.exists() {
            head.append_html(format!("<style>{}</style>", style));
        }
        activated.push("customStyle");
    }
    if let Some(code) = rules.custom_code.as_deref() {
        let body = doc.select("body");
        if body.exists() {
            body.append_html(format!(r#"<script type="text/javascript">{}</script>"#, code));
        }
        activated.push("customCode");
    }
}

/// 删除节点，返回是否有节点被删除
fn remove_nodes(nodes: Vec<NodeRef<'_>>) -> bool {
    let found = !nodes.is_empty();
    for node in nodes {
        Selection::from(node).remove();
    }
    found
}

fn has_class_token(node: &NodeRef<'_>, class: &str) -> bool {
    node.attr("class")
        .is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

fn strip_class_token(doc: &Document, class: &str) -> bool {
    let mut found = false;
    for node in doc.select("[class]").nodes() {
        if !has_class_token(node, class) {
            continue;
        }
        found = true;

        let el = Selection::from(node.clone());
        let remaining: Vec<String> = el
            .attr("class")
            .map(|v| v.split_whitespace().filter(|c| *c != class).map(String::from).collect())
            .unwrap_or_default();
        if remaining.is_empty() {
            el.remove_attr("class");
        } else {
            el.set_attr("class", &remaining.join(" "));
        }
    }
    found
}

fn remove_by_tag(doc: &Document, tag: &str) -> bool {
    match doc.try_select(tag) {
        Some(sel) => remove_nodes(sel.nodes().to_vec()),
        None => {
            debug!("无效的标签选择器：{}", tag);
            false
        }
    }
}

fn remove_first_by_id(doc: &Document, id: &str) -> bool {
    let first = doc
        .select("[id]")
        .nodes()
        .iter()
        .find(|n| n.attr("id").is_some_and(|v| &*v == id))
        .cloned();
    remove_nodes(first.into_iter().collect())
}

fn remove_by_class(doc: &Document, class: &str) -> bool {
    let nodes = doc
        .select("[class]")
        .nodes()
        .iter()
        .filter(|n| has_class_token(n, class))
        .cloned()
        .collect();
    remove_nodes(nodes)
}

/// class 或 id 中包含关键词（不区分大小写）的元素
fn remove_containing(doc: &Document, keyword: &str) -> bool {
    let contains = |node: &NodeRef<'_>, attr: &str| {
        node.attr(attr)
            .is_some_and(|v| v.to_lowercase().contains(keyword))
    };
    let nodes = doc
        .select("[class], [id]")
        .nodes()
        .iter()
        .filter(|n| contains(n, "class") || contains(n, "id"))
        .cloned()
        .collect();
    remove_nodes(nodes)
}

/// 外链脚本 src、预加载脚本 href、内联脚本内容任一包含关键词即删除
fn remove_scripts(doc: &Document, needle: &str) -> bool {
    let mut nodes: Vec<NodeRef<'_>> = doc
        .select("script")
        .nodes()
        .iter()
        .filter(|n| {
            n.attr("src").is_some_and(|v| v.contains(needle)) || n.text().contains(needle)
        })
        .cloned()
        .collect();

    nodes.extend(
        doc.select("link[as]")
            .nodes()
            .iter()
            .filter(|n| {
                n.attr("as").is_some_and(|v| v.eq_ignore_ascii_case("script"))
                    && n.attr("href").is_some_and(|v| v.contains(needle))
            })
            .cloned(),
    );

    remove_nodes(nodes)
}

/// `*` 通配的属性名模式转为锚定正则
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

fn remove_attributes(doc: &Document, pattern: &str) -> bool {
    let mut found = false;

    if pattern.contains('*') {
        let Some(re) = glob_to_regex(pattern) else {
            return false;
        };
        for node in doc.select("*").nodes() {
            let names: Vec<String> = node
                .attrs()
                .iter()
                .map(|a| a.name.local.to_string())
                .filter(|name| re.is_match(name))
                .collect();
            if names.is_empty() {
                continue;
            }
            found = true;
            let el = Selection::from(node.clone());
            for name in names {
                el.remove_attr(&name);
            }
        }
    } else {
        for node in doc.select("*").nodes() {
            if node.has_attr(pattern) {
                found = true;
                Selection::from(node.clone()).remove_attr(pattern);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(html: &str, rules: RuleSet) -> (Document, ActivatedRules) {
        let doc = Document::from(html);
        let mut activated = ActivatedRules::new();
        apply_rules(&doc, &rules, &mut activated);
        (doc, activated)
    }

    #[test]
    fn test_class_attr_remove_strips_token() {
        let (doc, activated) = apply(
            r#"<html><body><div id="a" class="locked content">a</div><div id="b" class="locked">b</div></body></html>"#,
            RuleSet {
                class_attr_remove: vec!["locked".into(), "absent".into()],
                ..Default::default()
            },
        );

        assert_eq!(doc.select("#a").attr("class").as_deref(), Some("content"));
        assert!(!doc.select("#b").has_attr("class"));
        assert_eq!(activated.clone().into_vec(), vec!["classAttrRemove: locked"]);
    }

    #[test]
    fn test_element_removal_rules() {
        let (doc, activated) = apply(
            r#"<html><body><aside>ad</aside><div id="gate">g</div><div class="promo big">p</div><div class="promotion">keep</div></body></html>"#,
            RuleSet {
                remove_elements_by_tag: vec!["aside".into(), "video".into()],
                id_element_remove: vec!["gate".into()],
                class_element_remove: vec!["promo".into()],
                ..Default::default()
            },
        );

        assert!(!doc.select("aside").exists());
        assert!(!doc.select("#gate").exists());
        assert!(!doc.select(".promo").exists());
        assert!(doc.select(".promotion").exists());
        assert_eq!(
            activated.into_vec(),
            vec!["removeElementsByTag: aside", "idElementRemove: gate", "classElementRemove: promo"]
        );
    }

    #[test]
    fn test_contains_rule_normalizes_keyword() {
        let (doc, activated) = apply(
            r#"<html><body><div class="Article-PAYWALL">x</div><div id="paywall-box">y</div><p>keep</p></body></html>"#,
            RuleSet {
                contains_element_remove: vec!["  PayWall ".into(), "   ".into()],
                ..Default::default()
            },
        );

        assert!(!doc.select("div").exists());
        assert!(doc.select("p").exists());
        assert_eq!(activated.into_vec(), vec!["containsElementRemove: paywall"]);
    }

    #[test]
    fn test_script_tag_remove_covers_src_preload_and_inline() {
        let (doc, activated) = apply(
            r#"<html><head><link rel="preload" as="script" href="https://cdn.example/piano.js"></head><body><script src="https://cdn.example/piano.js"></script><script>window.piano = 1;</script><script>window.ok = 1;</script></body></html>"#,
            RuleSet {
                script_tag_remove: vec!["piano".into()],
                ..Default::default()
            },
        );

        assert!(!doc.select("link").exists());
        assert_eq!(doc.select("script").length(), 1);
        assert_eq!(activated.into_vec(), vec!["scriptTagRemove: piano"]);
    }

    #[test]
    fn test_remove_custom_attr_literal_and_glob() {
        let (doc, activated) = apply(
            r#"<html><body><div id="a" data-paywall="1" data-track-id="x" data-track-src="y" title="t">a</div></body></html>"#,
            RuleSet {
                remove_custom_attr: vec!["data-paywall".into(), "data-track-*".into(), "data-none-*".into()],
                ..Default::default()
            },
        );

        let el = doc.select("#a");
        assert!(!el.has_attr("data-paywall"));
        assert!(!el.has_attr("data-track-id"));
        assert!(!el.has_attr("data-track-src"));
        assert!(el.has_attr("title"));
        assert_eq!(
            activated.into_vec(),
            vec!["removeCustomAttr: data-paywall", "removeCustomAttr: data-track-*"]
        );
    }

    #[test]
    fn test_cloned_node_handles_mutate_the_document() {
        let (doc, _) = apply(
            r#"<html><body><div id="gate" class="x">first</div><div id="gate">second</div><span class="locked promo">s</span></body></html>"#,
            RuleSet {
                id_element_remove: vec!["gate".into()],
                class_attr_remove: vec!["locked".into()],
                ..Default::default()
            },
        );

        // 仅删除第一个同 id 元素
        assert_eq!(doc.select("#gate").length(), 1);
        assert_eq!(doc.select("#gate").text().to_string(), "second");
        assert_eq!(doc.select("span").attr("class").as_deref(), Some("promo"));
    }

    #[test]
    fn test_glob_to_regex_is_anchored() {
        let re = glob_to_regex("data-*").unwrap();
        assert!(re.is_match("data-x"));
        assert!(!re.is_match("x-data-y"));
        assert!(glob_to_regex("on.*").unwrap().is_match("on.*"));
    }
}
