//! URL 相关的结构变换：canonical 替换、相对地址补全

use dom_query::{Document, Selection};
use html_escape::encode_double_quoted_attribute;
use url::Url;

/// 删除已有的 canonical 链接，并在 head 中追加指向请求URL的新链接
pub fn replace_canonical(doc: &Document, url: &str) {
    doc.select(r#"link[rel="canonical"]"#).remove();

    let head = doc.select("head");
    if head.exists() {
        head.append_html(format!(
            r#"<link rel="canonical" href="{}">"#,
            encode_double_quoted_attribute(url)
        ));
    }
}

/// 站点根地址：scheme://host[:port]
fn base_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// 判断属性值是否需要补全；返回 None 表示保持原值
fn absolutize(base: &str, value: &str, skip_prefixes: &[&str]) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || value.starts_with("http")
        || value.starts_with("//")
        || skip_prefixes.iter().any(|p| value.starts_with(p))
    {
        return None;
    }
    Some(format!("{}/{}", base, value.trim_start_matches('/')))
}

const SKIP_PREFIXES: [&str; 5] = ["data:", "mailto:", "tel:", "javascript:", "#"];

/// 将 src / href 中的相对地址补全为基于站点根的绝对地址
pub fn fix_relative_urls(doc: &Document, url: &str) {
    let Some(base) = base_host(url) else {
        return;
    };

    for attr in ["src", "href"] {
        let selector = format!("[{}]", attr);
        for node in doc.select(&selector).nodes() {
            let el = Selection::from(node.clone());
            let Some(value) = el.attr(attr) else {
                continue;
            };
            if let Some(fixed) = absolutize(&base, &value, &SKIP_PREFIXES) {
                el.set_attr(attr, &fixed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str, url: &str) -> String {
        let doc = Document::from(html);
        fix_relative_urls(&doc, url);
        doc.html().to_string()
    }

    #[test]
    fn test_relative_urls_are_joined_against_host_root() {
        let html = run(
            r#"<html><body><img src="/x.png"><img src="img/y.png"><a href="../up">u</a></body></html>"#,
            "https://news.example/section/article",
        );
        assert!(html.contains(r#"src="https://news.example/x.png""#));
        assert!(html.contains(r#"src="https://news.example/img/y.png""#));
        assert!(html.contains(r#"href="https://news.example/../up""#));
    }

    #[test]
    fn test_excluded_and_absolute_values_are_untouched() {
        let html = run(
            r##"<html><body><a href="#top">t</a><a href="mailto:a@b.c">m</a><img src="data:image/png;base64,AAAA"><a href="https://other.example/">o</a><script src="//cdn.example/a.js"></script></body></html>"##,
            "https://news.example/a",
        );
        assert!(html.contains(r##"href="#top""##));
        assert!(html.contains(r#"href="mailto:a@b.c""#));
        assert!(html.contains(r#"src="data:image/png;base64,AAAA""#));
        assert!(html.contains(r#"href="https://other.example/""#));
        assert!(html.contains(r#"src="//cdn.example/a.js""#));
    }

    #[test]
    fn test_non_default_port_is_kept() {
        assert_eq!(base_host("http://localhost:8080/a/b").as_deref(), Some("http://localhost:8080"));
        assert_eq!(base_host("https://news.example:443/a").as_deref(), Some("https://news.example"));
    }

    #[test]
    fn test_canonical_is_replaced() {
        let doc = Document::from(
            r#"<html><head><link rel="canonical" href="https://web.archive.org/web/1/x"></head><body></body></html>"#,
        );
        replace_canonical(&doc, "https://news.example/x?a=1&b=2");
        let html = doc.html().to_string();

        assert!(!html.contains("web.archive.org"));
        assert_eq!(doc.select(r#"link[rel="canonical"]"#).length(), 1);
        assert_eq!(
            doc.select(r#"link[rel="canonical"]"#).attr("href").as_deref(),
            Some("https://news.example/x?a=1&b=2")
        );

        let url = r#"https://news.example/x?q="><meta http-equiv="refresh">"#;
        replace_canonical(&doc, url);
        assert!(!doc.select("meta").exists());
        assert_eq!(doc.select(r#"link[rel="canonical"]"#).attr("href").as_deref(), Some(url));
    }
}
