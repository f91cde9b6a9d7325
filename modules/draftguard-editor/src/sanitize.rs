// Strip executable and exfiltrating constructs from generated MDX before it
// is written anywhere a site build could pick it up.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static RE_IMPORT_EXPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:import|export)\s+.*$").unwrap());
static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script[\s\S]*?</script>").unwrap());
static RE_IFRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<iframe[\s\S]*?</iframe>").unwrap());
static RE_IFRAME_SELF_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<iframe[^>]*/>").unwrap());
static RE_HANDLER_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\s+on\w+\s*=\s*["'][^"']*["']"#).unwrap());
static RE_HANDLER_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+on\w+\s*=\s*\{[^}]*\}").unwrap());
static RE_JAVASCRIPT_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']javascript:[^"']*["']"#).unwrap());
static RE_DATA_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src\s*=\s*["']data:([^"']*)["']"#).unwrap());
static RE_STYLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)style\s*=\s*["'][^"']*url\s*\([^)]*\)[^"']*["']"#).unwrap()
});

/// Remove dangerous MDX constructs. Inline `data:image/...` sources are
/// left alone; every other `data:` source is emptied.
pub fn sanitize_mdx(body: &str) -> String {
    let body = RE_IMPORT_EXPORT.replace_all(body, "");
    let body = RE_SCRIPT.replace_all(&body, "");
    let body = RE_IFRAME.replace_all(&body, "");
    let body = RE_IFRAME_SELF_CLOSING.replace_all(&body, "");
    let body = RE_HANDLER_QUOTED.replace_all(&body, "");
    let body = RE_HANDLER_EXPRESSION.replace_all(&body, "");
    let body = RE_JAVASCRIPT_HREF.replace_all(&body, r##"href="#""##);
    let body = RE_DATA_SRC.replace_all(&body, |caps: &Captures| {
        if caps[1].to_ascii_lowercase().starts_with("image/") {
            caps[0].to_string()
        } else {
            r#"src="""#.to_string()
        }
    });
    let body = RE_STYLE_URL.replace_all(&body, "");
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_module_statements() {
        let body = "import Chart from './chart'\nexport const meta = {}\n\nIntro paragraph.";
        assert_eq!(sanitize_mdx(body), "Intro paragraph.");
    }

    #[test]
    fn removes_script_and_iframe_elements() {
        let body = "Before <script>alert(1)</script> middle <IFRAME src=\"https://x\"></IFRAME> and <iframe src=\"y\" /> after";
        assert_eq!(sanitize_mdx(body), "Before  middle  and  after");
    }

    #[test]
    fn removes_event_handlers_in_both_forms() {
        let body = r#"<img src="a.png" onerror="steal()" /><div onClick={() => go()}>x</div>"#;
        assert_eq!(sanitize_mdx(body), r#"<img src="a.png" /><div>x</div>"#);
    }

    #[test]
    fn neutralizes_javascript_links() {
        let body = r#"<a href="javascript:alert(1)">click</a>"#;
        assert_eq!(sanitize_mdx(body), r##"<a href="#">click</a>"##);
    }

    #[test]
    fn keeps_inline_images_but_drops_other_data_sources() {
        let body = r#"<img src="data:image/png;base64,AAAA" /><embed src="data:text/html,<b>x</b>" />"#;
        assert_eq!(
            sanitize_mdx(body),
            r#"<img src="data:image/png;base64,AAAA" /><embed src="" />"#
        );
    }

    #[test]
    fn removes_styles_with_url() {
        let body = r#"<div style="background: url(https://track.example/p.gif)">x</div>"#;
        assert_eq!(sanitize_mdx(body), "<div >x</div>");
    }

    #[test]
    fn plain_markdown_is_untouched() {
        let body = "Intro.\n\n## References\n\n- [A](https://a.org/1)";
        assert_eq!(sanitize_mdx(body), body);
    }
}
