// Comparison keys for links, titles and article bodies.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static RE_FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static RE_INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]+`").unwrap());
static RE_MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Minimum length of a title token.
const MIN_TOKEN_LEN: usize = 3;

/// Canonical comparison key for a URL: no scheme, no leading `www.`, no
/// query string, no trailing slash, lower-cased. Malformed input is simply
/// case-folded.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let lower_prefix = trimmed
        .get(..8)
        .map(|p| p.to_ascii_lowercase())
        .unwrap_or_else(|| trimmed.to_ascii_lowercase());

    let without_scheme = if lower_prefix.starts_with("https://") {
        &trimmed[8..]
    } else if lower_prefix.starts_with("http://") {
        &trimmed[7..]
    } else {
        trimmed
    };

    let without_www = match without_scheme.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("www.") => &without_scheme[4..],
        _ => without_scheme,
    };

    let without_query = without_www.split('?').next().unwrap_or_default();

    without_query.trim_end_matches('/').to_lowercase()
}

/// Host part of a normalized URL: everything before the first `/`.
pub fn url_domain(normalized: &str) -> &str {
    normalized.split('/').next().unwrap_or(normalized)
}

fn title_tokens(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_lowercase())
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Token-set overlap between two titles, divided by the smaller set size.
///
/// Tokens are lower-case ASCII letter runs of at least three characters.
/// Returns 0.0 when either title has no tokens.
pub fn title_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = title_tokens(a);
    let tokens_b = title_tokens(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count();
    shared as f64 / tokens_a.len().min(tokens_b.len()) as f64
}

/// Reduce a markdown/MDX body to lower-case alphanumeric words separated by
/// single spaces, for corpus similarity comparison.
pub fn normalize_text(text: &str) -> String {
    let text = RE_FENCED_CODE.replace_all(text, " ");
    let text = RE_INLINE_CODE.replace_all(&text, " ");
    let text = RE_MARKDOWN_LINK.replace_all(&text, "$1");
    let text = RE_TAG.replace_all(&text, " ");
    let lowered = text.to_lowercase();
    let text = RE_NON_ALNUM.replace_all(&lowered, " ");
    RE_WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Escape square brackets and backslashes so `text` can sit inside the
/// `[...]` of a markdown link.
pub fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape_link_text`]: drop the backslash before any escaped
/// character.
pub fn unescape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}
