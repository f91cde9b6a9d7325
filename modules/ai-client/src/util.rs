/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip a code fence wrapping the whole response, including an optional
/// language tag (```json, ```mdx, ```markdown, ...). Text that is not
/// fenced is returned trimmed.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The language tag, if any, runs to the end of the opening line.
    let rest = match rest.find('\n') {
        Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
        None if is_fence_tag(rest.trim_end_matches("```")) => "",
        _ => rest,
    };

    rest.trim_end().trim_end_matches("```").trim()
}

fn is_fence_tag(s: &str) -> bool {
    s.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
