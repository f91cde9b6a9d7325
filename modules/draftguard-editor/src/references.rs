// Locating, parsing and re-rendering the References section of a draft.

use std::sync::LazyLock;

use regex::Regex;

use draftguard_common::{unescape_link_text, Citation, ReconciledReference};

/// Heading marker the section is introduced by.
pub const REFERENCES_HEADING: &str = "## References";

static RE_REFERENCES_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^##[ \t]+references[ \t]*\r?$").unwrap());
static RE_NEXT_SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##[ \t]").unwrap());
// Link text may carry escaped brackets or one level of bare `[...]`; the
// target may hold balanced parentheses, as in `.../Rust_(fungus)`.
static RE_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[((?:\\.|\[[^\]\n]*\]|[^\[\]\\\n])+)\]\(((?i:https?)://(?:[^()\s]|\([^()\s]*\))+)\)",
    )
    .unwrap()
});

/// A draft split around its References section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencesSection<'a> {
    /// Everything up to and including the heading line and the blank lines
    /// directly after it.
    pub head: &'a str,
    /// The section body, up to the next `## ` heading or end of text.
    pub body: &'a str,
    /// The next section onwards; empty when References is last.
    pub tail: &'a str,
}

impl<'a> ReferencesSection<'a> {
    /// Find the first References heading. `None` when the draft has none.
    pub fn find(text: &'a str) -> Option<Self> {
        let heading = RE_REFERENCES_HEADING.find(text)?;

        let after_heading = &text[heading.end()..];
        let leading_ws = after_heading.len() - after_heading.trim_start().len();
        let head_end = match after_heading[..leading_ws].rfind('\n') {
            Some(newline) => heading.end() + newline + 1,
            None => heading.end() + leading_ws,
        };

        let rest = &text[head_end..];
        let body_end = RE_NEXT_SECTION
            .find(rest)
            .map(|m| head_end + m.start())
            .unwrap_or(text.len());

        Some(Self {
            head: &text[..head_end],
            body: &text[head_end..body_end],
            tail: &text[body_end..],
        })
    }

    /// Every `[title](http(s)://url)` in the section body, in order.
    pub fn citations(&self) -> Vec<Citation> {
        RE_CITATION
            .captures_iter(self.body)
            .map(|caps| Citation::new(unescape_link_text(caps[1].trim()), &caps[2]))
            .collect()
    }

    /// Rebuild the full text with the section body replaced by one
    /// `- [title](url)` line per reference. Head and tail are untouched.
    pub fn splice(&self, references: &[ReconciledReference]) -> String {
        let mut out = String::with_capacity(self.head.len() + self.tail.len() + references.len() * 96);
        out.push_str(self.head);
        if !self.head.ends_with('\n') {
            out.push('\n');
        }
        for reference in references {
            out.push_str(&reference.to_markdown());
            out.push('\n');
        }
        if !self.tail.is_empty() {
            out.push('\n');
            out.push_str(self.tail);
        }
        out
    }
}

/// Whether the draft carries a References heading on its own line.
pub fn has_references_section(text: &str) -> bool {
    RE_REFERENCES_HEADING.is_match(text)
}

/// Link targets cited in the References section; empty when there is none.
pub fn reference_links(text: &str) -> Vec<String> {
    ReferencesSection::find(text)
        .map(|section| section.citations().into_iter().map(|c| c.url).collect())
        .unwrap_or_default()
}
