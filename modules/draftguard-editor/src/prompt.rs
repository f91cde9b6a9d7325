use draftguard_common::{escape_link_text, CandidateSource, ContentConfig};

/// Numbered markdown list of the sources a draft may cite.
pub fn markdown_links(sources: &[CandidateSource]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let keyword = if s.keyword.is_empty() {
                String::new()
            } else {
                format!(", keyword: `{}`", s.keyword)
            };
            format!(
                "{}. [{}]({}) ({}{keyword})",
                i + 1,
                escape_link_text(&s.title),
                s.url,
                s.origin
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inputs for one generation prompt.
pub struct PromptContext<'a> {
    pub site_title: &'a str,
    pub today: &'a str,
    pub keywords: &'a [String],
    pub sources: &'a [CandidateSource],
    pub content: &'a ContentConfig,
    pub min_links: usize,
}

/// Generation prompt asking for an MDX body that cites only the listed
/// sources.
pub fn build_prompt(ctx: &PromptContext<'_>) -> String {
    let sections = ctx.content.required_sections.join(", ");
    let keywords = if ctx.keywords.is_empty() {
        "(none given)".to_string()
    } else {
        ctx.keywords.join(", ")
    };

    format!(
        "You are writing a blog post draft for {site}.
Date: {today}

Required outcome:
- Return valid MDX body content only (no frontmatter block).
- Start with a short intro paragraph (no top-level # heading).
- Include sections: {sections}.
- Keep factual claims grounded in provided sources.
- Tone: professional, thoughtful, suitable for a personal research website.
- Keep it concise ({min}-{max} words).

References section rules:
- In the ## References section, use ONLY the exact URLs from the \"Source links\" list below.
- Copy each URL verbatim. Do not modify, shorten, generalize, or invent any URL.
- Do not link to journal homepages; use the specific article URLs provided.
- Do not cite anything that is not in the source list.
- Every reference must use the markdown format: - [Title](exact_url_from_list)
- Include at least {min_links} references from the provided sources.

Author keyword profile:
{keywords}

Source links:
{links}",
        site = ctx.site_title,
        today = ctx.today,
        min = ctx.content.min_words,
        max = ctx.content.max_words,
        min_links = ctx.min_links,
        links = markdown_links(ctx.sources),
    )
}
