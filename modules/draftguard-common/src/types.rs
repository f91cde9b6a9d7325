use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DraftGuardError;
use crate::text::escape_link_text;

// =============================================================================
// Candidate sources
// =============================================================================

/// Where a candidate source was gathered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceOrigin {
    Arxiv,
    GoogleNews,
    Sample,
    Other(String),
}

impl From<String> for SourceOrigin {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().replace(|c: char| c == ' ' || c == '-', "_").as_str() {
            "arxiv" => Self::Arxiv,
            "google_news" | "googlenews" => Self::GoogleNews,
            "sample" => Self::Sample,
            _ => Self::Other(s),
        }
    }
}

impl From<SourceOrigin> for String {
    fn from(origin: SourceOrigin) -> Self {
        origin.to_string()
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arxiv => write!(f, "arXiv"),
            Self::GoogleNews => write!(f, "Google News"),
            Self::Sample => write!(f, "Sample"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A verified source eligible to back a citation. Produced by the gathering
/// step and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub title: String,
    #[serde(alias = "link")]
    pub url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(alias = "source")]
    pub origin: SourceOrigin,
    #[serde(default)]
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f64>,
}

impl CandidateSource {
    pub fn new(title: impl Into<String>, url: impl Into<String>, origin: SourceOrigin) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            origin,
            keyword: String::new(),
            rank_score: None,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

}

/// Parse a JSON array of candidate sources.
pub fn parse_catalog(json: &str) -> Result<Vec<CandidateSource>, DraftGuardError> {
    serde_json::from_str(json).map_err(|e| DraftGuardError::Catalog(e.to_string()))
}

// =============================================================================
// Citations
// =============================================================================

/// A `[title](url)` pair as written in generated text, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

impl Citation {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// How a reconciled reference came to be in the final list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Citation url already matched a catalog source; written back verbatim.
    Kept,
    /// Citation replaced by a catalog source with overlapping title.
    Replaced,
    /// Unused catalog source appended to reach the minimum link count.
    Backfilled,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kept => write!(f, "kept"),
            Self::Replaced => write!(f, "replaced"),
            Self::Backfilled => write!(f, "backfilled"),
        }
    }
}

/// An entry of the repaired reference list. `origin_source` is `None` only
/// for verbatim exact matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledReference {
    pub title: String,
    pub url: String,
    pub origin_source: Option<CandidateSource>,
    pub resolution: Resolution,
}

impl ReconciledReference {
    pub fn verbatim(citation: Citation) -> Self {
        Self {
            title: citation.title,
            url: citation.url,
            origin_source: None,
            resolution: Resolution::Kept,
        }
    }

    pub fn from_source(source: &CandidateSource, resolution: Resolution) -> Self {
        Self {
            title: source.title.clone(),
            url: source.url.clone(),
            origin_source: Some(source.clone()),
            resolution,
        }
    }

    /// Markdown bullet used when re-rendering the References section.
    /// Brackets in the title are escaped so the bullet parses back.
    pub fn to_markdown(&self) -> String {
        format!("- [{}]({})", escape_link_text(&self.title), self.url)
    }
}

// =============================================================================
// Guard results
// =============================================================================

/// Outcome of one guard or content verification in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl GuardResult {
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}
