use tracing::{info, warn};

use draftguard_common::{normalize_text, GuardResult};

use crate::corpus::PublishedDocument;

pub const SIMILARITY_GUARD: &str = "Similarity";

/// Alignment ratio of two normalized texts over their word sequences:
/// `1 - edit_distance / longer_length`, in [0, 1]. Identical inputs score 1.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        return 1.0;
    }
    let distance = strsim::generic_levenshtein(&tokens_a, &tokens_b);
    1.0 - distance as f64 / longest as f64
}

/// Closest published document to a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub ratio: f64,
    pub document: Option<String>,
}

/// Highest ratio between `candidate` and any non-empty published body.
pub fn max_similarity(candidate: &str, published: &[PublishedDocument]) -> SimilarityMatch {
    let candidate = normalize_text(candidate);
    let mut best = SimilarityMatch {
        ratio: 0.0,
        document: None,
    };

    for doc in published {
        let body = normalize_text(&doc.body);
        if body.is_empty() {
            continue;
        }
        let ratio = similarity_ratio(&candidate, &body);
        if ratio > best.ratio {
            best = SimilarityMatch {
                ratio,
                document: Some(doc.name.clone()),
            };
        }
    }
    best
}

pub fn check_similarity(candidate: &str, published: &[PublishedDocument], threshold: f64) -> GuardResult {
    let found = max_similarity(candidate, published);
    let closest = found
        .document
        .as_deref()
        .map(|name| format!(" (closest: {name})"))
        .unwrap_or_default();

    if found.ratio > threshold {
        warn!(ratio = found.ratio, threshold, "High similarity to published content");
        GuardResult::fail(
            SIMILARITY_GUARD,
            format!("Similarity {:.2} exceeds {threshold:.2}{closest}", found.ratio),
        )
    } else {
        info!(ratio = found.ratio, threshold, "Similarity check passed");
        GuardResult::pass(
            SIMILARITY_GUARD,
            format!("Max similarity {:.2} (threshold {threshold:.2}){closest}", found.ratio),
        )
    }
}
