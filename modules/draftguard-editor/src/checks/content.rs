// Advisory content verifications. They are recorded in the report but do
// not take part in the publish decision.

use std::sync::LazyLock;

use regex::Regex;

use draftguard_common::{ContentConfig, GuardResult};

use crate::reconcile::Reconciliation;

pub const ACCURACY_CHECK: &str = "Reference accuracy";
pub const WORD_COUNT_CHECK: &str = "Word count";
pub const SECTIONS_CHECK: &str = "Required sections";
pub const ARTIFACTS_CHECK: &str = "LLM artifacts";

static ARTIFACT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?m)^```", "Wrapping code fence"),
        (r"(?i)\bas an ai\b", "AI self-reference"),
        (r"(?i)\bi am an? (?:language|ai)\b", "AI self-reference"),
        (r"(?m)^# [^\n]+$", "Unexpected H1 heading (should start with intro paragraph)"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
    .collect()
});

pub fn check_reference_accuracy(reconciliation: &Reconciliation) -> GuardResult {
    let Reconciliation { replaced, kept, .. } = *reconciliation;
    if replaced > 0 {
        GuardResult::fail(
            ACCURACY_CHECK,
            format!("{replaced} hallucinated URL(s) replaced, {kept} total refs kept"),
        )
    } else {
        GuardResult::pass(ACCURACY_CHECK, format!("All {kept} references use real fetched URLs"))
    }
}

pub fn check_word_count(body: &str, min_words: usize, max_words: usize) -> GuardResult {
    let words = body.split_whitespace().count();
    let detail = format!("{words} words (expected {min_words}-{max_words})");
    if (min_words..=max_words).contains(&words) {
        GuardResult::pass(WORD_COUNT_CHECK, detail)
    } else {
        GuardResult::fail(WORD_COUNT_CHECK, detail)
    }
}

pub fn check_required_sections(body: &str, required: &[String]) -> GuardResult {
    let lowered = body.to_lowercase();
    let missing: Vec<&str> = required
        .iter()
        .filter(|section| !lowered.contains(&section.to_lowercase()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        GuardResult::pass(SECTIONS_CHECK, format!("All {} sections present", required.len()))
    } else {
        GuardResult::fail(SECTIONS_CHECK, format!("Missing: {}", missing.join(", ")))
    }
}

pub fn check_llm_artifacts(body: &str) -> GuardResult {
    let mut found: Vec<&str> = Vec::new();
    for &(ref pattern, label) in ARTIFACT_PATTERNS.iter() {
        if pattern.is_match(body) && !found.contains(&label) {
            found.push(label);
        }
    }

    if found.is_empty() {
        GuardResult::pass(ARTIFACTS_CHECK, "Clean")
    } else {
        GuardResult::fail(ARTIFACTS_CHECK, found.join("; "))
    }
}

/// Every content verification for a reconciled body, in report order.
pub fn verify_content(reconciliation: &Reconciliation, content: &ContentConfig) -> Vec<GuardResult> {
    let body = &reconciliation.body;
    vec![
        check_reference_accuracy(reconciliation),
        check_word_count(body, content.min_words, content.max_words),
        check_required_sections(body, &content.required_sections),
        check_llm_artifacts(body),
    ]
}
