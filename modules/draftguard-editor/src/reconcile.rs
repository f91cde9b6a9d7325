use std::collections::HashSet;

use tracing::info;

use ai_client::truncate_to_char_boundary;
use draftguard_common::{
    normalize_url, title_overlap, url_domain, CandidateSource, Citation, GuardConfig,
    ReconciledReference, Resolution,
};

use crate::references::ReferencesSection;

/// Thresholds and floor for one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOptions {
    pub min_links: usize,
    /// Title overlap a same-domain source must exceed.
    pub domain_threshold: f64,
    /// Title overlap any source must exceed when no same-domain source fits.
    pub global_threshold: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&GuardConfig::default())
    }
}

impl From<&GuardConfig> for ReconcileOptions {
    fn from(guards: &GuardConfig) -> Self {
        Self {
            min_links: guards.min_reference_links,
            domain_threshold: guards.domain_match_threshold,
            global_threshold: guards.global_match_threshold,
        }
    }
}

/// Result of repairing a draft's References section.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub body: String,
    pub references: Vec<ReconciledReference>,
    /// Citations swapped for a catalog source.
    pub replaced: usize,
    /// Final reference count: verbatim, replaced and backfilled entries.
    pub kept: usize,
}

impl Reconciliation {
    fn unchanged(body: &str) -> Self {
        Self {
            body: body.to_string(),
            references: Vec::new(),
            replaced: 0,
            kept: 0,
        }
    }

    /// Entries appended from the catalog to reach the minimum.
    pub fn backfilled(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.resolution == Resolution::Backfilled)
            .count()
    }
}

/// Catalog entry keyed by its comparison url. Duplicates and entries
/// without a url are dropped; first occurrence wins.
struct IndexedSource<'a> {
    key: String,
    source: &'a CandidateSource,
}

fn index_catalog(catalog: &[CandidateSource]) -> Vec<IndexedSource<'_>> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .filter(|s| !s.url.trim().is_empty())
        .filter_map(|source| {
            let key = normalize_url(&source.url);
            seen.insert(key.clone()).then_some(IndexedSource { key, source })
        })
        .collect()
}

/// Highest title overlap among unused sources accepted by `eligible`.
/// Ties go to the earliest catalog entry.
fn best_title_match<'c, 'a>(
    title: &str,
    catalog: &'c [IndexedSource<'a>],
    used: &HashSet<String>,
    eligible: impl Fn(&IndexedSource<'a>) -> bool,
) -> Option<(&'c IndexedSource<'a>, f64)> {
    let mut best: Option<(&IndexedSource, f64)> = None;
    for candidate in catalog {
        if used.contains(&candidate.key) || !eligible(candidate) {
            continue;
        }
        let score = title_overlap(title, &candidate.source.title);
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((candidate, score));
        }
    }
    best
}

enum Outcome<'c, 'a> {
    Exact(&'c IndexedSource<'a>),
    Repaired(&'c IndexedSource<'a>, f64),
    Dropped,
}

fn resolve<'c, 'a>(
    citation: &Citation,
    catalog: &'c [IndexedSource<'a>],
    used: &HashSet<String>,
    options: &ReconcileOptions,
) -> Outcome<'c, 'a> {
    let key = normalize_url(&citation.url);

    if let Some(exact) = catalog
        .iter()
        .find(|c| c.key == key && !used.contains(&c.key))
    {
        return Outcome::Exact(exact);
    }

    let domain = url_domain(&key);
    if let Some((candidate, score)) =
        best_title_match(&citation.title, catalog, used, |c| url_domain(&c.key) == domain)
    {
        if score > options.domain_threshold {
            return Outcome::Repaired(candidate, score);
        }
    }

    match best_title_match(&citation.title, catalog, used, |_| true) {
        Some((candidate, score)) if score > options.global_threshold => {
            Outcome::Repaired(candidate, score)
        }
        _ => Outcome::Dropped,
    }
}

/// Repair the References section of `body` against `catalog`.
///
/// Every surviving reference is backed by a catalog source, no source is
/// cited twice, and unused sources are appended in catalog order until
/// `min_links` is reached or the catalog runs out. A draft without a
/// References heading is returned unchanged with zero counts.
pub fn reconcile(
    body: &str,
    catalog: &[CandidateSource],
    options: &ReconcileOptions,
) -> Reconciliation {
    let Some(section) = ReferencesSection::find(body) else {
        return Reconciliation::unchanged(body);
    };

    let indexed = index_catalog(catalog);
    let mut used: HashSet<String> = HashSet::new();
    let mut references = Vec::new();
    let mut replaced = 0;

    for citation in section.citations() {
        match resolve(&citation, &indexed, &used, options) {
            Outcome::Exact(entry) => {
                used.insert(entry.key.clone());
                references.push(ReconciledReference::verbatim(citation));
            }
            Outcome::Repaired(entry, score) => {
                info!(
                    from = truncate_to_char_boundary(&citation.url, 60),
                    to = truncate_to_char_boundary(&entry.source.url, 60),
                    score = %format!("{score:.2}"),
                    "Replaced hallucinated reference"
                );
                used.insert(entry.key.clone());
                references.push(ReconciledReference::from_source(entry.source, Resolution::Replaced));
                replaced += 1;
            }
            Outcome::Dropped => {
                info!(
                    title = truncate_to_char_boundary(&citation.title, 40),
                    url = truncate_to_char_boundary(&citation.url, 60),
                    "Removed hallucinated reference (no catalog match)"
                );
            }
        }
    }

    if references.len() < options.min_links {
        for entry in &indexed {
            if references.len() >= options.min_links {
                break;
            }
            if used.insert(entry.key.clone()) {
                info!(
                    title = truncate_to_char_boundary(&entry.source.title, 60),
                    "Added missing reference"
                );
                references.push(ReconciledReference::from_source(entry.source, Resolution::Backfilled));
            }
        }
    }

    Reconciliation {
        body: section.splice(&references),
        kept: references.len(),
        replaced,
        references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftguard_common::SourceOrigin;

    fn source(title: &str, url: &str) -> CandidateSource {
        CandidateSource::new(title, url, SourceOrigin::Arxiv)
    }

    fn draft(citations: &[(&str, &str)]) -> String {
        let mut body = String::from("Intro paragraph.\n\n## References\n\n");
        for (title, url) in citations {
            body.push_str(&format!("- [{title}]({url})\n"));
        }
        body.push_str("\n## Closing\n\nThanks.\n");
        body
    }

    fn options(min_links: usize) -> ReconcileOptions {
        ReconcileOptions {
            min_links,
            ..ReconcileOptions::default()
        }
    }

    #[test]
    fn exact_match_is_kept_verbatim() {
        let catalog = vec![source("Soil microbiome survey", "https://arxiv.org/abs/1111")];
        let body = draft(&[("My own wording", "http://www.arxiv.org/abs/1111/")]);

        let result = reconcile(&body, &catalog, &options(1));

        assert_eq!(result.replaced, 0);
        assert_eq!(result.kept, 1);
        assert_eq!(result.references[0].title, "My own wording");
        assert_eq!(result.references[0].url, "http://www.arxiv.org/abs/1111/");
        assert_eq!(result.references[0].resolution, Resolution::Kept);
        assert!(result.references[0].origin_source.is_none());
        assert!(result.body.contains("- [My own wording](http://www.arxiv.org/abs/1111/)"));
    }

    #[test]
    fn same_domain_citation_is_repaired_above_domain_threshold() {
        // Citation tokens: {alpha, bravo, charlie, delta, echo, foxtrot, golf, hotel, india, juliet}
        // Source tokens share {alpha, bravo, charlie}: overlap 3/10 = 0.3.
        let catalog = vec![
            source("Unrelated paper on pumpkins", "https://other.org/p/1"),
            source(
                "alpha bravo charlie kilo lima mike november oscar papa quebec",
                "https://nature.com/articles/real-1",
            ),
        ];
        let body = draft(&[(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet",
            "https://www.nature.com/articles/made-up",
        )]);

        let result = reconcile(&body, &catalog, &options(1));

        assert_eq!(result.replaced, 1);
        assert_eq!(result.kept, 1);
        let reference = &result.references[0];
        assert_eq!(reference.url, "https://nature.com/articles/real-1");
        assert_eq!(reference.resolution, Resolution::Replaced);
        assert_eq!(reference.origin_source.as_ref().map(|s| s.url.as_str()), Some("https://nature.com/articles/real-1"));
        assert!(!result.body.contains("made-up"));
    }

    #[test]
    fn cross_domain_match_needs_global_threshold() {
        // Overlap 0.3 is enough on the same domain but not across domains.
        let catalog = vec![source(
            "alpha bravo charlie kilo lima mike november oscar papa quebec",
            "https://nature.com/articles/real-1",
        )];
        let body = draft(&[(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet",
            "https://science.org/doi/fake",
        )]);

        let result = reconcile(&body, &catalog, &options(0));

        assert_eq!(result.replaced, 0);
        assert_eq!(result.kept, 0);
    }

    #[test]
    fn cross_domain_match_above_global_threshold_is_repaired() {
        // {wheat, stem, rust, resistance} vs {wheat, stem, rust, outbreak}: 3/4 = 0.75
        let catalog = vec![source("Wheat stem rust outbreak", "https://news.example.com/rust")];
        let body = draft(&[("Wheat stem rust resistance", "https://fabricated.net/x")]);

        let result = reconcile(&body, &catalog, &options(0));

        assert_eq!(result.replaced, 1);
        assert_eq!(result.references[0].url, "https://news.example.com/rust");
    }

    #[test]
    fn unresolvable_citation_is_dropped() {
        // Best cross-domain overlap: {alpha} shared of 10 tokens = 0.1.
        let catalog = vec![source(
            "alpha kilo lima mike november oscar papa quebec romeo sierra",
            "https://nature.com/articles/real-1",
        )];
        let body = draft(&[(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet",
            "https://fabricated.net/x",
        )]);

        let result = reconcile(&body, &catalog, &options(0));

        assert_eq!(result.replaced, 0);
        assert_eq!(result.kept, 0);
        assert!(!result.body.contains("fabricated.net"));
    }

    #[test]
    fn backfill_tops_up_in_catalog_order() {
        let catalog = vec![
            source("One", "https://a.org/1"),
            source("Two", "https://a.org/2"),
            source("Three", "https://a.org/3"),
            source("Four", "https://a.org/4"),
            source("Five", "https://a.org/5"),
        ];
        let body = draft(&[("Two", "https://a.org/2"), ("Four", "https://a.org/4")]);

        let result = reconcile(&body, &catalog, &options(4));

        let urls: Vec<&str> = result.references.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.org/2", "https://a.org/4", "https://a.org/1", "https://a.org/3"]
        );
        assert_eq!(result.kept, 4);
        assert_eq!(result.backfilled(), 2);
    }

    #[test]
    fn backfill_stops_when_catalog_is_exhausted() {
        let catalog = vec![source("One", "https://a.org/1"), source("Two", "https://a.org/2")];
        let body = draft(&[]);

        let result = reconcile(&body, &catalog, &options(4));

        assert_eq!(result.kept, 2);
    }

    #[test]
    fn duplicate_citations_never_produce_duplicate_urls() {
        let catalog = vec![
            source("Rice blast resistance mapping", "https://a.org/1"),
            source("Rice blast resistance genes", "https://a.org/2"),
            source("Unrelated", "https://b.org/3"),
        ];
        let body = draft(&[
            ("Rice blast resistance mapping", "https://a.org/1"),
            ("Rice blast resistance mapping", "https://a.org/1/"),
            ("Rice blast resistance mapping", "https://www.a.org/1?ref=x"),
        ]);

        let result = reconcile(&body, &catalog, &options(4));

        let keys: Vec<String> = result.references.iter().map(|r| normalize_url(&r.url)).collect();
        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert_eq!(result.kept, 3);
        // Every reference is catalog-backed.
        let catalog_keys: HashSet<String> = catalog.iter().map(|s| normalize_url(&s.url)).collect();
        assert!(keys.iter().all(|k| catalog_keys.contains(k)));
    }

    #[test]
    fn ties_go_to_the_first_catalog_entry() {
        let catalog = vec![
            source("Cassava mosaic virus", "https://a.org/first"),
            source("Cassava mosaic virus", "https://a.org/second"),
        ];
        let body = draft(&[("Cassava mosaic virus", "https://a.org/fake")]);

        let result = reconcile(&body, &catalog, &options(1));

        assert_eq!(result.references[0].url, "https://a.org/first");
    }

    #[test]
    fn catalog_duplicates_count_once() {
        let catalog = vec![
            source("One", "https://a.org/1"),
            source("One again", "http://www.a.org/1/"),
            source("", ""),
        ];
        let result = reconcile(&draft(&[]), &catalog, &options(4));
        assert_eq!(result.kept, 1);
        assert_eq!(result.references[0].title, "One");
    }

    #[test]
    fn missing_section_returns_input_unchanged() {
        let body = "Intro only.\n\n## Why this matters\n\nNo references here.\n";
        let catalog = vec![source("One", "https://a.org/1")];

        let result = reconcile(body, &catalog, &options(4));

        assert_eq!(result.body, body);
        assert_eq!(result.replaced, 0);
        assert_eq!(result.kept, 0);
    }

    #[test]
    fn surrounding_text_is_untouched() {
        let catalog = vec![source("One", "https://a.org/1")];
        let body = draft(&[("One", "https://a.org/1")]);

        let result = reconcile(&body, &catalog, &options(1));

        assert!(result.body.starts_with("Intro paragraph.\n\n## References\n\n"));
        assert!(result.body.ends_with("\n\n## Closing\n\nThanks.\n"));
    }
}
