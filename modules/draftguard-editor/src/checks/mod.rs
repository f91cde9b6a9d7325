pub mod content;
pub mod reachability;
pub mod similarity;
pub mod structural;

use draftguard_common::{GuardConfig, GuardResult};
use tracing::{info, warn};

use crate::corpus::PublishedDocument;
use crate::references::reference_links;
use crate::sleep::{secs, Sleeper};

use reachability::LinkProber;

/// The publication guards, run in a fixed order over a reconciled body.
pub struct QualityGuards<'a> {
    config: &'a GuardConfig,
    prober: &'a dyn LinkProber,
    sleeper: &'a dyn Sleeper,
}

impl<'a> QualityGuards<'a> {
    pub fn new(config: &'a GuardConfig, prober: &'a dyn LinkProber, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            config,
            prober,
            sleeper,
        }
    }

    /// One result per guard: References section, Reference links, Link
    /// reachability, Similarity. A failing guard never skips the others.
    pub async fn evaluate(&self, body: &str, published: &[PublishedDocument]) -> Vec<GuardResult> {
        let links = reference_links(body);
        info!(links = links.len(), published = published.len(), "Running quality guards");

        let results = vec![
            structural::check_references_section(body),
            structural::check_reference_links(body, self.config.min_reference_links),
            reachability::check_reachability(
                &links,
                self.config.check_link_reachability,
                self.prober,
                self.sleeper,
                secs(self.config.link_check_delay),
            )
            .await,
            similarity::check_similarity(body, published, self.config.max_similarity_ratio),
        ];

        for result in results.iter().filter(|r| !r.passed) {
            warn!(guard = result.name.as_str(), detail = result.detail.as_str(), "Quality guard failed");
        }
        results
    }
}

/// Publication is allowed when every guard passed, or when forced.
pub fn may_publish(guards: &[GuardResult], force: bool) -> bool {
    force || guards.iter().all(|g| g.passed)
}
