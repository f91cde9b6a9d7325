use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use ai_client::truncate_to_char_boundary;
use draftguard_common::GuardResult;

use crate::sleep::Sleeper;

pub const REACHABILITY_GUARD: &str = "Link reachability";

/// Bad links named in a failing detail.
const MAX_REPORTED: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    Head,
    Get,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "HEAD"),
            Self::Get => write!(f, "GET"),
        }
    }
}

/// Issues one request against a link and reports the final status code
/// after redirects. Transport failures are returned as errors.
#[async_trait]
pub trait LinkProber: Send + Sync {
    async fn probe(&self, url: &str, method: ProbeMethod) -> Result<u16>;
}

/// `reqwest`-backed prober with a hard per-request timeout.
pub struct HttpProber {
    http: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("draftguard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl LinkProber for HttpProber {
    async fn probe(&self, url: &str, method: ProbeMethod) -> Result<u16> {
        let request = match method {
            ProbeMethod::Head => self.http.head(url),
            ProbeMethod::Get => self.http.get(url),
        };
        let resp = request.send().await?;
        Ok(resp.status().as_u16())
    }
}

fn is_reachable(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Why a link was judged bad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFailure {
    Status(u16),
    Error,
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "{status}"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// HEAD first; a GET settles anything HEAD could not confirm.
async fn probe_link(prober: &dyn LinkProber, url: &str) -> Option<LinkFailure> {
    match prober.probe(url, ProbeMethod::Head).await {
        Ok(status) if is_reachable(status) => return None,
        Ok(status) => info!(url, status, "HEAD inconclusive, retrying with GET"),
        Err(e) => info!(url, error = %e, "HEAD failed, retrying with GET"),
    }

    match prober.probe(url, ProbeMethod::Get).await {
        Ok(status) if is_reachable(status) => None,
        Ok(status) => {
            warn!(url, status, "Unreachable reference link");
            Some(LinkFailure::Status(status))
        }
        Err(e) => {
            warn!(url, error = %e, "Error reaching reference link");
            Some(LinkFailure::Error)
        }
    }
}

/// Probe every link in order, pausing `delay` between consecutive probes.
pub async fn find_unreachable(
    links: &[String],
    prober: &dyn LinkProber,
    sleeper: &dyn Sleeper,
    delay: Duration,
) -> Vec<(String, LinkFailure)> {
    let mut bad = Vec::new();
    for (i, url) in links.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            sleeper.sleep(delay).await;
        }
        info!(
            link = i + 1,
            total = links.len(),
            url = truncate_to_char_boundary(url, 80),
            "Checking link"
        );
        if let Some(failure) = probe_link(prober, url).await {
            bad.push((url.clone(), failure));
        }
    }
    bad
}

/// Reachability guard over the reference links of a reconciled body.
pub async fn check_reachability(
    links: &[String],
    enabled: bool,
    prober: &dyn LinkProber,
    sleeper: &dyn Sleeper,
    delay: Duration,
) -> GuardResult {
    if !enabled {
        return GuardResult::pass(REACHABILITY_GUARD, "Skipped (disabled)");
    }
    if links.is_empty() {
        return GuardResult::pass(REACHABILITY_GUARD, "No reference links to check");
    }

    let bad = find_unreachable(links, prober, sleeper, delay).await;
    if bad.is_empty() {
        info!(count = links.len(), "All reference links reachable");
        return GuardResult::pass(
            REACHABILITY_GUARD,
            format!("All {} links reachable", links.len()),
        );
    }

    let preview = bad
        .iter()
        .take(MAX_REPORTED)
        .map(|(url, failure)| format!("{url} ({failure})"))
        .collect::<Vec<_>>()
        .join(", ");
    GuardResult::fail(REACHABILITY_GUARD, preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProber, RecordingSleeper};

    fn links(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn disabled_guard_passes_without_probing() {
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();

        let result = check_reachability(&links(&["https://a.org"]), false, &prober, &sleeper, Duration::from_millis(500)).await;

        assert!(result.passed);
        assert!(result.detail.starts_with("Skipped"));
        assert!(prober.requests().is_empty());
    }

    #[tokio::test]
    async fn head_failure_falls_back_to_get() {
        let prober = MockProber::default()
            .respond("https://a.org/x", ProbeMethod::Head, Ok(405))
            .respond("https://a.org/x", ProbeMethod::Get, Ok(200));
        let sleeper = RecordingSleeper::default();

        let result = check_reachability(&links(&["https://a.org/x"]), true, &prober, &sleeper, Duration::ZERO).await;

        assert!(result.passed);
        assert_eq!(
            prober.requests(),
            vec![
                ("https://a.org/x".to_string(), ProbeMethod::Head),
                ("https://a.org/x".to_string(), ProbeMethod::Get),
            ]
        );
    }

    #[tokio::test]
    async fn head_transport_error_still_tries_get() {
        let prober = MockProber::default()
            .respond("https://a.org/x", ProbeMethod::Head, Err("connection reset"))
            .respond("https://a.org/x", ProbeMethod::Get, Ok(301));
        let sleeper = RecordingSleeper::default();

        let result = check_reachability(&links(&["https://a.org/x"]), true, &prober, &sleeper, Duration::ZERO).await;

        assert!(result.passed);
    }

    #[tokio::test]
    async fn successful_head_skips_get() {
        let prober = MockProber::default().respond("https://a.org", ProbeMethod::Head, Ok(204));
        let sleeper = RecordingSleeper::default();

        check_reachability(&links(&["https://a.org"]), true, &prober, &sleeper, Duration::ZERO).await;

        assert_eq!(prober.requests().len(), 1);
    }

    #[tokio::test]
    async fn detail_lists_first_three_bad_links() {
        let urls = ["https://a.org/1", "https://a.org/2", "https://a.org/3", "https://a.org/4"];
        let prober = MockProber::default()
            .respond(urls[0], ProbeMethod::Get, Ok(404))
            .respond(urls[1], ProbeMethod::Get, Err("dns"))
            .respond(urls[2], ProbeMethod::Get, Ok(500))
            .respond(urls[3], ProbeMethod::Get, Ok(403));
        let sleeper = RecordingSleeper::default();

        let result = check_reachability(&links(&urls), true, &prober, &sleeper, Duration::ZERO).await;

        assert!(!result.passed);
        assert_eq!(
            result.detail,
            "https://a.org/1 (404), https://a.org/2 (error), https://a.org/3 (500)"
        );
    }

    #[tokio::test]
    async fn delay_only_between_probes() {
        let urls = ["https://a.org/1", "https://a.org/2", "https://a.org/3"];
        let mut prober = MockProber::default();
        for url in urls {
            prober = prober.respond(url, ProbeMethod::Head, Ok(200));
        }
        let sleeper = RecordingSleeper::default();

        check_reachability(&links(&urls), true, &prober, &sleeper, Duration::from_millis(500)).await;

        assert_eq!(sleeper.slept(), vec![Duration::from_millis(500); 2]);
    }

    #[tokio::test]
    async fn no_links_passes() {
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let result = check_reachability(&[], true, &prober, &sleeper, Duration::ZERO).await;
        assert!(result.passed);
    }
}
