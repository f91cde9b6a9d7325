// Test doubles for the editor pipeline.
//
// One mock per trait seam:
// - MockGenerator (TextGenerator): scripted sequence of results
// - MockProber (LinkProber): (url, method) -> status map
// - RecordingSleeper (Sleeper): records durations, never waits
// - FailingBackend / RecordingBackend (NotifyBackend)
//
// Plus helpers for building catalogs and drafts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use ai_client::{AiError, GenerationRequest, TextGenerator};
use draftguard_common::{CandidateSource, SourceOrigin};

use crate::checks::reachability::{LinkProber, ProbeMethod};
use crate::notify::{Notice, NoticeKind, NotifyBackend};
use crate::sleep::Sleeper;

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Returns scripted results in order, then `EmptyResponse` once exhausted.
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, AiError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(responses: Vec<Result<String, AiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Generator that answers a single call with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AiError::EmptyResponse))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

// ---------------------------------------------------------------------------
// MockProber
// ---------------------------------------------------------------------------

/// Status map keyed by `(url, method)`. Unregistered pairs fail as
/// transport errors, so an unscripted HEAD falls through to GET.
#[derive(Default)]
pub struct MockProber {
    responses: HashMap<(String, ProbeMethod), std::result::Result<u16, String>>,
    requests: Mutex<Vec<(String, ProbeMethod)>>,
}

impl MockProber {
    pub fn respond(
        mut self,
        url: &str,
        method: ProbeMethod,
        outcome: std::result::Result<u16, &str>,
    ) -> Self {
        self.responses
            .insert((url.to_string(), method), outcome.map_err(str::to_string));
        self
    }

    /// Every url answers HEAD with 200.
    pub fn all_reachable<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        urls.into_iter()
            .fold(Self::default(), |prober, url| prober.respond(url, ProbeMethod::Head, Ok(200)))
    }

    pub fn requests(&self) -> Vec<(String, ProbeMethod)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkProber for MockProber {
    async fn probe(&self, url: &str, method: ProbeMethod) -> Result<u16> {
        self.requests.lock().unwrap().push((url.to_string(), method));
        match self.responses.get(&(url.to_string(), method)) {
            Some(Ok(status)) => Ok(*status),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => bail!("no scripted {method} response for {url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Records every requested pause and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Notify backends
// ---------------------------------------------------------------------------

/// Backend whose every send fails.
pub struct FailingBackend;

#[async_trait]
impl NotifyBackend for FailingBackend {
    async fn send(&self, _notice: &Notice) -> Result<()> {
        bail!("channel unavailable")
    }
}

/// Backend that keeps every notice it receives. Clones share storage.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    sent: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingBackend {
    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NoticeKind> {
        self.sent().iter().map(|n| n.kind).collect()
    }
}

#[async_trait]
impl NotifyBackend for RecordingBackend {
    async fn send(&self, notice: &Notice) -> Result<()> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn source(title: &str, url: &str) -> CandidateSource {
    CandidateSource::new(title, url, SourceOrigin::Sample)
}

/// Catalog of `(title, url)` pairs in the given order.
pub fn catalog(entries: &[(&str, &str)]) -> Vec<CandidateSource> {
    entries.iter().map(|(title, url)| source(title, url)).collect()
}

/// Draft with the required sections, `filler` words of body text, and a
/// References section citing `citations`.
pub fn draft_with_references(citations: &[(&str, &str)], filler: usize) -> String {
    let mut body = String::from("A short intro paragraph about the week in plant science.\n\n");
    body.push_str("## Why this matters\n\n");
    body.push_str(&"insight ".repeat(filler));
    body.push_str("\n\n## What changed today\n\nNew results.\n\n## My research angle\n\nMy angle.\n\n## References\n\n");
    for (title, url) in citations {
        body.push_str(&format!("- [{title}]({url})\n"));
    }
    body
}
