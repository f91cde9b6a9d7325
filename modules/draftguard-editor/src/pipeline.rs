use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use ai_client::{strip_code_blocks, GenerationRequest, TextGenerator};
use draftguard_common::{CandidateSource, EditorialConfig, GuardResult, ReconciledReference};

use crate::checks::content::verify_content;
use crate::checks::reachability::LinkProber;
use crate::checks::{may_publish, QualityGuards};
use crate::corpus::{split_frontmatter, strip_pending_marker, PublishedDocument};
use crate::reconcile::{reconcile, ReconcileOptions};
use crate::report::DiagnosticReport;
use crate::retry::{call_with_retry, RetryError, RetryPolicy};
use crate::sanitize::sanitize_mdx;
use crate::sleep::Sleeper;

pub const GENERATION_STEP: &str = "Draft generation";
pub const RECONCILE_STEP: &str = "Reference reconciliation";
pub const VERIFY_STEP: &str = "Content verification";
pub const GUARDS_STEP: &str = "Quality guards";

/// A run that stopped before guards could decide. The report records the
/// failing step so diagnostics survive the error.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    #[source]
    pub error: RetryError,
    pub report: DiagnosticReport,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Front matter carried over from an existing draft; empty for
    /// generated drafts.
    pub frontmatter: String,
    /// Reconciled and sanitized body.
    pub body: String,
    pub references: Vec<ReconciledReference>,
    pub replaced: usize,
    pub kept: usize,
    pub guards: Vec<GuardResult>,
    pub report: DiagnosticReport,
    /// All guards passed, or the run was forced.
    pub publishable: bool,
}

impl PipelineOutcome {
    /// Front matter followed by the body, ready to write back to disk.
    pub fn document(&self) -> String {
        if self.frontmatter.is_empty() {
            format!("{}\n", self.body)
        } else {
            format!("{}\n{}\n", self.frontmatter, self.body)
        }
    }
}

/// Inputs shared by both entry points.
pub struct RunInput<'a> {
    pub catalog: &'a [CandidateSource],
    pub published: &'a [PublishedDocument],
    /// Publish even when guards fail.
    pub force: bool,
}

/// Sequential editorial run: generation, reconciliation, verification,
/// guards, decision. Every stage is awaited in turn.
pub struct DraftPipeline<'a> {
    config: &'a EditorialConfig,
    prober: &'a dyn LinkProber,
    sleeper: &'a dyn Sleeper,
}

impl<'a> DraftPipeline<'a> {
    pub fn new(config: &'a EditorialConfig, prober: &'a dyn LinkProber, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            config,
            prober,
            sleeper,
        }
    }

    /// Generate a draft from `prompt`, then repair and judge it.
    pub async fn generate(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
        input: &RunInput<'_>,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        let mut report = DiagnosticReport::new();
        let request = GenerationRequest::from_prompt(prompt).temperature(self.config.llm.temperature);
        let policy = RetryPolicy::from(&self.config.llm);

        info!(run_id = %report.run_id, model = generator.model_name(), "Generating draft");
        let started = Instant::now();
        let text = match call_with_retry(generator, &request, &policy, self.sleeper).await {
            Ok(text) => text,
            Err(e) => {
                report.add_step(GENERATION_STEP, false, started.elapsed().as_secs_f64(), e.to_string());
                error!(error = %e, "Draft generation failed");
                return Err(PipelineFailure { error: e, report });
            }
        };
        let elapsed = started.elapsed().as_secs_f64();
        let words = text.split_whitespace().count();
        report.add_step(
            GENERATION_STEP,
            true,
            elapsed,
            format!("{words} words via {}", generator.model_name()),
        );
        info!(words, elapsed_secs = elapsed, "Draft generated");

        Ok(self.review(String::new(), &text, input, report).await)
    }

    /// Repair and judge an existing draft file's contents. Front matter and
    /// the pending-approval banner are set aside before any check runs.
    pub async fn verify(&self, raw: &str, input: &RunInput<'_>) -> PipelineOutcome {
        let (frontmatter, body) = split_frontmatter(raw);
        let body = strip_pending_marker(body);
        let report = DiagnosticReport::new();
        info!(run_id = %report.run_id, "Verifying existing draft");
        self.review(frontmatter.trim_end().to_string(), &body, input, report)
            .await
    }

    async fn review(
        &self,
        frontmatter: String,
        text: &str,
        input: &RunInput<'_>,
        mut report: DiagnosticReport,
    ) -> PipelineOutcome {
        let text = if text.trim_start().starts_with("```") {
            info!("Stripped wrapping code fence from draft");
            strip_code_blocks(text)
        } else {
            text.trim()
        };

        let started = Instant::now();
        let options = ReconcileOptions::from(&self.config.guards);
        let reconciliation = reconcile(text, input.catalog, &options);
        report.add_step(
            RECONCILE_STEP,
            true,
            started.elapsed().as_secs_f64(),
            format!(
                "{} replaced, {} kept",
                reconciliation.replaced, reconciliation.kept
            ),
        );

        let started = Instant::now();
        for result in verify_content(&reconciliation, &self.config.content) {
            report.add_verify(result);
        }
        report.add_step(VERIFY_STEP, true, started.elapsed().as_secs_f64(), "All checks recorded");

        let body = sanitize_mdx(&reconciliation.body);

        let started = Instant::now();
        let guards = QualityGuards::new(&self.config.guards, self.prober, self.sleeper)
            .evaluate(&body, input.published)
            .await;
        let passed = guards.iter().filter(|g| g.passed).count();
        for guard in &guards {
            report.add_verify(guard.clone());
        }
        report.add_step(
            GUARDS_STEP,
            true,
            started.elapsed().as_secs_f64(),
            format!("{passed} of {} guards passed", guards.len()),
        );

        let publishable = may_publish(&guards, input.force);
        if input.force && passed < guards.len() {
            warn!(failed = guards.len() - passed, "Guards failed, publication forced");
        }
        info!(
            publishable,
            replaced = reconciliation.replaced,
            kept = reconciliation.kept,
            "Run complete"
        );

        PipelineOutcome {
            frontmatter,
            body,
            references: reconciliation.references,
            replaced: reconciliation.replaced,
            kept: reconciliation.kept,
            guards,
            report,
            publishable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, draft_with_references, MockGenerator, MockProber, RecordingSleeper};
    use ai_client::AiError;
    use draftguard_common::GuardConfig;

    fn config() -> EditorialConfig {
        EditorialConfig {
            guards: GuardConfig {
                check_link_reachability: false,
                ..GuardConfig::default()
            },
            ..EditorialConfig::default()
        }
    }

    #[tokio::test]
    async fn generation_failure_is_recorded_before_returning() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let generator = MockGenerator::new(vec![Err(AiError::Authentication {
            status: 401,
            body: "bad key".into(),
        })]);
        let input = RunInput {
            catalog: &[],
            published: &[],
            force: false,
        };

        let failure = DraftPipeline::new(&config, &prober, &sleeper)
            .generate(&generator, "prompt", &input)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RetryError::Fatal(_)));
        assert_eq!(failure.report.steps.len(), 1);
        assert_eq!(failure.report.steps[0].name, GENERATION_STEP);
        assert!(!failure.report.steps[0].ok);
        let text = failure.report.summary_text();
        assert!(text.contains("[FAIL] Draft generation"));
        assert!(text.contains("Draft generation failed. Check the API key"));
    }

    #[tokio::test]
    async fn fenced_output_is_unwrapped_and_checked() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let sources = catalog(&[
            ("One", "https://a.org/1"),
            ("Two", "https://a.org/2"),
            ("Three", "https://a.org/3"),
            ("Four", "https://a.org/4"),
        ]);
        let draft = draft_with_references(&[("One", "https://a.org/1")], 720);
        let generator = MockGenerator::replying(format!("```mdx\n{draft}```"));
        let input = RunInput {
            catalog: &sources,
            published: &[],
            force: false,
        };

        let outcome = DraftPipeline::new(&config, &prober, &sleeper)
            .generate(&generator, "prompt", &input)
            .await
            .unwrap();

        assert!(!outcome.body.contains("```"));
        assert_eq!(outcome.kept, 4);
        assert!(outcome.publishable);
        assert!(outcome.report.all_steps_ok());
        assert!(outcome.report.all_checks_passed(), "{}", outcome.report.summary_text());
        let step_names: Vec<&str> = outcome.report.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(step_names, vec![GENERATION_STEP, RECONCILE_STEP, VERIFY_STEP, GUARDS_STEP]);
        assert_eq!(generator.requests()[0].temperature, Some(0.4));
    }

    #[tokio::test]
    async fn verify_keeps_frontmatter_and_drops_pending_banner() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let sources = catalog(&[("One", "https://a.org/1")]);
        let raw = format!(
            "---\ntitle: \"Draft\"\n---\n\n> Status: PENDING_APPROVAL\n\n{}",
            draft_with_references(&[("One", "https://a.org/1")], 10)
        );
        let input = RunInput {
            catalog: &sources,
            published: &[],
            force: false,
        };

        let outcome = DraftPipeline::new(&config, &prober, &sleeper).verify(&raw, &input).await;

        assert_eq!(outcome.frontmatter, "---\ntitle: \"Draft\"\n---");
        assert!(!outcome.body.contains("PENDING_APPROVAL"));
        assert!(outcome.document().starts_with("---\ntitle: \"Draft\"\n---\nA short intro"));
        // One reference against a floor of four blocks publication.
        assert!(!outcome.publishable);
    }

    #[tokio::test]
    async fn force_overrides_failed_guards() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let input = RunInput {
            catalog: &[],
            published: &[],
            force: true,
        };

        let outcome = DraftPipeline::new(&config, &prober, &sleeper)
            .verify("Just an intro, no references.", &input)
            .await;

        assert!(outcome.guards.iter().any(|g| !g.passed));
        assert!(outcome.publishable);
    }

    #[tokio::test]
    async fn content_checks_are_advisory() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let sources = catalog(&[
            ("One", "https://a.org/1"),
            ("Two", "https://a.org/2"),
            ("Three", "https://a.org/3"),
            ("Four", "https://a.org/4"),
        ]);
        // Too short for the word count check, but every guard passes.
        let draft = draft_with_references(&[("One", "https://a.org/1")], 5);
        let input = RunInput {
            catalog: &sources,
            published: &[],
            force: false,
        };

        let outcome = DraftPipeline::new(&config, &prober, &sleeper).verify(&draft, &input).await;

        assert!(!outcome.report.all_checks_passed());
        assert!(outcome.guards.iter().all(|g| g.passed));
        assert!(outcome.publishable);
    }

    #[tokio::test]
    async fn backfilled_bracketed_titles_count_toward_link_guard() {
        let config = config();
        let prober = MockProber::default();
        let sleeper = RecordingSleeper::default();
        let sources = catalog(&[
            ("[Preprint] Paper 1", "https://a.org/1"),
            ("[Preprint] Paper 2", "https://a.org/2"),
            ("[Preprint] Paper 3", "https://a.org/3"),
            ("[Preprint] Paper 4", "https://a.org/4"),
        ]);
        let draft = draft_with_references(&[], 720);
        let input = RunInput {
            catalog: &sources,
            published: &[],
            force: false,
        };

        let outcome = DraftPipeline::new(&config, &prober, &sleeper).verify(&draft, &input).await;

        assert_eq!(outcome.kept, 4);
        let links = outcome.guards.iter().find(|g| g.name == "Reference links").unwrap();
        assert!(links.passed, "{}", links.detail);
        assert!(outcome.publishable);
    }
}
