use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use ai_client::{AiError, GenerationRequest, TextGenerator};
use draftguard_common::LlmConfig;

use crate::sleep::{secs, Sleeper};

/// How a failed generation call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Credentials rejected; retrying cannot help.
    Fatal,
    /// Rate limit, timeout, connection or server failure.
    Retryable,
    /// Anything else. Treated as fatal so unexpected errors surface.
    Unknown,
}

pub fn classify(error: &AiError) -> FailureClass {
    match error {
        AiError::Authentication { .. } => FailureClass::Fatal,
        AiError::RateLimited(_)
        | AiError::Timeout(_)
        | AiError::Connection(_)
        | AiError::Server { .. } => FailureClass::Retryable,
        _ => FailureClass::Unknown,
    }
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("generation failed with a non-retryable error: {0}")]
    Fatal(#[source] AiError),

    #[error("generation failed with an unclassified error: {0}")]
    Unclassified(#[source] AiError),

    #[error("generation failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: AiError,
    },
}

impl RetryError {
    /// The underlying provider error.
    pub fn cause(&self) -> &AiError {
        match self {
            Self::Fatal(e) | Self::Unclassified(e) => e,
            Self::Exhausted { last, .. } => last,
        }
    }
}

/// Attempt budget and exponential backoff base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl From<&LlmConfig> for RetryPolicy {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            max_retries: llm.max_retries,
            base_delay: secs(llm.retry_base_delay),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Pause after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Every pause a fully failing run would take. There is no pause after
    /// the final attempt, so this has `attempts() - 1` entries.
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.attempts()).map(|n| self.delay_for(n)).collect()
    }
}

/// Call the generator until it succeeds, a non-retryable error occurs, or
/// the attempt budget runs out.
pub async fn call_with_retry(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<String, RetryError> {
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let error = match generator.generate(request).await {
            Ok(text) => {
                if attempt > 1 {
                    info!(attempt, model = generator.model_name(), "Generation succeeded after retry");
                }
                return Ok(text);
            }
            Err(e) => e,
        };

        match classify(&error) {
            FailureClass::Fatal => {
                warn!(attempt, error = %error, "Generation failed, not retrying");
                return Err(RetryError::Fatal(error));
            }
            FailureClass::Unknown => {
                warn!(attempt, error = %error, "Unclassified generation error, not retrying");
                return Err(RetryError::Unclassified(error));
            }
            FailureClass::Retryable if attempt >= attempts => {
                warn!(attempts, error = %error, "Generation retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts,
                    last: error,
                });
            }
            FailureClass::Retryable => {
                let backoff = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    backoff_secs = backoff.as_secs_f64(),
                    error = %error,
                    "Transient generation failure, retrying after backoff"
                );
                sleeper.sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGenerator, RecordingSleeper};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(2),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::from_prompt("Write the post.")
    }

    #[test]
    fn classification_is_closed_over_provider_errors() {
        let auth = AiError::Authentication {
            status: 401,
            body: "bad key".into(),
        };
        assert_eq!(classify(&auth), FailureClass::Fatal);
        assert_eq!(classify(&AiError::RateLimited("slow down".into())), FailureClass::Retryable);
        assert_eq!(classify(&AiError::Timeout("read".into())), FailureClass::Retryable);
        assert_eq!(classify(&AiError::Connection("refused".into())), FailureClass::Retryable);
        assert_eq!(
            classify(&AiError::Server {
                status: 503,
                body: String::new()
            }),
            FailureClass::Retryable
        );
        assert_eq!(classify(&AiError::Parse("eof".into())), FailureClass::Unknown);
        assert_eq!(
            classify(&AiError::Api {
                status: 400,
                body: String::new()
            }),
            FailureClass::Unknown
        );
    }

    #[test]
    fn delay_sequence_doubles() {
        assert_eq!(policy(3).delays(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
        assert_eq!(policy(1).delays(), Vec::<Duration>::new());
        assert_eq!(policy(0).delays(), Vec::<Duration>::new());
        assert_eq!(policy(5).delay_for(4), Duration::from_secs(16));
    }

    #[test]
    fn policy_reads_llm_config() {
        let llm = LlmConfig {
            max_retries: 5,
            retry_base_delay: 0.25,
            ..LlmConfig::default()
        };
        let policy = RetryPolicy::from(&llm);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn oversized_base_delay_saturates() {
        let llm = LlmConfig {
            retry_base_delay: 1e20,
            ..LlmConfig::default()
        };
        let policy = RetryPolicy::from(&llm);
        assert_eq!(policy.base_delay, Duration::MAX);
        assert_eq!(policy.delay_for(3), Duration::MAX);
    }

    #[tokio::test]
    async fn two_transient_failures_then_success() {
        let generator = MockGenerator::new(vec![
            Err(AiError::RateLimited("429".into())),
            Err(AiError::Timeout("timed out".into())),
            Ok("draft".into()),
        ]);
        let sleeper = RecordingSleeper::default();

        let text = call_with_retry(&generator, &request(), &policy(3), &sleeper)
            .await
            .unwrap();

        assert_eq!(text, "draft");
        assert_eq!(generator.calls(), 3);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn authentication_failure_is_immediate() {
        let generator = MockGenerator::new(vec![
            Err(AiError::Authentication {
                status: 401,
                body: "invalid api key".into(),
            }),
            Ok("never reached".into()),
        ]);
        let sleeper = RecordingSleeper::default();

        let err = call_with_retry(&generator, &request(), &policy(10), &sleeper)
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Fatal(AiError::Authentication { .. })));
        assert_eq!(generator.calls(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn unknown_failure_is_not_retried() {
        let generator = MockGenerator::new(vec![Err(AiError::EmptyResponse), Ok("x".into())]);
        let sleeper = RecordingSleeper::default();

        let err = call_with_retry(&generator, &request(), &policy(3), &sleeper)
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Unclassified(AiError::EmptyResponse)));
        assert_eq!(generator.calls(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_wraps_last_cause_without_trailing_sleep() {
        let generator = MockGenerator::new(vec![
            Err(AiError::Connection("reset".into())),
            Err(AiError::Connection("reset".into())),
            Err(AiError::Server {
                status: 502,
                body: "bad gateway".into(),
            }),
        ]);
        let sleeper = RecordingSleeper::default();

        let err = call_with_retry(&generator, &request(), &policy(3), &sleeper)
            .await
            .unwrap_err();

        match &err {
            RetryError::Exhausted { attempts, last } => {
                assert_eq!(*attempts, 3);
                assert!(matches!(last, AiError::Server { status: 502, .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert!(err.to_string().contains("3 attempt(s)"));
        assert_eq!(generator.calls(), 3);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn zero_budget_still_attempts_once() {
        let generator = MockGenerator::new(vec![Err(AiError::Timeout("t".into()))]);
        let sleeper = RecordingSleeper::default();

        let err = call_with_retry(&generator, &request(), &policy(0), &sleeper)
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
        assert!(sleeper.slept().is_empty());
    }
}
