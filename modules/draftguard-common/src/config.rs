use std::env;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::error::DraftGuardError;

/// TOML-backed editorial configuration. Every key is optional; secrets stay
/// in environment variables (see [`Secrets`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorialConfig {
    pub site: SiteConfig,
    pub guards: GuardConfig,
    pub llm: LlmConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Research Notes".to_string(),
        }
    }
}

/// Quality-guard and reconciliation knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Floor for the structural guard and the reconciler's backfill.
    pub min_reference_links: usize,
    pub check_link_reachability: bool,
    pub link_timeout_seconds: u64,
    /// Pause between sequential reachability probes, in seconds.
    pub link_check_delay: f64,
    pub max_similarity_ratio: f64,
    /// Title overlap a same-domain candidate must exceed to replace a citation.
    pub domain_match_threshold: f64,
    /// Title overlap any candidate must exceed to replace a citation.
    pub global_match_threshold: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_reference_links: 4,
            check_link_reachability: true,
            link_timeout_seconds: 8,
            link_check_delay: 0.5,
            max_similarity_ratio: 0.72,
            domain_match_threshold: 0.2,
            global_match_threshold: 0.4,
        }
    }
}

/// Generation call settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub model: String,
    pub max_retries: u32,
    /// Base backoff in seconds; attempt n waits `base * 2^(n-1)`.
    pub retry_base_delay: f64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_retries: 3,
            retry_base_delay: 2.0,
            temperature: 0.4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    pub min_words: usize,
    pub max_words: usize,
    pub required_sections: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_words: 700,
            max_words: 1100,
            required_sections: vec![
                "## Why this matters".to_string(),
                "## What changed today".to_string(),
                "## My research angle".to_string(),
                "## References".to_string(),
            ],
        }
    }
}

/// Upper bound for configured pauses.
const MAX_DELAY_SECONDS: f64 = 3600.0;

impl EditorialConfig {
    /// Reject settings no run could satisfy.
    pub fn validate(&self) -> Result<(), DraftGuardError> {
        let ratios = [
            ("guards.max_similarity_ratio", self.guards.max_similarity_ratio),
            ("guards.domain_match_threshold", self.guards.domain_match_threshold),
            ("guards.global_match_threshold", self.guards.global_match_threshold),
        ];
        for (key, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(DraftGuardError::Config(format!(
                    "{key} must be within [0, 1], got {value}"
                )));
            }
        }
        let delays = [
            ("guards.link_check_delay", self.guards.link_check_delay),
            ("llm.retry_base_delay", self.llm.retry_base_delay),
        ];
        for (key, value) in delays {
            if !(0.0..=MAX_DELAY_SECONDS).contains(&value) {
                return Err(DraftGuardError::Config(format!(
                    "{key} must be within [0, {MAX_DELAY_SECONDS}] seconds, got {value}"
                )));
            }
        }
        if self.guards.link_timeout_seconds == 0 {
            return Err(DraftGuardError::Config(
                "guards.link_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.content.min_words > self.content.max_words {
            return Err(DraftGuardError::Config(format!(
                "content.min_words ({}) exceeds content.max_words ({})",
                self.content.min_words, self.content.max_words
            )));
        }
        Ok(())
    }
}

/// Parse and validate a TOML config string.
pub fn parse_config(content: &str) -> Result<EditorialConfig, DraftGuardError> {
    let config: EditorialConfig =
        toml::from_str(content).map_err(|e| DraftGuardError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<EditorialConfig, DraftGuardError> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Credentials and endpoints read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub slack_webhook_url: Option<String>,
    /// Separate channel for failure reports; falls back to `slack_webhook_url`.
    pub slack_webhook_url_failures: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: optional_env("OPENAI_API_KEY"),
            slack_webhook_url: optional_env("SLACK_WEBHOOK_URL"),
            slack_webhook_url_failures: optional_env("SLACK_WEBHOOK_URL_FAILURES"),
        }
    }

    /// Log which secrets are present without printing their values.
    pub fn log_redacted(&self) {
        info!(
            openai_api_key = redact(&self.openai_api_key),
            slack_webhook_url = redact(&self.slack_webhook_url),
            slack_webhook_url_failures = redact(&self.slack_webhook_url_failures),
            "Loaded secrets"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "unset"
    }
}
