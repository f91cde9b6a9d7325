use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use draftguard_common::GuardResult;

const RULE: &str = "============================================================";

/// One pipeline stage as it ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub name: String,
    pub ok: bool,
    pub duration_secs: f64,
    pub detail: String,
}

/// Everything recorded during one run. Steps and checks are only ever
/// appended; both renderings are read-only projections.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepResult>,
    pub checks: Vec<GuardResult>,
}

impl Default for DiagnosticReport {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn add_step(&mut self, name: &str, ok: bool, duration_secs: f64, detail: impl Into<String>) {
        self.steps.push(StepResult {
            name: name.to_string(),
            ok,
            duration_secs,
            detail: detail.into(),
        });
    }

    pub fn add_verify(&mut self, result: GuardResult) {
        self.checks.push(result);
    }

    pub fn all_steps_ok(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    pub fn all_checks_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Canned guidance for each failing step and check, matched on name.
    pub fn troubleshooting_hints(&self) -> Vec<String> {
        let step_hints = self
            .steps
            .iter()
            .filter(|s| !s.ok)
            .filter_map(|s| step_hint(&s.name.to_lowercase()).map(str::to_string));

        let check_hints = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .filter_map(|c| check_hint(&c.name.to_lowercase(), &c.detail));

        step_hints.chain(check_hints).collect()
    }

    /// Plain-text rendering for logs and chat notifications.
    pub fn summary_text(&self) -> String {
        let mut lines = vec![
            String::new(),
            RULE.to_string(),
            "PIPELINE DIAGNOSTIC REPORT".to_string(),
            RULE.to_string(),
            String::new(),
            "Pipeline Steps:".to_string(),
        ];

        for step in &self.steps {
            let status = if step.ok { "[OK]  " } else { "[FAIL]" };
            let duration = if step.duration_secs > 0.0 {
                format!("({:.1}s)", step.duration_secs)
            } else {
                String::new()
            };
            lines.push(format!("  {status} {} {duration}{}", step.name, with_detail(&step.detail)));
        }

        if !self.checks.is_empty() {
            lines.push(String::new());
            lines.push("Content Verification:".to_string());
            for check in &self.checks {
                let status = if check.passed { "[PASS]" } else { "[WARN]" };
                lines.push(format!("  {status} {}{}", check.name, with_detail(&check.detail)));
            }
        }

        let hints = self.troubleshooting_hints();
        if !hints.is_empty() {
            lines.push(String::new());
            lines.push("Troubleshooting Tips:".to_string());
            lines.extend(hints.iter().map(|hint| format!("  • {hint}")));
        }

        lines.push(String::new());
        lines.push(RULE.to_string());
        lines.join("\n")
    }

    /// Tabular rendering for presentation layers that draw their own markup.
    pub fn table(&self) -> ReportTable {
        let steps = self
            .steps
            .iter()
            .map(|s| TableRow {
                status: if s.ok { RowStatus::Ok } else { RowStatus::Fail },
                name: s.name.clone(),
                duration: (s.duration_secs > 0.0).then(|| format!("{:.1}s", s.duration_secs)),
                detail: non_empty(&s.detail),
            })
            .collect();

        let checks = self
            .checks
            .iter()
            .map(|c| TableRow {
                status: if c.passed { RowStatus::Ok } else { RowStatus::Warn },
                name: c.name.clone(),
                duration: None,
                detail: non_empty(&c.detail),
            })
            .collect();

        ReportTable {
            run_id: self.run_id,
            started_at: self.started_at,
            steps,
            checks,
            hints: self.troubleshooting_hints(),
        }
    }
}

fn with_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" -- {detail}")
    }
}

fn non_empty(detail: &str) -> Option<String> {
    (!detail.is_empty()).then(|| detail.to_string())
}

fn step_hint(name: &str) -> Option<&'static str> {
    if name.contains("keyword") {
        Some("Keyword extraction failed. Ensure the keyword source exists and is readable.")
    } else if name.contains("source") && !name.contains("rank") {
        Some("Source gathering failed. Check internet connectivity and feed URLs.")
    } else if name.contains("rank") {
        Some("Source ranking failed. Check the API key and quota. The pipeline continues with unranked sources.")
    } else if name.contains("draft") || name.contains("generation") {
        Some("Draft generation failed. Check the API key, quota and model availability.")
    } else {
        None
    }
}

fn check_hint(name: &str, detail: &str) -> Option<String> {
    let hint = if name.contains("word count") {
        format!("Word count issue: {detail}. Consider adjusting the prompt's length instructions or content.min_words/max_words.")
    } else if name.contains("section") {
        format!("Missing sections: {detail}. The model may have deviated from the prompt structure.")
    } else if name.contains("reference accuracy") {
        format!("Reference accuracy issue: {detail}. Hallucinated URLs were replaced with real catalog sources.")
    } else if name.contains("reference") {
        "Few or no reference links found. Check that sources were passed to the prompt.".to_string()
    } else if name.contains("artifact") {
        format!("LLM artifacts detected: {detail}. These indicate prompt issues.")
    } else if name.contains("reachab") {
        format!("Unreachable links: {detail}. Check the catalog for dead or blocked URLs.")
    } else if name.contains("similar") {
        format!("Too similar to published content: {detail}. Pick a different angle or fresher sources.")
    } else {
        return None;
    };
    Some(hint)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub status: RowStatus,
    pub name: String,
    pub duration: Option<String>,
    pub detail: Option<String>,
}

/// Structured view of a [`DiagnosticReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<TableRow>,
    pub checks: Vec<TableRow>,
    pub hints: Vec<String>,
}
