pub mod backend;
pub mod noop;
pub mod router;
pub mod slack;

use std::fmt;

use uuid::Uuid;

use crate::report::DiagnosticReport;

pub use backend::NotifyBackend;
pub use noop::NoopBackend;
pub use router::NotifyRouter;
pub use slack::SlackWebhook;

/// Outcome a notice reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Guards passed (or were overridden); the draft may be published.
    Ready,
    /// At least one guard failed and publication was not forced.
    Blocked,
    /// The run itself failed before guards could decide.
    Failed,
}

impl NoticeKind {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Ready)
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Blocked => write!(f, "blocked"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A message about one run, carrying the plain-text report.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub run_id: Uuid,
    pub headline: String,
    pub report_text: String,
}

impl Notice {
    pub fn from_report(kind: NoticeKind, headline: impl Into<String>, report: &DiagnosticReport) -> Self {
        Self {
            kind,
            run_id: report.run_id,
            headline: headline.into(),
            report_text: report.summary_text(),
        }
    }
}
