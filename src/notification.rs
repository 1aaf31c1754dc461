use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// A user-facing message produced by the workflow. The presentation layer
/// decides how to render it; only the severity taxonomy is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Notification {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            summary: "Success".to_string(),
            detail: detail.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Error".to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
