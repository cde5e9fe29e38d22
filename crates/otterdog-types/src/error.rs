use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy the reconciliation engine propagates. Kinds, not a grab-bag
/// of string errors: the CLI maps each to an exit code, the webhook service
/// maps each to a persisted task log.
#[derive(Debug, Error)]
pub enum OtterdogError {
    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("load error for {entity}: {cause}")]
    Load { entity: String, cause: String },

    #[error("provider error ({status}) {url}: {body}")]
    Provider {
        status: u16,
        url: String,
        body: String,
    },

    #[error("bad credentials: {0}")]
    BadCredentials(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("validation blocked apply with {error_count} error(s)")]
    ValidationBlocked { error_count: usize },

    #[error("cancelled")]
    Cancelled,

    #[error("task failed: {0}")]
    Task(#[source] Box<OtterdogError>),
}

impl OtterdogError {
    /// Exit code per the CLI's external contract: 0 success, 1
    /// validation/load error, 2 provider error, 3 cancelled.
    pub fn exit_code(&self) -> i32 {
        match self {
            OtterdogError::ConfigLoad(_)
            | OtterdogError::Load { .. }
            | OtterdogError::ValidationBlocked { .. } => 1,
            OtterdogError::Provider { .. }
            | OtterdogError::BadCredentials(_)
            | OtterdogError::Credential(_) => 2,
            OtterdogError::Cancelled => 3,
            OtterdogError::Task(inner) => inner.exit_code(),
        }
    }

    /// True for error classes the retry strategy should never retry
    /// (bad credentials are fatal, not transient).
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            OtterdogError::BadCredentials(_) | OtterdogError::Credential(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OtterdogError>;

/// Severity of a single validator finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One finding emitted by the validator. `context` names the entity the way
/// the summary line does, e.g. `repo[name="x"]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub severity: Severity,
    pub context: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn error(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn warning(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn info(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Accumulates validation failures over one pass, never throws.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    pub fn error_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// The single user-visible summary line every run prints.
    pub fn summary_line(&self) -> String {
        format!(
            "{} errors, {} warnings",
            self.error_count(),
            self.warning_count()
        )
    }
}

/// Retry classification, shared by `otterdog-retry`'s strategy selection and
/// the provider transports that raise errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    Retryable,
    Ambiguous,
    Permanent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_the_external_contract() {
        assert_eq!(OtterdogError::ConfigLoad("x".into()).exit_code(), 1);
        assert_eq!(
            OtterdogError::Provider {
                status: 500,
                url: "x".into(),
                body: "x".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(OtterdogError::Cancelled.exit_code(), 3);
    }

    #[test]
    fn validation_context_counts_by_severity() {
        let mut ctx = ValidationContext::new();
        ctx.push(ValidationFailure::error("repo[name=\"x\"]", "conflict"));
        ctx.push(ValidationFailure::warning("repo[name=\"y\"]", "heads up"));
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(ctx.warning_count(), 1);
        assert!(ctx.has_errors());
        assert_eq!(ctx.summary_line(), "1 errors, 1 warnings");
    }
}
