//! Error types shared by the coordinator and its collaborators

use std::time::Duration;
use thiserror::Error;

use crate::modifier::RuleTarget;
use crate::outcome::CallOutcome;

/// Secret store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Secret store service error: {0}")]
    Service(String),
}

/// Rule modifier errors: the call did not produce a usable outcome
#[derive(Debug, Error)]
pub enum ModifierError {
    #[error("Invalid token set: {0}")]
    InvalidTokens(String),

    #[error("API credential lookup failed: {0}")]
    Credential(#[source] StoreError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Response(String),
}

/// Rotation step errors
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Invalid step parameter: {0}")]
    UnknownStep(String),

    #[error("Secret {0} is not enabled for rotation")]
    NotEnabledForRotation(String),

    #[error("Secret store error: {0}")]
    Store(#[from] StoreError),

    #[error("{target} rule modification failed: {source}")]
    Modifier {
        target: RuleTarget,
        source: ModifierError,
    },

    #[error("{target} rule rejected {phase}: {outcome}")]
    Rejected {
        target: RuleTarget,
        phase: &'static str,
        outcome: CallOutcome,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Malformed secret state: {0}")]
    MalformedState(String),
}

impl RotationError {
    /// Sub-call failures leave the secret in a state where the whole step can
    /// be replayed. Precondition and malformed-state failures need an operator.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(_) | Self::Modifier { .. } | Self::Rejected { .. } | Self::Timeout { .. } => {
                true
            }
            Self::UnknownStep(_) | Self::NotEnabledForRotation(_) | Self::MalformedState(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let rejected = RotationError::Rejected {
            target: RuleTarget::Edge,
            phase: "narrow",
            outcome: CallOutcome::from_flag(false, ""),
        };
        assert!(rejected.is_retryable());
        assert!(RotationError::Store(StoreError::Service("throttled".into())).is_retryable());

        assert!(!RotationError::UnknownStep("bogus".into()).is_retryable());
        assert!(!RotationError::NotEnabledForRotation("s".into()).is_retryable());
        assert!(!RotationError::MalformedState("no current".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = RotationError::NotEnabledForRotation("arn:secret".into());
        assert_eq!(err.to_string(), "Secret arn:secret is not enabled for rotation");

        let err = RotationError::Modifier {
            target: RuleTarget::Listener,
            source: ModifierError::Transport("connection reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "listener rule modification failed: Transport error: connection reset"
        );
    }
}
