//! Normalized result of a downstream rule modification call

use std::fmt;

/// Raw success signal reported by a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// HTTP-style status code from response metadata (load balancer API)
    Status(u16),
    /// Boolean `success` field from the response body (Cloudflare API)
    Flag(bool),
}

/// Outcome of a call that reached the collaborator
///
/// Only the documented success signal counts as success: status `200` or
/// `success: true`. Everything else, including other 2xx codes, is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    signal: Signal,
    detail: String,
}

impl CallOutcome {
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        Self {
            signal: Signal::Status(status),
            detail: detail.into(),
        }
    }

    pub fn from_flag(success: bool, detail: impl Into<String>) -> Self {
        Self {
            signal: Signal::Flag(success),
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.signal, Signal::Status(200) | Signal::Flag(true))
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Collaborator-provided detail (error messages, request ids)
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signal {
            Signal::Status(code) => write!(f, "status {}", code)?,
            Signal::Flag(flag) => write!(f, "success={}", flag)?,
        }
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_documented_signals_succeed() {
        assert!(CallOutcome::from_status(200, "").is_success());
        assert!(CallOutcome::from_flag(true, "").is_success());

        assert!(!CallOutcome::from_status(201, "").is_success());
        assert!(!CallOutcome::from_status(400, "RuleNotFound").is_success());
        assert!(!CallOutcome::from_flag(false, "").is_success());
    }

    #[test]
    fn test_signal_keeps_raw_value() {
        assert_eq!(CallOutcome::from_status(201, "").signal(), Signal::Status(201));
        assert_eq!(CallOutcome::from_flag(false, "").signal(), Signal::Flag(false));
    }

    #[test]
    fn test_display_includes_detail() {
        let outcome = CallOutcome::from_flag(false, "10000: Authentication error");
        assert_eq!(outcome.to_string(), "success=false (10000: Authentication error)");
        assert_eq!(CallOutcome::from_status(200, "").to_string(), "status 200");
    }
}
