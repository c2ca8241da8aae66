//! Downstream rule modifier contract

use async_trait::async_trait;
use std::fmt;

use crate::error::ModifierError;
use crate::outcome::CallOutcome;

/// Which downstream system a rule modifier drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    /// Edge (WAF) header transform rule
    Edge,
    /// Load balancer listener rule
    Listener,
}

impl RuleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edge => "edge",
            Self::Listener => "listener",
        }
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete set of token values a rule should accept: one or two, in order
#[derive(Clone, PartialEq, Eq)]
pub struct AcceptedTokens(Vec<String>);

impl AcceptedTokens {
    /// Accept only `token`
    pub fn single(token: impl Into<String>) -> Result<Self, ModifierError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ModifierError::InvalidTokens("empty token".to_string()));
        }
        Ok(Self(vec![token]))
    }

    /// Accept both `old` and `new` during the dual-write window
    ///
    /// Collapses to a single token when both are equal, which happens when a
    /// rotation step is replayed after the new version was already promoted.
    pub fn widen(old: impl Into<String>, new: impl Into<String>) -> Result<Self, ModifierError> {
        let (old, new) = (old.into(), new.into());
        if old.is_empty() || new.is_empty() {
            return Err(ModifierError::InvalidTokens("empty token".to_string()));
        }
        if old == new {
            return Ok(Self(vec![new]));
        }
        Ok(Self(vec![old, new]))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }
}

// Token values never end up in logs or error messages.
impl fmt::Debug for AcceptedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AcceptedTokens({} redacted)", self.0.len())
    }
}

/// Sets which token values a downstream rule accepts or injects
///
/// Every call is a full replace of the rule's acceptance set and is
/// idempotent. A call that reached the collaborator returns `Ok` with the
/// collaborator's outcome even when it was rejected; `Err` means the call
/// could not be made or its response could not be read.
#[async_trait]
pub trait RuleModifier: Send + Sync {
    fn target(&self) -> RuleTarget;

    async fn set_accepted_tokens(
        &self,
        tokens: &AcceptedTokens,
    ) -> Result<CallOutcome, ModifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_keeps_order() {
        let tokens = AcceptedTokens::widen("old123", "new456").unwrap();
        assert_eq!(tokens.as_slice(), ["old123", "new456"]);
        assert!(tokens.contains("old123"));
    }

    #[test]
    fn test_widen_collapses_identical_tokens() {
        let tokens = AcceptedTokens::widen("same", "same").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(!tokens.is_empty());
    }

    #[test]
    fn test_empty_tokens_rejected() {
        assert!(AcceptedTokens::single("").is_err());
        assert!(AcceptedTokens::widen("", "new").is_err());
    }

    #[test]
    fn test_debug_redacts_values() {
        let tokens = AcceptedTokens::single("topsecret").unwrap();
        assert!(!format!("{:?}", tokens).contains("topsecret"));
    }
}
