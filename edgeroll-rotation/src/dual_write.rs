//! Dual-write protocol: widen the listener, switch the edge, narrow the listener

use std::fmt;
use tracing::{info, warn};

use edgeroll_core::{AcceptedTokens, RotationError, RuleModifier, RuleTarget};

use crate::coordinator::RotationCoordinator;

/// Sub-steps of `setSecret`, each gating the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Listener accepts `[old, new]`
    WidenListener,
    /// Edge injects only `new`
    SwitchEdge,
    /// Listener accepts only `new`
    NarrowListener,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WidenListener => "widen",
            Self::SwitchEdge => "switch",
            Self::NarrowListener => "narrow",
        }
    }

    pub fn target(&self) -> RuleTarget {
        match self {
            Self::WidenListener | Self::NarrowListener => RuleTarget::Listener,
            Self::SwitchEdge => RuleTarget::Edge,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::WidenListener => "listener widen",
            Self::SwitchEdge => "edge switch",
            Self::NarrowListener => "listener narrow",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RotationCoordinator {
    /// Move both rule modifiers from `old` to `new` without a window in which
    /// a request carrying the injected token is rejected.
    ///
    /// The listener accepts `new` before the edge starts injecting it, and
    /// stops accepting `old` only after the edge has stopped injecting it. Any
    /// failure aborts before the next phase; replaying from the top is safe.
    pub(crate) async fn dual_write(&self, old: &str, new: &str) -> Result<(), RotationError> {
        let both = AcceptedTokens::widen(old, new).map_err(|source| RotationError::Modifier {
            target: RuleTarget::Listener,
            source,
        })?;
        let only_new = AcceptedTokens::single(new).map_err(|source| RotationError::Modifier {
            target: RuleTarget::Edge,
            source,
        })?;

        self.apply(self.listener.as_ref(), Phase::WidenListener, &both)
            .await?;
        self.apply(self.edge.as_ref(), Phase::SwitchEdge, &only_new)
            .await?;
        self.apply(self.listener.as_ref(), Phase::NarrowListener, &only_new)
            .await?;

        info!("Cutover complete: only the pending token is accepted");
        Ok(())
    }

    async fn apply(
        &self,
        modifier: &dyn RuleModifier,
        phase: Phase,
        tokens: &AcceptedTokens,
    ) -> Result<(), RotationError> {
        let target = modifier.target();
        info!(target = %target, phase = %phase, tokens = tokens.len(), "Modifying rule");

        let outcome = self
            .within(phase.operation(), modifier.set_accepted_tokens(tokens))
            .await?
            .map_err(|source| RotationError::Modifier { target, source })?;

        if !outcome.is_success() {
            warn!(target = %target, phase = %phase, outcome = %outcome, "Rule modification rejected");
            return Err(RotationError::Rejected {
                target,
                phase: phase.as_str(),
                outcome,
            });
        }
        Ok(())
    }
}
