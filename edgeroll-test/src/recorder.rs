//! Recording rule modifiers

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use edgeroll_core::{AcceptedTokens, CallOutcome, ModifierError, RuleModifier, RuleTarget};

/// A rule modification that reached the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub target: RuleTarget,
    pub tokens: Vec<String>,
    /// False when the collaborator rejected the modification
    pub applied: bool,
}

impl RecordedCall {
    pub fn new(target: RuleTarget, tokens: &[&str]) -> Self {
        Self {
            target,
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            applied: true,
        }
    }
}

/// Ordered log of calls shared by every modifier of one test
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, target: RuleTarget) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.target == target)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().push(call);
    }

    /// Replay the applied calls from an initial state where both systems use
    /// `initial`, and check that after every call each token the edge injects
    /// is accepted by the listener.
    pub fn edge_always_accepted(&self, initial: &str) -> bool {
        let mut listener = vec![initial.to_string()];
        let mut edge = vec![initial.to_string()];

        for call in self.calls().into_iter().filter(|c| c.applied) {
            match call.target {
                RuleTarget::Listener => listener = call.tokens,
                RuleTarget::Edge => edge = call.tokens,
            }
            if !edge.iter().all(|t| listener.contains(t)) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Reject(String),
    Fail(String),
    Hang(Duration),
}

/// Rule modifier that records every call and answers from a script
///
/// Calls beyond the script succeed with the target's documented success
/// signal: status 200 for the listener, `success: true` for the edge.
pub struct RecordingModifier {
    target: RuleTarget,
    timeline: Timeline,
    script: Mutex<VecDeque<Scripted>>,
}

impl RecordingModifier {
    pub fn new(target: RuleTarget, timeline: &Timeline) -> Self {
        Self {
            target,
            timeline: timeline.clone(),
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a call that succeeds
    #[must_use]
    pub fn then_succeed(self) -> Self {
        self.script.lock().push_back(Scripted::Hang(Duration::ZERO));
        self
    }

    /// Queue a call the collaborator rejects
    #[must_use]
    pub fn then_reject(self, detail: &str) -> Self {
        self.script.lock().push_back(Scripted::Reject(detail.to_string()));
        self
    }

    /// Queue a call that never reaches the collaborator
    #[must_use]
    pub fn then_fail(self, detail: &str) -> Self {
        self.script.lock().push_back(Scripted::Fail(detail.to_string()));
        self
    }

    /// Queue a call that succeeds only after `delay`
    #[must_use]
    pub fn then_hang(self, delay: Duration) -> Self {
        self.script.lock().push_back(Scripted::Hang(delay));
        self
    }

    fn outcome(&self, success: bool, detail: &str) -> CallOutcome {
        match (self.target, success) {
            (RuleTarget::Listener, true) => CallOutcome::from_status(200, detail),
            (RuleTarget::Listener, false) => CallOutcome::from_status(500, detail),
            (RuleTarget::Edge, success) => CallOutcome::from_flag(success, detail),
        }
    }
}

#[async_trait]
impl RuleModifier for RecordingModifier {
    fn target(&self) -> RuleTarget {
        self.target
    }

    async fn set_accepted_tokens(
        &self,
        tokens: &AcceptedTokens,
    ) -> Result<CallOutcome, ModifierError> {
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Fail(detail)) => Err(ModifierError::Transport(detail)),
            Some(Scripted::Reject(detail)) => {
                self.timeline.record(RecordedCall {
                    target: self.target,
                    tokens: tokens.to_vec(),
                    applied: false,
                });
                Ok(self.outcome(false, &detail))
            }
            Some(Scripted::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                self.timeline.record(RecordedCall {
                    target: self.target,
                    tokens: tokens.to_vec(),
                    applied: true,
                });
                Ok(self.outcome(true, ""))
            }
            None => {
                self.timeline.record(RecordedCall {
                    target: self.target,
                    tokens: tokens.to_vec(),
                    applied: true,
                });
                Ok(self.outcome(true, ""))
            }
        }
    }
}
