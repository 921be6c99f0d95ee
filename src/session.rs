//! Install session state.
//!
//! A session is one run of the engine from `Pending` to a terminal state. It
//! owns the ordered attempt log and the list of states it passed through;
//! only the executor mutates it, and only by appending.

use crate::{ArtifactVersion, InstallError, Platform};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Outcome of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// Precondition unmet; the strategy never ran.
    Skipped,
    /// The strategy ran and failed, or its artifact did not verify.
    Failed,
    /// The strategy ran and its artifact verified.
    Succeeded,
}

/// A single catalog entry's attempt record.
#[derive(Debug, Clone, Serialize)]
pub struct InstallAttempt {
    /// Strategy identifier.
    pub strategy: String,
    /// What happened.
    pub outcome: AttemptOutcome,
    /// Why: the missing capability, the captured diagnostic, or what was
    /// verified.
    pub reason: String,
    /// When the outcome was recorded.
    pub timestamp: SystemTime,
}

impl InstallAttempt {
    pub(crate) fn new(strategy: &str, outcome: AttemptOutcome, reason: impl Into<String>) -> Self {
        Self {
            strategy: strategy.to_string(),
            outcome,
            reason: reason.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// One failed attempt, as aggregated into an exhausted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    /// Strategy identifier.
    pub strategy: String,
    /// Captured diagnostic.
    pub detail: String,
}

/// Where the session is in the install chain.
///
/// Catalog positions are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum SessionState {
    /// Created, nothing attempted yet.
    Pending,
    /// Evaluating or running the strategy at this position.
    Attempting(usize),
    /// The strategy at this position ran; checking its artifact.
    Verifying(usize),
    /// Terminal: a verified artifact is installed.
    Succeeded(ArtifactVersion),
    /// Terminal: every eligible strategy failed.
    Exhausted(Vec<FailureReason>),
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Exhausted(_))
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// `Pending` may jump straight to `Succeeded` (artifact already
    /// installed) or `Exhausted` (nothing to try).
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Pending, Attempting(0)) => true,
            (Pending, Succeeded(_) | Exhausted(_)) => true,
            (Attempting(i), Attempting(j)) => *j == i + 1,
            (Attempting(i), Verifying(j)) => i == j,
            (Attempting(_), Exhausted(_)) => true,
            (Verifying(_), Succeeded(_)) => true,
            (Verifying(i), Attempting(j)) => *j == i + 1,
            (Verifying(_), Exhausted(_)) => true,
            _ => false,
        }
    }
}

/// One end-to-end run of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct InstallSession {
    platform: Platform,
    state: SessionState,
    attempts: Vec<InstallAttempt>,
    history: Vec<SessionState>,
    artifact: Option<PathBuf>,
    started_at: SystemTime,
}

impl InstallSession {
    pub(crate) fn new(platform: Platform) -> Self {
        Self {
            platform,
            state: SessionState::Pending,
            attempts: Vec::new(),
            history: vec![SessionState::Pending],
            artifact: None,
            started_at: SystemTime::now(),
        }
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "session transition");
        self.history.push(next.clone());
        self.state = next;
    }

    pub(crate) fn record(&mut self, attempt: InstallAttempt) {
        self.attempts.push(attempt);
    }

    pub(crate) fn set_artifact(&mut self, path: PathBuf) {
        self.artifact = Some(path);
    }

    /// The platform the session ran on.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Attempt log, in catalog order.
    pub fn attempts(&self) -> &[InstallAttempt] {
        &self.attempts
    }

    /// Every state visited, starting with `Pending`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Path of the verified artifact, once succeeded.
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// When the session was created.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Whether the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Installed version, if the session succeeded.
    pub fn installed_version(&self) -> Option<&ArtifactVersion> {
        match &self.state {
            SessionState::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    /// The strategy that produced the artifact.
    ///
    /// `None` while running, on exhaustion, and when the artifact was
    /// already present before the session began.
    pub fn succeeded_with(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.outcome == AttemptOutcome::Succeeded)
            .map(|a| a.strategy.as_str())
    }

    /// Number of attempts with the given outcome.
    pub fn count(&self, outcome: AttemptOutcome) -> usize {
        self.attempts.iter().filter(|a| a.outcome == outcome).count()
    }

    /// The session's terminal outcome as a `Result`.
    ///
    /// Returns `None` until the session is terminal.
    pub fn outcome(&self) -> Option<Result<&ArtifactVersion, InstallError>> {
        match &self.state {
            SessionState::Succeeded(v) => Some(Ok(v)),
            SessionState::Exhausted(reasons) => {
                let fix = if reasons.is_empty() {
                    "No strategy can run on this host; \
                     install a program listed by `plan` and re-run"
                } else {
                    "Fix the first failure listed in the transcript and re-run"
                };
                Some(Err(InstallError::Exhaustion {
                    reasons: reasons
                        .iter()
                        .map(|r| format!("{}: {}", r.strategy, r.detail))
                        .collect(),
                    fix: fix.to_string(),
                }))
            }
            _ => None,
        }
    }

    /// Process exit code: `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        match self.outcome() {
            Some(Ok(_)) => 0,
            Some(Err(e)) => e.exit_code(),
            None => 1,
        }
    }
}
