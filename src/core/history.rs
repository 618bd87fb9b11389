//! State transition history tracking.
//!
//! Provides immutable tracking of machine transitions over time. Each
//! entry records the event that caused it, so a persisted history is an
//! audit trail of which operations moved the workflow.

use super::state::{Event, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single accepted transition.
///
/// # Example
///
/// ```rust
/// use auditflow::asm::{CountyEvent, CountyState};
/// use auditflow::core::StateTransition;
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     event: CountyEvent::UploadBallotManifest,
///     from: CountyState::Initial,
///     to: CountyState::BallotManifestOk,
///     timestamp: Utc::now(),
/// };
/// assert!(!transition.is_self_loop());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State, E: Event> {
    /// The event that triggered the transition
    pub event: E,
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition was accepted
    pub timestamp: DateTime<Utc>,
}

impl<S: State, E: Event> StateTransition<S, E> {
    /// True when the transition left the state unchanged (e.g. a re-upload).
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Ordered history of state transitions.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use auditflow::asm::{CountyEvent, CountyState};
/// use auditflow::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::new().record(StateTransition {
///     event: CountyEvent::UploadBallotManifest,
///     from: CountyState::Initial,
///     to: CountyState::BallotManifestOk,
///     timestamp: Utc::now(),
/// });
///
/// let history = history.record(StateTransition {
///     event: CountyEvent::UploadCvrs,
///     from: CountyState::BallotManifestOk,
///     to: CountyState::BallotManifestAndCvrsOk,
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path().len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State, E: Event> {
    transitions: Vec<StateTransition<S, E>>,
}

impl<S: State, E: Event> Default for StateHistory<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, E: Event> StateHistory<S, E> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// This is a pure function - it does not mutate the existing history
    /// but returns a new one with the transition added.
    pub fn record(&self, transition: StateTransition<S, E>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed.
    ///
    /// Returns references to states in order: the first `from` state, then
    /// the `to` state of each transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Calculate total duration from first to last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all transitions in the order they were accepted.
    pub fn transitions(&self) -> &[StateTransition<S, E>] {
        &self.transitions
    }

    /// The most recently accepted transition.
    pub fn last(&self) -> Option<&StateTransition<S, E>> {
        self.transitions.last()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<S: State, E: Event> FromIterator<StateTransition<S, E>> for StateHistory<S, E> {
    fn from_iter<I: IntoIterator<Item = StateTransition<S, E>>>(iter: I) -> Self {
        Self {
            transitions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{AuditBoardEvent, AuditBoardState};

    fn transition(
        event: AuditBoardEvent,
        from: AuditBoardState,
        to: AuditBoardState,
    ) -> StateTransition<AuditBoardState, AuditBoardEvent> {
        StateTransition {
            event,
            from,
            to,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history: StateHistory<AuditBoardState, AuditBoardEvent> = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert!(history.last().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = StateHistory::new();

        let new_history = history.record(transition(
            AuditBoardEvent::SignInAuditBoard,
            AuditBoardState::Initial,
            AuditBoardState::WaitingForRoundStart,
        ));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let history = StateHistory::new()
            .record(transition(
                AuditBoardEvent::SignInAuditBoard,
                AuditBoardState::Initial,
                AuditBoardState::WaitingForRoundStart,
            ))
            .record(transition(
                AuditBoardEvent::RoundStart,
                AuditBoardState::WaitingForRoundStart,
                AuditBoardState::RoundInProgress,
            ));

        let path = history.get_path();
        assert_eq!(
            path,
            vec![
                &AuditBoardState::Initial,
                &AuditBoardState::WaitingForRoundStart,
                &AuditBoardState::RoundInProgress,
            ]
        );
        assert_eq!(
            history.last().map(|t| t.event),
            Some(AuditBoardEvent::RoundStart)
        );
    }

    #[test]
    fn self_loop_is_detected() {
        let t = transition(
            AuditBoardEvent::ReportMarkings,
            AuditBoardState::RoundInProgress,
            AuditBoardState::RoundInProgress,
        );
        assert!(t.is_self_loop());
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let history = StateHistory::new().record(transition(
            AuditBoardEvent::SignInAuditBoard,
            AuditBoardState::Initial,
            AuditBoardState::WaitingForRoundStart,
        ));

        assert_eq!(history.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn history_serializes_with_names() {
        let history = StateHistory::new().record(transition(
            AuditBoardEvent::SignInAuditBoard,
            AuditBoardState::Initial,
            AuditBoardState::WaitingForRoundStart,
        ));

        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains("WAITING_FOR_ROUND_START"));
        assert!(json.contains("SIGN_IN_AUDIT_BOARD_EVENT"));

        let deserialized: StateHistory<AuditBoardState, AuditBoardEvent> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(history, deserialized);
    }
}
