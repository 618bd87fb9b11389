//! Transition tables: the pure (state, event) → state function.

use crate::core::{Event, State};
use std::collections::HashMap;

/// Outcome of applying an event to a state.
///
/// Rejection is an ordinary outcome, not an error: the caller decides how
/// to report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionResult<S, E> {
    /// The edge exists; move to the contained state.
    Success(S),

    /// No edge for this (state, event) pair.
    Rejected { from: S, event: E },
}

impl<S, E> TransitionResult<S, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The resulting state, if the transition was accepted.
    pub fn state(self) -> Option<S> {
        match self {
            Self::Success(state) => Some(state),
            Self::Rejected { .. } => None,
        }
    }
}

/// Sparse, explicitly enumerated transition table for one actor kind.
///
/// Built with [`TransitionTableBuilder`](crate::builder::TransitionTableBuilder)
/// and immutable afterwards.
#[derive(Clone, Debug)]
pub struct TransitionTable<S: State, E: Event> {
    initial: S,
    edges: HashMap<(S, E), S>,
}

impl<S: State, E: Event> TransitionTable<S, E> {
    pub(crate) fn from_parts(initial: S, edges: HashMap<(S, E), S>) -> Self {
        Self { initial, edges }
    }

    pub fn initial(&self) -> &S {
        &self.initial
    }

    /// Apply `event` in state `from` (pure, deterministic).
    pub fn apply(&self, from: &S, event: &E) -> TransitionResult<S, E> {
        match self.target(from, event) {
            Some(to) => TransitionResult::Success(to.clone()),
            None => TransitionResult::Rejected {
                from: from.clone(),
                event: event.clone(),
            },
        }
    }

    pub fn target(&self, from: &S, event: &E) -> Option<&S> {
        self.edges.get(&(from.clone(), event.clone()))
    }

    pub fn is_legal(&self, from: &S, event: &E) -> bool {
        self.target(from, event).is_some()
    }

    /// All edges as (from, event, to).
    pub fn edges(&self) -> impl Iterator<Item = (&S, &E, &S)> {
        self.edges.iter().map(|((from, event), to)| (from, event, to))
    }

    /// Events legal in `from`, sorted by name.
    pub fn events_from(&self, from: &S) -> Vec<E> {
        let mut events: Vec<E> = self
            .edges
            .keys()
            .filter(|(state, _)| state == from)
            .map(|(_, event)| event.clone())
            .collect();
        events.sort_by_key(|event| event.name());
        events
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
