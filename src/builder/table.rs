//! Builder for constructing transition tables.

use crate::asm::TransitionTable;
use crate::builder::error::BuildError;
use crate::core::{Event, State};
use std::collections::HashMap;

/// Builder for constructing transition tables with a fluent API.
///
/// Every legal edge is listed explicitly. Adding the same edge twice is a
/// no-op; adding two edges for one (state, event) pair with different
/// targets fails the build.
pub struct TransitionTableBuilder<S: State, E: Event> {
    initial: Option<S>,
    edges: Vec<(S, E, S)>,
}

impl<S: State, E: Event> TransitionTableBuilder<S, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            edges: Vec::new(),
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Add a single edge.
    pub fn edge(mut self, from: S, event: E, to: S) -> Self {
        self.edges.push((from, event, to));
        self
    }

    /// Add a self-loop on `event` for each of `states`.
    pub fn self_loops(mut self, states: &[S], event: E) -> Self {
        for state in states {
            self.edges.push((state.clone(), event.clone(), state.clone()));
        }
        self
    }

    /// Add multiple edges at once.
    pub fn edges(mut self, edges: impl IntoIterator<Item = (S, E, S)>) -> Self {
        self.edges.extend(edges);
        self
    }

    /// Build the table.
    /// Returns an error if required fields are missing or edges conflict.
    pub fn build(self) -> Result<TransitionTable<S, E>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if self.edges.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        let mut table: HashMap<(S, E), S> = HashMap::with_capacity(self.edges.len());
        for (from, event, to) in self.edges {
            match table.get(&(from.clone(), event.clone())) {
                Some(existing) if *existing == to => {}
                Some(existing) => {
                    return Err(BuildError::ConflictingEdge {
                        from: from.name(),
                        event: event.name(),
                        first: existing.name(),
                        second: to.name(),
                    });
                }
                None => {
                    table.insert((from, event), to);
                }
            }
        }

        Ok(TransitionTable::from_parts(initial, table))
    }
}

impl<S: State, E: Event> Default for TransitionTableBuilder<S, E> {
    fn default() -> Self {
        Self::new()
    }
}
