//! Build errors for transition tables.

use thiserror::Error;

/// Errors that can occur when building a transition table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("No transitions defined. Add at least one edge")]
    NoTransitions,

    #[error("Edge ({from}, {event}) leads to both {first} and {second}")]
    ConflictingEdge {
        from: &'static str,
        event: &'static str,
        first: &'static str,
        second: &'static str,
    },
}
