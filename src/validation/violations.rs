//! Definition violations detected at startup.

use crate::asm::ActorKind;
use thiserror::Error;

/// A defect in the workflow definition. Any violation is fatal at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("{kind} event {event} has no edge in the transition table")]
    EventNotInTable { kind: ActorKind, event: &'static str },

    #[error("{kind} state {state} is unreachable from {initial}")]
    UnreachableState {
        kind: ActorKind,
        state: &'static str,
        initial: &'static str,
    },

    #[error("{kind} state {state} is not terminal but has no way out")]
    DeadEnd { kind: ActorKind, state: &'static str },

    #[error("{kind} terminal state {state} leaves to {to} on {event}")]
    TerminalExit {
        kind: ActorKind,
        state: &'static str,
        event: &'static str,
        to: &'static str,
    },

    #[error("{kind} event {event} is not wired to any endpoint")]
    UnwiredEvent { kind: ActorKind, event: &'static str },

    #[error("endpoint {endpoint} raises no event")]
    IdleEndpoint { endpoint: &'static str },
}
