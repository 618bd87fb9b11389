//! Core State and Event traits for audit workflow machines.
//!
//! States and events are immutable named values scoped to one actor kind.
//! Both traits are pure: inspecting a value never has side effects.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// All methods are pure - no side effects. States represent immutable
/// values that describe the current position in a workflow.
///
/// # Required Traits
///
/// - `Clone` + `Eq` + `Hash`: states key the transition table
/// - `Debug`: states must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: states are persisted with each instance
///
/// # Example
///
/// ```rust
/// use auditflow::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum UploadState {
///     Waiting,
///     Uploaded,
/// }
///
/// impl State for UploadState {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Waiting => "WAITING",
///             Self::Uploaded => "UPLOADED",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Uploaded)
///     }
/// }
///
/// assert_eq!(UploadState::Waiting.name(), "WAITING");
/// assert!(UploadState::Uploaded.is_final());
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's persisted name.
    ///
    /// Names are stable: they are written to storage and shown to clients.
    fn name(&self) -> &'static str;

    /// Check if this is a final (terminal) state.
    ///
    /// Terminal states have no outbound transitions other than self-loops.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}

/// Trait for state machine events.
///
/// Events carry no payload; any payload belongs to the operation that
/// raises the event.
pub trait Event:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the event's persisted name.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum BoardState {
        SignedOut,
        SignedIn,
        Done,
    }

    impl State for BoardState {
        fn name(&self) -> &'static str {
            match self {
                Self::SignedOut => "SIGNED_OUT",
                Self::SignedIn => "SIGNED_IN",
                Self::Done => "DONE",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Done)
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    struct SignIn;

    impl Event for SignIn {
        fn name(&self) -> &'static str {
            "SIGN_IN_EVENT"
        }
    }

    #[test]
    fn only_declared_terminals_are_final() {
        let finals: Vec<&str> = [BoardState::SignedOut, BoardState::SignedIn, BoardState::Done]
            .iter()
            .filter(|s| s.is_final())
            .map(|s| s.name())
            .collect();
        assert_eq!(finals, vec!["DONE"]);
    }

    #[test]
    fn is_final_defaults_to_false() {
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        struct Open;

        impl State for Open {
            fn name(&self) -> &'static str {
                "OPEN"
            }
        }

        assert!(!Open.is_final());
        assert_eq!(SignIn.name(), "SIGN_IN_EVENT");
    }
}
