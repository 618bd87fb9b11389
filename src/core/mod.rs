//! Core state machine types.
//!
//! This module contains the pure core shared by every actor kind:
//! - State and event definitions via the `State` and `Event` traits
//! - Immutable history tracking
//!
//! Nothing in this module performs I/O.

mod history;
mod state;

pub use history::{StateHistory, StateTransition};
pub use state::{Event, State};
