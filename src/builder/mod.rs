//! Builder API for declaring workflow machines.
//!
//! The `state_enum!` and `event_enum!` macros declare the closed vocabulary
//! of an actor kind; `TransitionTableBuilder` lists its legal edges.

pub mod error;
pub mod macros;
pub mod table;

pub use error::BuildError;
pub use table::TransitionTableBuilder;
