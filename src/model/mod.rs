//! Audit domain records shared across endpoints.

pub mod ballot_style;

pub use ballot_style::{BallotStyle, BallotStyleRegistry, IdSequence};
