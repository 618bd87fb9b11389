//! Auditflow: workflow state machines gating a risk-limiting audit
//!
//! Auditflow keeps the same "pure core, imperative shell" split as any
//! state machine worth trusting with an election. The transition tables and
//! the event–endpoint relation are pure values built and validated once at
//! startup; the machine store and dispatch guard are the only code that
//! touches durable state.
//!
//! # Core Concepts
//!
//! - **Vocabulary**: closed sets of states and events per actor kind
//!   (state authority, county, audit board), see [`asm`]
//! - **Transition table**: the legal (state, event) → state edges
//! - **Event–endpoint relation**: which operations may raise which events
//! - **Machine store**: durable per-identity instances with optimistic
//!   concurrency, see [`store`]
//! - **Dispatch guard**: the only path that moves a machine, see [`dispatch`]
//! - **Projections**: read-only dashboard snapshots, see [`projection`]
//!
//! # Example
//!
//! ```rust
//! use auditflow::asm::{ActorKind, Asm, AsmState, CountyEvent, CountyState};
//!
//! let asm = Asm::new().unwrap();
//! let result = asm.apply(
//!     ActorKind::CountyAuthority,
//!     AsmState::County(CountyState::Initial),
//!     CountyEvent::UploadBallotManifest.into(),
//! );
//! assert_eq!(
//!     result.state(),
//!     Some(AsmState::County(CountyState::BallotManifestOk))
//! );
//! ```

pub mod builder;
pub mod core;

pub mod asm;
pub mod checkpoint;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod projection;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use asm::{ActorKind, Asm, AsmEvent, AsmState, Endpoint, EventEndpointRelation};
pub use core::{Event, State, StateHistory, StateTransition};
pub use dispatch::{DispatchError, DispatchGuard, DispatchRequest};
pub use store::{MachineInstance, MachineKey, MachineStore, StoreError};
