//! Side effects committed together with a transition.

use crate::store::MachineInstance;
use async_trait::async_trait;
use thiserror::Error;

/// A side effect failed to stage; the transition is not saved.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct EffectError(pub String);

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Work that must become durable together with a state change, such as
/// persisting an uploaded file's metadata.
///
/// The store stages the effect after the version check and before the
/// durable write. If the write fails the effect is rolled back, so either
/// both the effect and the new state are committed or neither is.
#[async_trait]
pub trait TransitionEffect: Send + Sync {
    /// Stage the effect for `committed`, whose last history entry is the
    /// transition being saved.
    async fn stage(&self, committed: &MachineInstance) -> Result<(), EffectError>;

    /// Undo a staged effect after the write failed.
    async fn rollback(&self, committed: &MachineInstance);
}
