//! Durable machine instance storage.
//!
//! A [`MachineStore`] owns every machine instance. Instances are created
//! lazily at their kind's initial state the first time they are referenced
//! and are mutated only through [`MachineStore::save`], which performs an
//! optimistic version check under a per-key mutex.

pub mod effect;
pub mod file;
pub mod instance;
pub mod locks;
pub mod memory;

pub use effect::{EffectError, TransitionEffect};
pub use file::FileMachineStore;
pub use instance::{MachineInstance, MachineKey, DOS_IDENTITY};
pub use locks::KeyedLocks;
pub use memory::InMemoryMachineStore;

use crate::asm::ActorKind;
use crate::checkpoint::RecordError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Errors raised by machine stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("corrupt record for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: RecordError,
    },

    #[error("invalid machine key: {0}")]
    InvalidKey(String),

    #[error("side effect failed: {0}")]
    Effect(#[from] EffectError),
}

impl StoreError {
    /// Transient failures worth retrying after reloading.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Unavailable(_))
    }
}

/// Storage for machine instances.
///
/// Implementations:
/// - `InMemoryMachineStore`: process-local, for tests and tooling
/// - `FileMachineStore`: one record file per instance
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// The instance for `key`, created at the initial state and persisted
    /// if it does not exist yet. Concurrent first references observe the
    /// same instance.
    async fn get(&self, key: &MachineKey) -> Result<MachineInstance, StoreError>;

    /// The instance for `key` if it exists. Never creates.
    async fn load(&self, key: &MachineKey) -> Result<Option<MachineInstance>, StoreError>;

    /// Take the locks `save` takes for every key in `keys`, held until the
    /// lease is dropped. Side effects staged by a save to any of them are
    /// either committed or rolled back before the lease is granted.
    async fn lease(&self, keys: &[MachineKey]) -> Result<KeyLease, StoreError>;

    /// Read the instances covered by `lease`, in lease key order.
    async fn load_leased(
        &self,
        lease: &KeyLease,
    ) -> Result<Vec<Option<MachineInstance>>, StoreError>;

    /// Load several instances as one consistent snapshot: no save to any of
    /// `keys` interleaves with the reads.
    async fn load_many(
        &self,
        keys: &[MachineKey],
    ) -> Result<Vec<Option<MachineInstance>>, StoreError> {
        let lease = self.lease(keys).await?;
        self.load_leased(&lease).await
    }

    /// Persist `instance` if the stored version still equals the version it
    /// was loaded at. `effect` is staged inside the same unit of work.
    /// Returns the instance at its new version.
    async fn save(
        &self,
        instance: &MachineInstance,
        effect: Option<&dyn TransitionEffect>,
    ) -> Result<MachineInstance, StoreError>;

    /// Return the instance to its initial state, clearing its history.
    async fn reset(&self, key: &MachineKey) -> Result<MachineInstance, StoreError>;

    /// Identities with a stored instance of `kind`, sorted.
    async fn list(&self, kind: ActorKind) -> Result<Vec<String>, StoreError>;
}

/// Exclusive hold on a set of machine keys, see [`MachineStore::lease`].
///
/// Data written by a [`TransitionEffect`] for one of the keys can be read
/// while the lease is alive and is guaranteed to match the stored state.
pub struct KeyLease {
    keys: Vec<MachineKey>,
    _held: Box<dyn Send + Sync>,
}

impl KeyLease {
    pub(crate) fn new(keys: &[MachineKey], held: impl Send + Sync + 'static) -> Self {
        Self {
            keys: keys.to_vec(),
            _held: Box::new(held),
        }
    }

    pub fn keys(&self) -> &[MachineKey] {
        &self.keys
    }
}

impl fmt::Debug for KeyLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLease").field("keys", &self.keys).finish()
    }
}

pub(crate) fn check_version(
    instance: &MachineInstance,
    stored: Option<&MachineInstance>,
) -> Result<(), StoreError> {
    let actual = stored.map_or(0, MachineInstance::version);
    if actual == instance.version() {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            key: instance.key().to_string(),
            expected: instance.version(),
            actual,
        })
    }
}

/// Stage `effect`, run `write`, and roll the effect back if the write fails.
pub(crate) async fn write_with_effect<F>(
    committed: &MachineInstance,
    effect: Option<&dyn TransitionEffect>,
    write: F,
) -> Result<(), StoreError>
where
    F: Future<Output = Result<(), StoreError>>,
{
    if let Some(effect) = effect {
        effect.stage(committed).await?;
    }

    if let Err(err) = write.await {
        tracing::warn!(
            key = %committed.key(),
            version = committed.version(),
            error = %err,
            "write failed; rolling back side effect"
        );
        if let Some(effect) = effect {
            effect.rollback(committed).await;
        }
        return Err(err);
    }
    Ok(())
}
