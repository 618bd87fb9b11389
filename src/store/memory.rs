//! In-memory machine store.

use crate::asm::ActorKind;
use crate::store::{
    check_version, write_with_effect, KeyLease, KeyedLocks, MachineInstance, MachineKey,
    MachineStore, StoreError, TransitionEffect,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Machine store that keeps instances in process memory.
///
/// Failures can be injected with [`InMemoryMachineStore::fail_next_saves`]
/// to exercise retry and rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryMachineStore {
    instances: RwLock<HashMap<MachineKey, MachineInstance>>,
    locks: KeyedLocks,
    failing_saves: AtomicUsize,
}

impl InMemoryMachineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` durable writes fail with `Unavailable`.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    async fn read(&self, key: &MachineKey) -> Option<MachineInstance> {
        self.instances.read().await.get(key).cloned()
    }

    async fn write(&self, instance: &MachineInstance) -> Result<(), StoreError> {
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable(std::io::Error::other(
                "injected write failure",
            )));
        }

        self.instances
            .write()
            .await
            .insert(instance.key().clone(), instance.clone());
        Ok(())
    }
}

#[async_trait]
impl MachineStore for InMemoryMachineStore {
    async fn get(&self, key: &MachineKey) -> Result<MachineInstance, StoreError> {
        if let Some(instance) = self.read(key).await {
            return Ok(instance);
        }

        let _guard = self.locks.lock(key).await;
        if let Some(instance) = self.read(key).await {
            return Ok(instance);
        }

        let instance = MachineInstance::initial(key.clone());
        self.write(&instance).await?;
        tracing::debug!(%key, instance_id = %instance.instance_id(), "created machine instance");
        Ok(instance)
    }

    async fn load(&self, key: &MachineKey) -> Result<Option<MachineInstance>, StoreError> {
        Ok(self.read(key).await)
    }

    async fn lease(&self, keys: &[MachineKey]) -> Result<KeyLease, StoreError> {
        let guards = self.locks.lock_many(keys).await;
        Ok(KeyLease::new(keys, guards))
    }

    async fn load_leased(
        &self,
        lease: &KeyLease,
    ) -> Result<Vec<Option<MachineInstance>>, StoreError> {
        let instances = self.instances.read().await;
        Ok(lease
            .keys()
            .iter()
            .map(|key| instances.get(key).cloned())
            .collect())
    }

    async fn save(
        &self,
        instance: &MachineInstance,
        effect: Option<&dyn TransitionEffect>,
    ) -> Result<MachineInstance, StoreError> {
        let _guard = self.locks.lock(instance.key()).await;

        let stored = self.read(instance.key()).await;
        check_version(instance, stored.as_ref())?;

        let committed = instance.committed();
        write_with_effect(&committed, effect, self.write(&committed)).await?;
        Ok(committed)
    }

    async fn reset(&self, key: &MachineKey) -> Result<MachineInstance, StoreError> {
        let _guard = self.locks.lock(key).await;

        let reset = match self.read(key).await {
            Some(existing) => existing.reset(),
            None => MachineInstance::initial(key.clone()),
        };
        self.write(&reset).await?;
        tracing::info!(%key, version = reset.version(), "machine instance reset");
        Ok(reset)
    }

    async fn list(&self, kind: ActorKind) -> Result<Vec<String>, StoreError> {
        let instances = self.instances.read().await;
        let mut identities: Vec<String> = instances
            .keys()
            .filter(|key| key.kind() == kind)
            .map(|key| key.identity().to_string())
            .collect();
        identities.sort();
        Ok(identities)
    }
}
