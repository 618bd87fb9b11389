//! Per-key async mutexes.
//!
//! Every read-check-write sequence on one machine instance runs under that
//! instance's mutex. Different keys never contend.

use crate::store::MachineKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type KeyLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<MachineKey, KeyLock>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `key`. Entries nobody holds or waits on are pruned
    /// first, so the map stays the size of the keys currently in use.
    fn handle(&self, key: &MachineKey) -> KeyLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.clone()).or_default().clone()
    }

    /// Keys with a live mutex.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &MachineKey) -> OwnedMutexGuard<()> {
        self.handle(key).lock_owned().await
    }

    /// Lock several keys at once. Keys are taken in sorted order so two
    /// callers locking overlapping sets cannot deadlock.
    pub async fn lock_many(&self, keys: &[MachineKey]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&MachineKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock(key).await);
        }
        guards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let key = MachineKey::county("adams").unwrap();

        let guard = locks.lock(&key).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock(&key)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.lock(&key)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _adams = locks.lock(&MachineKey::county("adams").unwrap()).await;
        let denver = tokio::time::timeout(
            Duration::from_millis(20),
            locks.lock(&MachineKey::county("denver").unwrap()),
        )
        .await;
        assert!(denver.is_ok());
    }

    #[tokio::test]
    async fn lock_many_tolerates_duplicates() {
        let locks = KeyedLocks::new();
        let county = MachineKey::county("adams").unwrap();
        let board = MachineKey::audit_board("adams").unwrap();

        let guards = locks
            .lock_many(&[board.clone(), county.clone(), board])
            .await;
        assert_eq!(guards.len(), 2);
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = KeyedLocks::new();
        let adams = MachineKey::county("adams").unwrap();
        let denver = MachineKey::county("denver").unwrap();

        let held = locks.lock(&adams).await;
        drop(locks.lock(&denver).await);
        assert_eq!(locks.len(), 2);

        // taking any lock sweeps released entries; held ones stay
        let eagle = locks.lock(&MachineKey::county("eagle").unwrap()).await;
        assert_eq!(locks.len(), 2);

        drop(held);
        drop(eagle);
        drop(locks.lock(&denver).await);
        assert_eq!(locks.len(), 1);
    }
}
