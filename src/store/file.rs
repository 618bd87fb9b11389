//! File-backed machine store.
//!
//! One record per instance at `<root>/<KIND>/<identity>.<ext>`. Writes go
//! to a uniquely named temporary file in the same directory which is then
//! renamed over the record, so readers never see a partially written record.
//!
//! Several stores, in this process or others, may share one root. Every
//! read-check-write runs under an exclusive advisory lock on
//! `<identity>.<ext>.lock`, so a save from a stale version is always seen
//! as a conflict rather than overwriting a newer record.

use crate::asm::ActorKind;
use crate::checkpoint::{MachineRecord, RecordError, RecordFormat};
use crate::store::{
    check_version, write_with_effect, KeyLease, KeyedLocks, MachineInstance, MachineKey,
    MachineStore, StoreError, TransitionEffect,
};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// Exclusive lock on one record file, released on drop.
struct RecordLock {
    #[cfg(unix)]
    _file: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl RecordLock {
    /// Block until the lock at `path` is ours.
    fn acquire(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        #[cfg(unix)]
        {
            use nix::fcntl::{Flock, FlockArg};
            let file = Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_, errno)| io::Error::from(errno))?;
            Ok(Self { _file: file })
        }

        #[cfg(not(unix))]
        {
            file.lock()?;
            Ok(Self { _file: file })
        }
    }
}

/// Both the in-process mutex and the record lock for each held key.
/// In-process mutexes are taken first so at most one blocking thread per
/// key waits on the file lock.
struct Held {
    _records: Vec<RecordLock>,
    _process: Vec<OwnedMutexGuard<()>>,
}

#[derive(Debug)]
pub struct FileMachineStore {
    root: PathBuf,
    format: RecordFormat,
    locks: KeyedLocks,
}

impl FileMachineStore {
    pub fn new(root: impl Into<PathBuf>, format: RecordFormat) -> Self {
        Self {
            root: root.into(),
            format,
            locks: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Path of the record for `key`.
    pub fn record_path(&self, key: &MachineKey) -> PathBuf {
        self.root
            .join(key.kind().name())
            .join(format!("{}.{}", key.identity(), self.format.extension()))
    }

    fn lock_path(&self, key: &MachineKey) -> PathBuf {
        let record = self.record_path(key);
        record.with_extension(format!("{}.lock", self.format.extension()))
    }

    async fn lock_record(&self, key: &MachineKey) -> Result<RecordLock, StoreError> {
        let path = self.lock_path(key);
        tokio::task::spawn_blocking(move || RecordLock::acquire(&path))
            .await
            .map_err(|e| StoreError::Unavailable(io::Error::other(e)))?
            .map_err(StoreError::Unavailable)
    }

    /// Lock `keys` in sorted order, in process and on disk.
    async fn hold(&self, keys: &[MachineKey]) -> Result<Held, StoreError> {
        let process = self.locks.lock_many(keys).await;

        let mut sorted: Vec<&MachineKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut records = Vec::with_capacity(sorted.len());
        for key in sorted {
            records.push(self.lock_record(key).await?);
        }
        Ok(Held {
            _records: records,
            _process: process,
        })
    }

    async fn read(&self, key: &MachineKey) -> Result<Option<MachineInstance>, StoreError> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Unavailable(e)),
        };

        let corrupt = |source: RecordError| {
            tracing::error!(
                path = %path.display(),
                error = %source,
                "machine record cannot be decoded"
            );
            StoreError::Corrupt {
                key: key.to_string(),
                source,
            }
        };

        let record = MachineRecord::decode(&bytes, self.format).map_err(corrupt)?;
        if record.kind != key.kind() || record.identity != key.identity() {
            return Err(corrupt(RecordError::ValidationFailed(format!(
                "record names {}/{}",
                record.kind, record.identity
            ))));
        }
        MachineInstance::from_record(record).map(Some).map_err(corrupt)
    }

    async fn write(&self, instance: &MachineInstance) -> Result<(), StoreError> {
        let path = self.record_path(instance.key());
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let bytes = instance
            .to_record()
            .encode(self.format)
            .map_err(|source| StoreError::Corrupt {
                key: instance.key().to_string(),
                source,
            })?;

        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            self.format.extension(),
            Uuid::new_v4().simple()
        ));
        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl MachineStore for FileMachineStore {
    async fn get(&self, key: &MachineKey) -> Result<MachineInstance, StoreError> {
        let _held = self.hold(std::slice::from_ref(key)).await?;
        if let Some(instance) = self.read(key).await? {
            return Ok(instance);
        }

        let instance = MachineInstance::initial(key.clone());
        self.write(&instance).await?;
        tracing::debug!(%key, instance_id = %instance.instance_id(), "created machine instance");
        Ok(instance)
    }

    async fn load(&self, key: &MachineKey) -> Result<Option<MachineInstance>, StoreError> {
        self.read(key).await
    }

    async fn lease(&self, keys: &[MachineKey]) -> Result<KeyLease, StoreError> {
        let held = self.hold(keys).await?;
        Ok(KeyLease::new(keys, held))
    }

    async fn load_leased(
        &self,
        lease: &KeyLease,
    ) -> Result<Vec<Option<MachineInstance>>, StoreError> {
        let mut instances = Vec::with_capacity(lease.keys().len());
        for key in lease.keys() {
            instances.push(self.read(key).await?);
        }
        Ok(instances)
    }

    async fn save(
        &self,
        instance: &MachineInstance,
        effect: Option<&dyn TransitionEffect>,
    ) -> Result<MachineInstance, StoreError> {
        let _held = self.hold(std::slice::from_ref(instance.key())).await?;

        let stored = self.read(instance.key()).await?;
        check_version(instance, stored.as_ref())?;

        let committed = instance.committed();
        write_with_effect(&committed, effect, self.write(&committed)).await?;
        Ok(committed)
    }

    async fn reset(&self, key: &MachineKey) -> Result<MachineInstance, StoreError> {
        let _held = self.hold(std::slice::from_ref(key)).await?;

        let reset = match self.read(key).await? {
            Some(existing) => existing.reset(),
            None => MachineInstance::initial(key.clone()),
        };
        self.write(&reset).await?;
        tracing::info!(%key, version = reset.version(), "machine instance reset");
        Ok(reset)
    }

    async fn list(&self, kind: ActorKind) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(kind.name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Unavailable(e)),
        };

        let mut identities = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.format.extension()) {
                continue;
            }
            if let Some(identity) = path.file_stem().and_then(|stem| stem.to_str()) {
                identities.push(identity.to_string());
            }
        }
        identities.sort();
        Ok(identities)
    }
}
