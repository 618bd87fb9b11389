//! Machine keys and instances.

use crate::asm::{ActorKind, AsmEvent, AsmState};
use crate::checkpoint::{HistoryEntry, MachineRecord, RecordError, RECORD_VERSION};
use crate::core::{State, StateHistory, StateTransition};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of the single state authority instance.
pub const DOS_IDENTITY: &str = "dos";

const MAX_IDENTITY_LEN: usize = 128;

/// (actor kind, identity) pair naming one machine instance.
///
/// Identities are restricted to ASCII alphanumerics, `-`, `_` and `.`
/// (not leading) so they can double as file names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachineKey {
    kind: ActorKind,
    identity: String,
}

impl MachineKey {
    pub fn new(kind: ActorKind, identity: impl Into<String>) -> Result<Self, StoreError> {
        let identity = identity.into();

        if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
            return Err(StoreError::InvalidKey(format!(
                "{kind} identity must be 1..={MAX_IDENTITY_LEN} characters"
            )));
        }
        if identity.starts_with('.')
            || !identity
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(StoreError::InvalidKey(format!(
                "{kind} identity {identity:?} contains unsupported characters"
            )));
        }
        if kind == ActorKind::StateAuthority && identity != DOS_IDENTITY {
            return Err(StoreError::InvalidKey(format!(
                "state authority identity must be {DOS_IDENTITY:?}, got {identity:?}"
            )));
        }

        Ok(Self { kind, identity })
    }

    /// The state authority's key.
    pub fn dos() -> Self {
        Self {
            kind: ActorKind::StateAuthority,
            identity: DOS_IDENTITY.to_string(),
        }
    }

    pub fn county(county: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(ActorKind::CountyAuthority, county)
    }

    pub fn audit_board(county: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(ActorKind::AuditBoard, county)
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for MachineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.identity)
    }
}

/// A persisted machine: current state, history and concurrency version.
///
/// Instances are values. A transition produces a new instance carrying
/// the version it was loaded at; the store compares that version with the
/// stored one when saving.
#[derive(Clone, Debug, PartialEq)]
pub struct MachineInstance {
    key: MachineKey,
    instance_id: Uuid,
    state: AsmState,
    history: StateHistory<AsmState, AsmEvent>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MachineInstance {
    /// A fresh instance at the initial state of its kind, at version 1.
    pub fn initial(key: MachineKey) -> Self {
        let now = Utc::now();
        Self {
            state: AsmState::initial(key.kind()),
            key,
            instance_id: Uuid::new_v4(),
            history: StateHistory::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> &MachineKey {
        &self.key
    }

    pub fn kind(&self) -> ActorKind {
        self.key.kind()
    }

    pub fn identity(&self) -> &str {
        self.key.identity()
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn state(&self) -> AsmState {
        self.state
    }

    pub fn history(&self) -> &StateHistory<AsmState, AsmEvent> {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The instance after `transition`, still at the loaded version.
    pub fn with_transition(&self, transition: StateTransition<AsmState, AsmEvent>) -> Self {
        Self {
            state: transition.to,
            updated_at: transition.timestamp,
            history: self.history.record(transition),
            ..self.clone()
        }
    }

    /// The instance as written by a successful save.
    pub(crate) fn committed(&self) -> Self {
        Self {
            version: self.version + 1,
            ..self.clone()
        }
    }

    /// Back at the initial state with an empty history, keeping the
    /// instance id. The version still advances so stale writers conflict.
    pub(crate) fn reset(&self) -> Self {
        Self {
            state: AsmState::initial(self.kind()),
            history: StateHistory::new(),
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn to_record(&self) -> MachineRecord {
        MachineRecord {
            version: RECORD_VERSION,
            instance_id: self.instance_id,
            kind: self.kind(),
            identity: self.identity().to_string(),
            state: self.state.name().to_string(),
            history: self
                .history
                .transitions()
                .iter()
                .map(HistoryEntry::from)
                .collect(),
            store_version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_record(record: MachineRecord) -> Result<Self, RecordError> {
        let key = MachineKey::new(record.kind, record.identity.clone())
            .map_err(|e| RecordError::ValidationFailed(e.to_string()))?;
        Ok(Self {
            state: record.current_state()?,
            history: record.transitions()?,
            key,
            instance_id: record.instance_id,
            version: record.store_version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{CountyEvent, CountyState};

    #[test]
    fn dos_identity_is_fixed() {
        assert_eq!(
            MachineKey::new(ActorKind::StateAuthority, "dos").unwrap(),
            MachineKey::dos()
        );
        assert!(matches!(
            MachineKey::new(ActorKind::StateAuthority, "colorado"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn identities_must_be_path_safe() {
        assert!(MachineKey::county("adams").is_ok());
        assert!(MachineKey::county("el-paso_2").is_ok());
        for bad in ["", "../etc", ".hidden", "a/b", "san juan"] {
            assert!(MachineKey::county(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn key_display() {
        assert_eq!(MachineKey::audit_board("adams").unwrap().to_string(), "AUDIT_BOARD/adams");
    }

    #[test]
    fn transition_keeps_loaded_version() {
        let instance = MachineInstance::initial(MachineKey::county("adams").unwrap());
        let next = instance.with_transition(StateTransition {
            event: CountyEvent::UploadCvrs.into(),
            from: instance.state(),
            to: CountyState::CvrsOk.into(),
            timestamp: Utc::now(),
        });

        assert_eq!(next.version(), instance.version());
        assert_eq!(next.state(), AsmState::County(CountyState::CvrsOk));
        assert_eq!(next.history().len(), 1);
        assert_eq!(next.instance_id(), instance.instance_id());
        assert_eq!(next.committed().version(), instance.version() + 1);
    }

    #[test]
    fn record_conversion_preserves_instance() {
        let instance = MachineInstance::initial(MachineKey::county("adams").unwrap())
            .with_transition(StateTransition {
                event: CountyEvent::UploadBallotManifest.into(),
                from: CountyState::Initial.into(),
                to: CountyState::BallotManifestOk.into(),
                timestamp: Utc::now(),
            });

        let restored = MachineInstance::from_record(instance.to_record()).unwrap();
        assert_eq!(restored, instance);
    }

    #[test]
    fn reset_clears_history_and_advances_version() {
        let instance = MachineInstance::initial(MachineKey::county("adams").unwrap())
            .with_transition(StateTransition {
                event: CountyEvent::UploadCvrs.into(),
                from: CountyState::Initial.into(),
                to: CountyState::CvrsOk.into(),
                timestamp: Utc::now(),
            });

        let reset = instance.reset();
        assert_eq!(reset.state(), AsmState::County(CountyState::Initial));
        assert!(reset.history().is_empty());
        assert_eq!(reset.version(), instance.version() + 1);
        assert_eq!(reset.instance_id(), instance.instance_id());
    }
}
