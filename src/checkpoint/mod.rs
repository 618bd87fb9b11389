//! Persisted form of a machine instance.
//!
//! Records store state and event *names* rather than the in-memory enum
//! layout, so a record stays readable as long as the vocabulary keeps its
//! names. JSON is the readable format, bincode the compact one.

use crate::asm::{ActorKind, AsmEvent, AsmState};
use crate::core::{Event, State, StateHistory, StateTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::RecordError;

/// Version identifier for the record format
pub const RECORD_VERSION: u32 = 1;

/// On-disk encoding of a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    #[default]
    Json,
    Binary,
}

impl RecordFormat {
    /// File extension used by the file store.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "bin",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "binary" | "bincode" | "bin" => Some(Self::Binary),
            _ => None,
        }
    }
}

/// One accepted transition, by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event: String,
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

/// Serializable snapshot of one machine instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    /// Record format version
    pub version: u32,

    /// Assigned once, when the instance is first created
    pub instance_id: Uuid,

    pub kind: ActorKind,

    pub identity: String,

    /// Current state name
    pub state: String,

    /// Accepted transitions, oldest first
    pub history: Vec<HistoryEntry>,

    /// Optimistic concurrency version; bumped on every save
    pub store_version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl MachineRecord {
    /// Encode in `format`.
    pub fn encode(&self, format: RecordFormat) -> Result<Vec<u8>, RecordError> {
        match format {
            RecordFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| RecordError::SerializationFailed(e.to_string())),
            RecordFormat::Binary => bincode::serialize(self)
                .map_err(|e| RecordError::SerializationFailed(e.to_string())),
        }
    }

    /// Decode from `format`, rejecting records written by a newer format.
    pub fn decode(bytes: &[u8], format: RecordFormat) -> Result<Self, RecordError> {
        let record: Self = match format {
            RecordFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| RecordError::DeserializationFailed(e.to_string()))?,
            RecordFormat::Binary => bincode::deserialize(bytes)
                .map_err(|e| RecordError::DeserializationFailed(e.to_string()))?,
        };

        if record.version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion {
                found: record.version,
                supported: RECORD_VERSION,
            });
        }
        Ok(record)
    }

    /// Resolve the current state against the vocabulary of `self.kind`.
    pub fn current_state(&self) -> Result<AsmState, RecordError> {
        resolve_state(self.kind, &self.state)
    }

    /// Resolve the history against the vocabulary of `self.kind`.
    pub fn transitions(&self) -> Result<StateHistory<AsmState, AsmEvent>, RecordError> {
        self.history
            .iter()
            .map(|entry| {
                Ok(StateTransition {
                    event: AsmEvent::from_name(self.kind, &entry.event).ok_or_else(|| {
                        RecordError::ValidationFailed(format!(
                            "unknown {} event {}",
                            self.kind, entry.event
                        ))
                    })?,
                    from: resolve_state(self.kind, &entry.from)?,
                    to: resolve_state(self.kind, &entry.to)?,
                    timestamp: entry.timestamp,
                })
            })
            .collect()
    }
}

impl From<&StateTransition<AsmState, AsmEvent>> for HistoryEntry {
    fn from(transition: &StateTransition<AsmState, AsmEvent>) -> Self {
        Self {
            event: transition.event.name().to_string(),
            from: transition.from.name().to_string(),
            to: transition.to.name().to_string(),
            timestamp: transition.timestamp,
        }
    }
}

fn resolve_state(kind: ActorKind, name: &str) -> Result<AsmState, RecordError> {
    AsmState::from_name(kind, name)
        .ok_or_else(|| RecordError::ValidationFailed(format!("unknown {kind} state {name}")))
}
