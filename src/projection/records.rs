//! Audit records kept outside the machine store.
//!
//! The workflow core does not persist these; an [`AuditRecords`]
//! implementation supplies them to the projection builder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

pub type ContestId = u64;

/// Why a contest was selected for audit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditReason {
    StateWideContest,
    CountyWideContest,
    CloseContest,
    TiedContest,
    GeographicalScope,
    ConcerningContest,
    Opportunistic,
}

impl fmt::Display for AuditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StateWideContest => "STATE_WIDE_CONTEST",
            Self::CountyWideContest => "COUNTY_WIDE_CONTEST",
            Self::CloseContest => "CLOSE_CONTEST",
            Self::TiedContest => "TIED_CONTEST",
            Self::GeographicalScope => "GEOGRAPHICAL_SCOPE",
            Self::ConcerningContest => "CONCERNING_CONTEST",
            Self::Opportunistic => "OPPORTUNISTIC",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditType {
    Comparison,
    HandCount,
    NotAuditable,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestToAudit {
    pub contest: ContestId,
    pub audit: AuditType,
    pub reason: AuditReason,
}

/// Election-wide audit parameters set by the state authority.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub election_type: Option<String>,
    pub election_date: Option<DateTime<Utc>>,
    pub public_meeting_date: Option<DateTime<Utc>>,
    pub seed: Option<String>,
    pub risk_limit: Option<f64>,
}

/// The single state authority dashboard record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateAuthorityRecord {
    pub contests_to_audit: Vec<ContestToAudit>,
    pub audit_info: AuditInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub hash: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBoardMember {
    pub first_name: String,
    pub last_name: String,
    pub political_party: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBoard {
    pub members: Vec<AuditBoardMember>,
    pub sign_in_time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub expected_count: u32,
    pub actual_count: u32,
    pub start_audited_prefix_length: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Counters reported on every county dashboard refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyCounters {
    pub estimated_ballots_to_audit: u32,
    pub optimistic_ballots_to_audit: u32,
    pub ballots_remaining_in_round: u32,
    pub ballot_manifest_count: u32,
    pub cvr_export_count: u32,
    pub audited_ballot_count: u32,
    pub audited_prefix_length: u32,
    pub discrepancy_count: BTreeMap<AuditReason, u32>,
    pub disagreement_count: BTreeMap<AuditReason, u32>,
}

/// One county's dashboard record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountyDashboardRecord {
    pub county: String,
    pub ballot_manifest: Option<UploadedFile>,
    pub cvr_export: Option<UploadedFile>,
    /// Contests on the county's ballots.
    pub contests: Vec<ContestId>,
    pub audit_board: Option<AuditBoard>,
    pub audit_time: Option<DateTime<Utc>>,
    pub counters: CountyCounters,
    pub ballot_under_audit: Option<u64>,
    pub rounds: Vec<Round>,
    pub current_round: Option<Round>,
}

impl CountyDashboardRecord {
    /// A county with nothing uploaded yet.
    pub fn empty(county: impl Into<String>) -> Self {
        Self {
            county: county.into(),
            ballot_manifest: None,
            cvr_export: None,
            contests: Vec::new(),
            audit_board: None,
            audit_time: None,
            counters: CountyCounters::default(),
            ballot_under_audit: None,
            rounds: Vec::new(),
            current_round: None,
        }
    }

    pub fn uploads_complete(&self) -> bool {
        self.ballot_manifest.is_some() && self.cvr_export.is_some()
    }
}

/// Audit records could not be read.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("audit records unavailable: {0}")]
pub struct RecordsError(pub String);

/// Read access to the audit records the projections report.
#[async_trait]
pub trait AuditRecords: Send + Sync {
    async fn state_authority(&self) -> Result<Option<StateAuthorityRecord>, RecordsError>;

    async fn county(&self, county: &str) -> Result<Option<CountyDashboardRecord>, RecordsError>;
}

/// Process-local audit records.
#[derive(Debug, Default)]
pub struct InMemoryAuditRecords {
    state_authority: RwLock<Option<StateAuthorityRecord>>,
    counties: RwLock<HashMap<String, CountyDashboardRecord>>,
}

impl InMemoryAuditRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_state_authority(&self, record: StateAuthorityRecord) {
        *self.state_authority.write().await = Some(record);
    }

    pub async fn put_county(&self, record: CountyDashboardRecord) {
        self.counties
            .write()
            .await
            .insert(record.county.clone(), record);
    }
}

#[async_trait]
impl AuditRecords for InMemoryAuditRecords {
    async fn state_authority(&self) -> Result<Option<StateAuthorityRecord>, RecordsError> {
        Ok(self.state_authority.read().await.clone())
    }

    async fn county(&self, county: &str) -> Result<Option<CountyDashboardRecord>, RecordsError> {
        Ok(self.counties.read().await.get(county).cloned())
    }
}
