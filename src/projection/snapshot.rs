//! Immutable reporting snapshots.

use crate::asm::{AuditBoardState, CountyState, DosState};
use crate::projection::records::{
    AuditBoard, AuditInfo, AuditReason, ContestId, ContestToAudit, CountyCounters, Round,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// County dashboard refresh.
///
/// The abbreviated variant leaves every `Option` that only the full
/// variant fills (`general_information`, `contests`,
/// `contests_under_audit`, `ballot_under_audit`, `audit_info`) as `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountyDashboardSnapshot {
    pub county: String,
    pub county_state: CountyState,
    pub audit_board_state: AuditBoardState,
    pub general_information: Option<BTreeMap<String, String>>,
    pub audit_board: Option<AuditBoard>,
    pub ballot_manifest_hash: Option<String>,
    pub ballot_manifest_timestamp: Option<DateTime<Utc>>,
    pub ballot_manifest_filename: Option<String>,
    pub cvr_export_hash: Option<String>,
    pub cvr_export_timestamp: Option<DateTime<Utc>>,
    pub cvr_export_filename: Option<String>,
    pub contests: Option<Vec<ContestId>>,
    pub contests_under_audit: Option<BTreeMap<ContestId, AuditReason>>,
    pub audit_time: Option<DateTime<Utc>>,
    pub counters: CountyCounters,
    pub ballot_under_audit: Option<u64>,
    pub rounds: Vec<Round>,
    pub current_round: Option<Round>,
    pub audit_info: Option<AuditInfo>,
}

/// Machine states of one county, as seen by the state authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CountyStatus {
    pub county_state: CountyState,
    pub audit_board_state: AuditBoardState,
}

/// State authority dashboard refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateDashboardSnapshot {
    pub dos_state: DosState,
    pub counties: BTreeMap<String, CountyStatus>,
    pub contests_to_audit: Vec<ContestToAudit>,
    pub audit_info: AuditInfo,
}
