//! Read-only dashboard projections.
//!
//! A projection combines machine states with audit records into an
//! immutable snapshot. Projections never create or transition machines: an
//! instance that has not been referenced yet is reported at its initial
//! state and nothing is written.
//!
//! Records are read while holding a [`KeyLease`] on every machine the
//! snapshot reports, so records written by a transition's side effect
//! appear exactly when the transition itself does.

pub mod records;
pub mod snapshot;

pub use records::{
    AuditBoard, AuditBoardMember, AuditInfo, AuditReason, AuditRecords, AuditType, ContestId,
    ContestToAudit, CountyCounters, CountyDashboardRecord, InMemoryAuditRecords, RecordsError,
    Round, StateAuthorityRecord, UploadedFile,
};
pub use snapshot::{CountyDashboardSnapshot, CountyStatus, StateDashboardSnapshot};

use crate::asm::{ActorKind, AsmState, AuditBoardState, CountyState, DosState};
use crate::store::{KeyLease, MachineInstance, MachineKey, MachineStore, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A backing record the projection requires does not exist.
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Records(#[from] RecordsError),
}

/// Builds dashboard snapshots from the machine store and audit records.
#[derive(Clone)]
pub struct ProjectionBuilder {
    store: Arc<dyn MachineStore>,
    records: Arc<dyn AuditRecords>,
}

impl ProjectionBuilder {
    pub fn new(store: Arc<dyn MachineStore>, records: Arc<dyn AuditRecords>) -> Self {
        Self { store, records }
    }

    /// Full county dashboard: contests, contests under audit and audit
    /// information in addition to states, uploads and counters.
    pub async fn county_full(&self, county: &str) -> Result<CountyDashboardSnapshot, ProjectionError> {
        let lease = self
            .store
            .lease(&[
                MachineKey::county(county)?,
                MachineKey::audit_board(county)?,
                MachineKey::dos(),
            ])
            .await?;
        let dos = self.state_authority_record().await?;
        let record = self.county_record(county).await?;
        let (county_state, audit_board_state) = self.county_states(&lease).await?;
        drop(lease);

        let mut snapshot = abbreviated(county_state, audit_board_state, &record);

        // contests are only meaningful once both files are in
        let mut contests = Vec::new();
        let mut contests_under_audit = BTreeMap::new();
        if record.uploads_complete() {
            contests = record.contests.clone();
            contests.sort_unstable();
            for cta in &dos.contests_to_audit {
                if cta.audit == AuditType::Comparison && contests.binary_search(&cta.contest).is_ok() {
                    contests_under_audit.insert(cta.contest, cta.reason);
                }
            }
        }

        snapshot.general_information = Some(BTreeMap::new());
        snapshot.contests = Some(contests);
        snapshot.contests_under_audit = Some(contests_under_audit);
        snapshot.ballot_under_audit = record.ballot_under_audit;
        snapshot.audit_info = Some(dos.audit_info);
        Ok(snapshot)
    }

    /// Abbreviated county dashboard: states, uploads and counters only.
    pub async fn county_abbreviated(
        &self,
        county: &str,
    ) -> Result<CountyDashboardSnapshot, ProjectionError> {
        let lease = self
            .store
            .lease(&[MachineKey::county(county)?, MachineKey::audit_board(county)?])
            .await?;
        let record = self.county_record(county).await?;
        let (county_state, audit_board_state) = self.county_states(&lease).await?;
        Ok(abbreviated(county_state, audit_board_state, &record))
    }

    /// State authority dashboard: its own state plus every known county's
    /// machine states.
    pub async fn state_dashboard(&self) -> Result<StateDashboardSnapshot, ProjectionError> {
        let mut counties: BTreeSet<String> =
            self.store.list(ActorKind::CountyAuthority).await?.into_iter().collect();
        counties.extend(self.store.list(ActorKind::AuditBoard).await?);

        let mut keys = vec![MachineKey::dos()];
        for county in &counties {
            keys.push(MachineKey::county(county.as_str())?);
            keys.push(MachineKey::audit_board(county.as_str())?);
        }
        let lease = self.store.lease(&keys).await?;
        let dos = self.state_authority_record().await?;
        let instances = self.store.load_leased(&lease).await?;
        drop(lease);

        let dos_state = match instances.first().and_then(current_state) {
            Some(AsmState::Dos(state)) => state,
            _ => DosState::INITIAL,
        };
        let statuses = counties
            .into_iter()
            .zip(instances.get(1..).unwrap_or_default().chunks(2))
            .map(|(county, pair)| {
                let status = CountyStatus {
                    county_state: county_state_of(pair.first()),
                    audit_board_state: audit_board_state_of(pair.get(1)),
                };
                (county, status)
            })
            .collect();

        Ok(StateDashboardSnapshot {
            dos_state,
            counties: statuses,
            contests_to_audit: dos.contests_to_audit,
            audit_info: dos.audit_info,
        })
    }

    async fn county_record(&self, county: &str) -> Result<CountyDashboardRecord, ProjectionError> {
        self.records
            .county(county)
            .await?
            .ok_or_else(|| ProjectionError::NotFound(format!("county record for {county}")))
    }

    async fn state_authority_record(&self) -> Result<StateAuthorityRecord, ProjectionError> {
        self.records
            .state_authority()
            .await?
            .ok_or_else(|| ProjectionError::NotFound("state authority record".to_string()))
    }

    /// A county's machine states from a lease whose first two keys are its
    /// county and audit board machines.
    async fn county_states(
        &self,
        lease: &KeyLease,
    ) -> Result<(CountyState, AuditBoardState), ProjectionError> {
        let instances = self.store.load_leased(lease).await?;
        Ok((
            county_state_of(instances.first()),
            audit_board_state_of(instances.get(1)),
        ))
    }
}

fn current_state(instance: &Option<MachineInstance>) -> Option<AsmState> {
    instance.as_ref().map(MachineInstance::state)
}

fn county_state_of(instance: Option<&Option<MachineInstance>>) -> CountyState {
    match instance.and_then(current_state) {
        Some(AsmState::County(state)) => state,
        _ => CountyState::INITIAL,
    }
}

fn audit_board_state_of(instance: Option<&Option<MachineInstance>>) -> AuditBoardState {
    match instance.and_then(current_state) {
        Some(AsmState::AuditBoard(state)) => state,
        _ => AuditBoardState::INITIAL,
    }
}

fn abbreviated(
    county_state: CountyState,
    audit_board_state: AuditBoardState,
    record: &CountyDashboardRecord,
) -> CountyDashboardSnapshot {
    let manifest = record.ballot_manifest.as_ref();
    let cvr_export = record.cvr_export.as_ref();

    CountyDashboardSnapshot {
        county: record.county.clone(),
        county_state,
        audit_board_state,
        general_information: None,
        audit_board: record.audit_board.clone(),
        ballot_manifest_hash: manifest.map(|f| f.hash.clone()),
        ballot_manifest_timestamp: manifest.map(|f| f.timestamp),
        ballot_manifest_filename: manifest.map(|f| f.filename.clone()),
        cvr_export_hash: cvr_export.map(|f| f.hash.clone()),
        cvr_export_timestamp: cvr_export.map(|f| f.timestamp),
        cvr_export_filename: cvr_export.map(|f| f.filename.clone()),
        contests: None,
        contests_under_audit: None,
        audit_time: record.audit_time,
        counters: record.counters.clone(),
        ballot_under_audit: None,
        rounds: record.rounds.clone(),
        current_round: record.current_round.clone(),
        audit_info: None,
    }
}
