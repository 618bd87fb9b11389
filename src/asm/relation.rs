//! The many-to-many relation between events and the endpoints that may
//! raise them.
//!
//! The relation is hand-curated and closed. It is indexed in both
//! directions when built: the dispatch guard asks "which events may this
//! endpoint raise", tooling asks "which endpoints raise this event".

use crate::asm::{AsmEvent, AuditBoardEvent, CountyEvent, DosEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// External operations that may raise events.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Endpoint {
    #[serde(rename = "AuthenticateStateAdministrator")]
    AuthenticateStateAdministrator,
    #[serde(rename = "EstablishRiskLimitForComparisonAudits")]
    EstablishRiskLimit,
    #[serde(rename = "SelectContestsForAudit")]
    SelectContestsForAudit,
    #[serde(rename = "PublishRandomSeed")]
    PublishRandomSeed,
    #[serde(rename = "PublishBallotsToAudit")]
    PublishBallotsToAudit,
    #[serde(rename = "AuthenticateCountyAdministrator")]
    AuthenticateCountyAdministrator,
    #[serde(rename = "AuditBoardSignIn")]
    AuditBoardSignIn,
    #[serde(rename = "AuditBoardSignOut")]
    AuditBoardSignOut,
    #[serde(rename = "BallotManifestUpload")]
    BallotManifestUpload,
    #[serde(rename = "CVRExportUpload")]
    CvrExportUpload,
    #[serde(rename = "StartAuditRound")]
    StartAuditRound,
    #[serde(rename = "ACVRUpload")]
    AuditCvrUpload,
    #[serde(rename = "BallotNotFound")]
    BallotNotFound,
    #[serde(rename = "SubmitIntermediateAuditReport")]
    SubmitIntermediateAuditReport,
    #[serde(rename = "SubmitAuditReport")]
    SubmitAuditReport,
    /// Reserved marker: the event has no concrete operation yet.
    #[serde(rename = "UNIMPLEMENTED")]
    Unimplemented,
}

impl Endpoint {
    pub const ALL: &'static [Endpoint] = &[
        Endpoint::AuthenticateStateAdministrator,
        Endpoint::EstablishRiskLimit,
        Endpoint::SelectContestsForAudit,
        Endpoint::PublishRandomSeed,
        Endpoint::PublishBallotsToAudit,
        Endpoint::AuthenticateCountyAdministrator,
        Endpoint::AuditBoardSignIn,
        Endpoint::AuditBoardSignOut,
        Endpoint::BallotManifestUpload,
        Endpoint::CvrExportUpload,
        Endpoint::StartAuditRound,
        Endpoint::AuditCvrUpload,
        Endpoint::BallotNotFound,
        Endpoint::SubmitIntermediateAuditReport,
        Endpoint::SubmitAuditReport,
        Endpoint::Unimplemented,
    ];

    /// The endpoint identifier used at the HTTP boundary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticateStateAdministrator => "AuthenticateStateAdministrator",
            Self::EstablishRiskLimit => "EstablishRiskLimitForComparisonAudits",
            Self::SelectContestsForAudit => "SelectContestsForAudit",
            Self::PublishRandomSeed => "PublishRandomSeed",
            Self::PublishBallotsToAudit => "PublishBallotsToAudit",
            Self::AuthenticateCountyAdministrator => "AuthenticateCountyAdministrator",
            Self::AuditBoardSignIn => "AuditBoardSignIn",
            Self::AuditBoardSignOut => "AuditBoardSignOut",
            Self::BallotManifestUpload => "BallotManifestUpload",
            Self::CvrExportUpload => "CVRExportUpload",
            Self::StartAuditRound => "StartAuditRound",
            Self::AuditCvrUpload => "ACVRUpload",
            Self::BallotNotFound => "BallotNotFound",
            Self::SubmitIntermediateAuditReport => "SubmitIntermediateAuditReport",
            Self::SubmitAuditReport => "SubmitAuditReport",
            Self::Unimplemented => "UNIMPLEMENTED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|endpoint| endpoint.name() == name)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Unimplemented)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bidirectionally indexed set of (event, endpoint) pairs.
#[derive(Clone, Debug, Default)]
pub struct EventEndpointRelation {
    by_event: HashMap<AsmEvent, BTreeSet<Endpoint>>,
    by_endpoint: HashMap<Endpoint, BTreeSet<AsmEvent>>,
}

impl EventEndpointRelation {
    /// An empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The relation used by the audit workflow.
    pub fn standard() -> Self {
        use AuditBoardEvent as Ab;
        use CountyEvent as Co;
        use DosEvent as Dos;
        use Endpoint::*;

        let mut relation = Self::new();

        // state authority
        relation.insert(Dos::AuthenticateStateAdministrator, AuthenticateStateAdministrator);
        relation.insert(Dos::EstablishRiskLimit, EstablishRiskLimit);
        relation.insert(Dos::SelectContestsForComparisonAudit, SelectContestsForAudit);
        relation.insert(Dos::PublicSeed, PublishRandomSeed);
        relation.insert(Dos::PublishBallotsToAudit, PublishBallotsToAudit);
        relation.insert(Dos::IndicateFullHandCountContest, Unimplemented);
        relation.insert(Dos::PublishAuditReport, Unimplemented);

        // county authority
        relation.insert(Co::AuthenticateCountyAdministrator, AuthenticateCountyAdministrator);
        relation.insert(Co::EstablishAuditBoard, AuditBoardSignIn);
        relation.insert(Co::UploadBallotManifest, BallotManifestUpload);
        relation.insert(Co::UploadCvrs, CvrExportUpload);
        relation.insert(Co::StartAudit, StartAuditRound);
        relation.insert(Co::CountyAuditComplete, SubmitAuditReport);

        // audit board
        relation.insert(Ab::SignInAuditBoard, AuditBoardSignIn);
        relation.insert(Ab::SignOutAuditBoard, AuditBoardSignOut);
        relation.insert(Ab::RoundStart, StartAuditRound);
        relation.insert(Ab::RoundComplete, AuditCvrUpload);
        relation.insert(Ab::ReportMarkings, AuditCvrUpload);
        relation.insert(Ab::ReportBallotNotFound, BallotNotFound);
        relation.insert(Ab::SubmitAuditInvestigationReport, Unimplemented);
        relation.insert(Ab::SubmitIntermediateAuditReport, SubmitIntermediateAuditReport);
        relation.insert(Ab::SubmitAuditReport, SubmitAuditReport);

        relation
    }

    /// Insert a pair. Returns `false` if it was already present.
    pub fn insert(&mut self, event: impl Into<AsmEvent>, endpoint: Endpoint) -> bool {
        let event = event.into();
        let added = self.by_event.entry(event).or_default().insert(endpoint);
        self.by_endpoint.entry(endpoint).or_default().insert(event);
        added
    }

    /// Endpoints that may raise `event`; empty if none are registered.
    pub fn endpoints_for(&self, event: &AsmEvent) -> BTreeSet<Endpoint> {
        self.by_event.get(event).cloned().unwrap_or_default()
    }

    /// Events `endpoint` may raise; empty if none are registered.
    pub fn events_for(&self, endpoint: Endpoint) -> BTreeSet<AsmEvent> {
        self.by_endpoint.get(&endpoint).cloned().unwrap_or_default()
    }

    pub fn contains(&self, event: &AsmEvent, endpoint: Endpoint) -> bool {
        self.by_event
            .get(event)
            .is_some_and(|endpoints| endpoints.contains(&endpoint))
    }

    /// Every pair, sorted by event then endpoint.
    pub fn pairs(&self) -> Vec<(AsmEvent, Endpoint)> {
        let mut pairs: Vec<(AsmEvent, Endpoint)> = self
            .by_event
            .iter()
            .flat_map(|(event, endpoints)| endpoints.iter().map(move |ep| (*event, *ep)))
            .collect();
        pairs.sort();
        pairs
    }

    /// Events whose only endpoint is the placeholder.
    pub fn placeholder_only_events(&self) -> Vec<AsmEvent> {
        let mut events: Vec<AsmEvent> = self
            .by_event
            .iter()
            .filter(|(_, endpoints)| endpoints.iter().all(Endpoint::is_placeholder))
            .map(|(event, _)| *event)
            .collect();
        events.sort();
        events
    }

    pub fn len(&self) -> usize {
        self.by_event.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }
}
