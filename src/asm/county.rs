//! County authority dashboard machine, one instance per county.
//!
//! A county may not start its audit until both its ballot manifest and
//! its CVR export have been uploaded. Either file may be re-uploaded any
//! number of times before the audit starts.

use crate::asm::TransitionTable;
use crate::builder::{BuildError, TransitionTableBuilder};

crate::state_enum! {
    /// States of a county's dashboard.
    pub enum CountyState {
        Initial = "COUNTY_INITIAL_STATE",
        BallotManifestOk = "BALLOT_MANIFEST_OK",
        CvrsOk = "CVRS_OK",
        BallotManifestAndCvrsOk = "BALLOT_MANIFEST_AND_CVRS_OK",
        AuditUnderway = "COUNTY_AUDIT_UNDERWAY",
        AuditComplete = "COUNTY_AUDIT_COMPLETE",
    }
    initial: Initial
    final: [AuditComplete]
}

crate::event_enum! {
    /// Events a county administrator may raise.
    pub enum CountyEvent {
        AuthenticateCountyAdministrator = "AUTHENTICATE_COUNTY_ADMINISTRATOR_EVENT",
        EstablishAuditBoard = "ESTABLISH_AUDIT_BOARD_EVENT",
        UploadBallotManifest = "UPLOAD_BALLOT_MANIFEST_EVENT",
        UploadCvrs = "UPLOAD_CVRS_EVENT",
        StartAudit = "START_AUDIT_EVENT",
        CountyAuditComplete = "COUNTY_AUDIT_COMPLETE_EVENT",
    }
}

impl CountyState {
    /// States before the audit has started.
    pub const PRE_AUDIT: &'static [CountyState] = &[
        CountyState::Initial,
        CountyState::BallotManifestOk,
        CountyState::CvrsOk,
        CountyState::BallotManifestAndCvrsOk,
    ];
}

/// The county authority's transition table.
pub fn table() -> Result<TransitionTable<CountyState, CountyEvent>, BuildError> {
    use CountyEvent::*;
    use CountyState::*;

    TransitionTableBuilder::new()
        .initial(Initial)
        .self_loops(CountyState::PRE_AUDIT, AuthenticateCountyAdministrator)
        .self_loops(CountyState::PRE_AUDIT, EstablishAuditBoard)
        .edge(AuditUnderway, EstablishAuditBoard, AuditUnderway)
        // manifest
        .edge(Initial, UploadBallotManifest, BallotManifestOk)
        .edge(BallotManifestOk, UploadBallotManifest, BallotManifestOk)
        .edge(CvrsOk, UploadBallotManifest, BallotManifestAndCvrsOk)
        .edge(BallotManifestAndCvrsOk, UploadBallotManifest, BallotManifestAndCvrsOk)
        // cvr export
        .edge(Initial, UploadCvrs, CvrsOk)
        .edge(CvrsOk, UploadCvrs, CvrsOk)
        .edge(BallotManifestOk, UploadCvrs, BallotManifestAndCvrsOk)
        .edge(BallotManifestAndCvrsOk, UploadCvrs, BallotManifestAndCvrsOk)
        .edge(BallotManifestAndCvrsOk, StartAudit, AuditUnderway)
        .edge(AuditUnderway, CountyAuditComplete, AuditComplete)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::TransitionResult;

    #[test]
    fn uploads_commute() {
        let table = table().unwrap();

        let manifest_first = table
            .apply(&CountyState::Initial, &CountyEvent::UploadBallotManifest)
            .state()
            .and_then(|s| table.apply(&s, &CountyEvent::UploadCvrs).state());
        let cvrs_first = table
            .apply(&CountyState::Initial, &CountyEvent::UploadCvrs)
            .state()
            .and_then(|s| table.apply(&s, &CountyEvent::UploadBallotManifest).state());

        assert_eq!(manifest_first, Some(CountyState::BallotManifestAndCvrsOk));
        assert_eq!(manifest_first, cvrs_first);
    }

    #[test]
    fn start_audit_requires_both_uploads() {
        let table = table().unwrap();
        for state in [
            CountyState::Initial,
            CountyState::BallotManifestOk,
            CountyState::CvrsOk,
        ] {
            assert!(!table.is_legal(&state, &CountyEvent::StartAudit));
        }
        assert_eq!(
            table.apply(&CountyState::BallotManifestAndCvrsOk, &CountyEvent::StartAudit),
            TransitionResult::Success(CountyState::AuditUnderway)
        );
    }

    #[test]
    fn uploads_close_once_audit_starts() {
        let table = table().unwrap();
        assert!(!table.is_legal(&CountyState::AuditUnderway, &CountyEvent::UploadBallotManifest));
        assert!(!table.is_legal(&CountyState::AuditUnderway, &CountyEvent::UploadCvrs));
    }

    #[test]
    fn legal_events_in_initial_state() {
        let table = table().unwrap();
        assert_eq!(
            table.events_from(&CountyState::Initial),
            vec![
                CountyEvent::AuthenticateCountyAdministrator,
                CountyEvent::EstablishAuditBoard,
                CountyEvent::UploadBallotManifest,
                CountyEvent::UploadCvrs,
            ]
        );
    }
}
