//! Audit board dashboard machine, one instance per county.
//!
//! Rounds are started by the county; the board may sign in or out at
//! any point before the final report. Reports are only accepted while a
//! round is in progress with the board signed in.

use crate::asm::TransitionTable;
use crate::builder::{BuildError, TransitionTableBuilder};

crate::state_enum! {
    /// States of a county audit board's dashboard.
    pub enum AuditBoardState {
        Initial = "AUDIT_INITIAL_STATE",
        WaitingForRoundStart = "WAITING_FOR_ROUND_START",
        WaitingForRoundStartNoAuditBoard = "WAITING_FOR_ROUND_START_NO_AUDIT_BOARD",
        RoundInProgress = "ROUND_IN_PROGRESS",
        RoundInProgressNoAuditBoard = "ROUND_IN_PROGRESS_NO_AUDIT_BOARD",
        AuditComplete = "AUDIT_BOARD_AUDIT_COMPLETE",
    }
    initial: Initial
    final: [AuditComplete]
}

crate::event_enum! {
    /// Events an audit board may raise.
    pub enum AuditBoardEvent {
        SignInAuditBoard = "SIGN_IN_AUDIT_BOARD_EVENT",
        SignOutAuditBoard = "SIGN_OUT_AUDIT_BOARD_EVENT",
        RoundStart = "ROUND_START_EVENT",
        RoundComplete = "ROUND_COMPLETE_EVENT",
        ReportMarkings = "REPORT_MARKINGS_EVENT",
        ReportBallotNotFound = "REPORT_BALLOT_NOT_FOUND_EVENT",
        SubmitAuditInvestigationReport = "SUBMIT_AUDIT_INVESTIGATION_REPORT_EVENT",
        SubmitIntermediateAuditReport = "SUBMIT_INTERMEDIATE_AUDIT_REPORT_EVENT",
        SubmitAuditReport = "SUBMIT_AUDIT_REPORT_EVENT",
    }
}

/// The audit board's transition table.
pub fn table() -> Result<TransitionTable<AuditBoardState, AuditBoardEvent>, BuildError> {
    use AuditBoardEvent::*;
    use AuditBoardState::*;

    TransitionTableBuilder::new()
        .initial(Initial)
        // sign in / out
        .edge(Initial, SignInAuditBoard, WaitingForRoundStart)
        .edge(WaitingForRoundStartNoAuditBoard, SignInAuditBoard, WaitingForRoundStart)
        .edge(RoundInProgressNoAuditBoard, SignInAuditBoard, RoundInProgress)
        .edge(WaitingForRoundStart, SignOutAuditBoard, WaitingForRoundStartNoAuditBoard)
        .edge(RoundInProgress, SignOutAuditBoard, RoundInProgressNoAuditBoard)
        // rounds
        .edge(Initial, RoundStart, RoundInProgressNoAuditBoard)
        .edge(WaitingForRoundStart, RoundStart, RoundInProgress)
        .edge(WaitingForRoundStartNoAuditBoard, RoundStart, RoundInProgressNoAuditBoard)
        .edge(RoundInProgress, RoundComplete, WaitingForRoundStart)
        .edge(RoundInProgressNoAuditBoard, RoundComplete, WaitingForRoundStartNoAuditBoard)
        // reporting during a round
        .self_loops(&[RoundInProgress], ReportMarkings)
        .self_loops(&[RoundInProgress], ReportBallotNotFound)
        .self_loops(&[RoundInProgress], SubmitAuditInvestigationReport)
        .self_loops(&[RoundInProgress], SubmitIntermediateAuditReport)
        .edge(RoundInProgress, SubmitAuditReport, AuditComplete)
        .edge(WaitingForRoundStart, SubmitAuditReport, AuditComplete)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markings_require_signed_in_board() {
        let table = table().unwrap();
        assert!(table.is_legal(&AuditBoardState::RoundInProgress, &AuditBoardEvent::ReportMarkings));
        assert!(!table.is_legal(
            &AuditBoardState::RoundInProgressNoAuditBoard,
            &AuditBoardEvent::ReportMarkings
        ));
        assert!(!table.is_legal(
            &AuditBoardState::WaitingForRoundStart,
            &AuditBoardEvent::ReportMarkings
        ));
    }

    #[test]
    fn round_can_start_before_board_signs_in() {
        let table = table().unwrap();
        let state = table
            .apply(&AuditBoardState::Initial, &AuditBoardEvent::RoundStart)
            .state()
            .unwrap();
        assert_eq!(state, AuditBoardState::RoundInProgressNoAuditBoard);

        let state = table
            .apply(&state, &AuditBoardEvent::SignInAuditBoard)
            .state()
            .unwrap();
        assert_eq!(state, AuditBoardState::RoundInProgress);
    }

    #[test]
    fn completed_round_returns_to_waiting() {
        let table = table().unwrap();
        assert_eq!(
            table
                .apply(&AuditBoardState::RoundInProgress, &AuditBoardEvent::RoundComplete)
                .state(),
            Some(AuditBoardState::WaitingForRoundStart)
        );
    }
}
