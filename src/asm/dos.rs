//! State authority (Department of State) dashboard machine.
//!
//! There is exactly one instance of this machine per audit.

use crate::asm::TransitionTable;
use crate::builder::{BuildError, TransitionTableBuilder};

crate::state_enum! {
    /// States of the state authority's dashboard.
    pub enum DosState {
        Initial = "DOS_INITIAL_STATE",
        Authenticated = "DOS_AUTHENTICATED",
        RiskLimitsSet = "RISK_LIMITS_SET",
        ContestsToAuditIdentified = "CONTESTS_TO_AUDIT_IDENTIFIED",
        RandomSeedPublished = "RANDOM_SEED_PUBLISHED",
        AuditOngoing = "DOS_AUDIT_ONGOING",
        AuditResultsPublished = "AUDIT_RESULTS_PUBLISHED",
    }
    initial: Initial
    final: [AuditResultsPublished]
}

crate::event_enum! {
    /// Events the state authority may raise.
    pub enum DosEvent {
        AuthenticateStateAdministrator = "AUTHENTICATE_STATE_ADMINISTRATOR_EVENT",
        EstablishRiskLimit = "ESTABLISH_RISK_LIMIT_FOR_COMPARISON_AUDITS_EVENT",
        SelectContestsForComparisonAudit = "SELECT_CONTESTS_FOR_COMPARISON_AUDIT_EVENT",
        PublicSeed = "PUBLIC_SEED_EVENT",
        PublishBallotsToAudit = "PUBLISH_BALLOTS_TO_AUDIT_EVENT",
        IndicateFullHandCountContest = "INDICATE_FULL_HAND_COUNT_CONTEST_EVENT",
        PublishAuditReport = "PUBLISH_AUDIT_REPORT_EVENT",
    }
}

/// The state authority's transition table.
pub fn table() -> Result<TransitionTable<DosState, DosEvent>, BuildError> {
    use DosEvent::*;
    use DosState::*;

    TransitionTableBuilder::new()
        .initial(Initial)
        .edge(Initial, AuthenticateStateAdministrator, Authenticated)
        .edge(Authenticated, AuthenticateStateAdministrator, Authenticated)
        .edge(Authenticated, EstablishRiskLimit, RiskLimitsSet)
        .edge(RiskLimitsSet, EstablishRiskLimit, RiskLimitsSet)
        .edge(RiskLimitsSet, SelectContestsForComparisonAudit, ContestsToAuditIdentified)
        .edge(
            ContestsToAuditIdentified,
            SelectContestsForComparisonAudit,
            ContestsToAuditIdentified,
        )
        .edge(ContestsToAuditIdentified, PublicSeed, RandomSeedPublished)
        .edge(RandomSeedPublished, PublishBallotsToAudit, AuditOngoing)
        .edge(AuditOngoing, IndicateFullHandCountContest, AuditOngoing)
        .edge(AuditOngoing, PublishAuditReport, AuditResultsPublished)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::TransitionResult;

    #[test]
    fn audit_setup_follows_fixed_order() {
        let table = table().unwrap();
        let mut state = DosState::INITIAL;
        for event in [
            DosEvent::AuthenticateStateAdministrator,
            DosEvent::EstablishRiskLimit,
            DosEvent::SelectContestsForComparisonAudit,
            DosEvent::PublicSeed,
            DosEvent::PublishBallotsToAudit,
            DosEvent::PublishAuditReport,
        ] {
            state = table.apply(&state, &event).state().unwrap();
        }
        assert_eq!(state, DosState::AuditResultsPublished);
    }

    #[test]
    fn seed_cannot_precede_contest_selection() {
        let table = table().unwrap();
        assert_eq!(
            table.apply(&DosState::RiskLimitsSet, &DosEvent::PublicSeed),
            TransitionResult::Rejected {
                from: DosState::RiskLimitsSet,
                event: DosEvent::PublicSeed,
            }
        );
    }

    #[test]
    fn published_results_are_terminal() {
        let table = table().unwrap();
        assert!(table.events_from(&DosState::AuditResultsPublished).is_empty());
    }
}
