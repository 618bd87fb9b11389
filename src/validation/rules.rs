//! Structural rules for transition tables and the event–endpoint relation.
//!
//! Each rule yields one `Validation` per subject so that every violation
//! is reported, not only the first.

use crate::asm::{ActorKind, AsmEvent, Endpoint, EventEndpointRelation, TransitionTable};
use crate::core::{Event, State};
use crate::validation::violations::ConfigViolation;
use std::collections::{HashSet, VecDeque};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Result of a single rule check.
pub type Check = Validation<(), NonEmptyVec<ConfigViolation>>;

fn require(ok: bool, violation: impl FnOnce() -> ConfigViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// States reachable from the table's initial state.
pub fn reachable_states<S: State, E: Event>(table: &TransitionTable<S, E>) -> HashSet<S> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([table.initial().clone()]);

    while let Some(state) = queue.pop_front() {
        if !seen.insert(state.clone()) {
            continue;
        }
        for (from, _, to) in table.edges() {
            if *from == state && !seen.contains(to) {
                queue.push_back(to.clone());
            }
        }
    }
    seen
}

/// Check one actor kind's table against its full vocabulary.
pub fn table_checks<S: State, E: Event>(
    kind: ActorKind,
    table: &TransitionTable<S, E>,
    states: &[S],
    events: &[E],
) -> Vec<Check> {
    let mut checks = Vec::new();

    for event in events {
        checks.push(require(
            table.edges().any(|(_, e, _)| e == event),
            || ConfigViolation::EventNotInTable {
                kind,
                event: event.name(),
            },
        ));
    }

    let reachable = reachable_states(table);
    for state in states {
        checks.push(require(reachable.contains(state), || {
            ConfigViolation::UnreachableState {
                kind,
                state: state.name(),
                initial: table.initial().name(),
            }
        }));

        let exits: Vec<(&E, &S)> = table
            .edges()
            .filter(|(from, _, _)| *from == state)
            .map(|(_, event, to)| (event, to))
            .collect();

        if state.is_final() {
            for (event, to) in exits.iter().filter(|(_, to)| *to != state) {
                checks.push(Validation::fail(ConfigViolation::TerminalExit {
                    kind,
                    state: state.name(),
                    event: event.name(),
                    to: to.name(),
                }));
            }
        } else {
            checks.push(require(exits.iter().any(|(_, to)| *to != state), || {
                ConfigViolation::DeadEnd {
                    kind,
                    state: state.name(),
                }
            }));
        }
    }

    checks
}

/// Check that the relation covers every event and every concrete endpoint.
pub fn relation_checks(relation: &EventEndpointRelation) -> Vec<Check> {
    let mut checks = Vec::new();

    for event in AsmEvent::all() {
        checks.push(require(!relation.endpoints_for(&event).is_empty(), || {
            ConfigViolation::UnwiredEvent {
                kind: event.actor_kind(),
                event: event.name(),
            }
        }));
    }

    for endpoint in Endpoint::ALL.iter().filter(|ep| !ep.is_placeholder()) {
        checks.push(require(!relation.events_for(*endpoint).is_empty(), || {
            ConfigViolation::IdleEndpoint {
                endpoint: endpoint.name(),
            }
        }));
    }

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::CountyEvent;
    use crate::builder::TransitionTableBuilder;

    crate::state_enum! {
        enum ToyState {
            Start = "START",
            Middle = "MIDDLE",
            Stuck = "STUCK",
            Orphan = "ORPHAN",
            Done = "DONE",
        }
        initial: Start
        final: [Done]
    }

    crate::event_enum! {
        enum ToyEvent {
            Go = "GO",
            Jam = "JAM",
            Reopen = "REOPEN",
            Unused = "UNUSED",
        }
    }

    fn failures(checks: Vec<Check>) -> Vec<ConfigViolation> {
        match Validation::all_vec(checks).map(|_| ()) {
            Validation::Success(_) => Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        }
    }

    #[test]
    fn table_checks_accumulate_all_violations() {
        let table = TransitionTableBuilder::new()
            .initial(ToyState::Start)
            .edge(ToyState::Start, ToyEvent::Go, ToyState::Middle)
            .edge(ToyState::Middle, ToyEvent::Jam, ToyState::Stuck)
            .edge(ToyState::Middle, ToyEvent::Go, ToyState::Done)
            .edge(ToyState::Done, ToyEvent::Reopen, ToyState::Middle)
            .build()
            .unwrap();

        let violations = failures(table_checks(
            ActorKind::CountyAuthority,
            &table,
            ToyState::ALL,
            ToyEvent::ALL,
        ));

        assert_eq!(violations.len(), 4);
        assert!(violations.contains(&ConfigViolation::EventNotInTable {
            kind: ActorKind::CountyAuthority,
            event: "UNUSED",
        }));
        assert!(violations.contains(&ConfigViolation::DeadEnd {
            kind: ActorKind::CountyAuthority,
            state: "STUCK",
        }));
        assert!(violations.contains(&ConfigViolation::UnreachableState {
            kind: ActorKind::CountyAuthority,
            state: "ORPHAN",
            initial: "START",
        }));
        assert!(violations.contains(&ConfigViolation::TerminalExit {
            kind: ActorKind::CountyAuthority,
            state: "DONE",
            event: "REOPEN",
            to: "MIDDLE",
        }));
    }

    #[test]
    fn reachability_follows_edges() {
        let table = TransitionTableBuilder::new()
            .initial(ToyState::Start)
            .edge(ToyState::Start, ToyEvent::Go, ToyState::Middle)
            .build()
            .unwrap();

        let reachable = reachable_states(&table);
        assert_eq!(reachable, HashSet::from([ToyState::Start, ToyState::Middle]));
    }

    #[test]
    fn standard_relation_passes() {
        let violations = failures(relation_checks(&EventEndpointRelation::standard()));
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn relation_checks_report_unwired_events_and_idle_endpoints() {
        let mut relation = EventEndpointRelation::new();
        relation.insert(CountyEvent::UploadBallotManifest, Endpoint::BallotManifestUpload);

        let violations = failures(relation_checks(&relation));

        assert!(violations.contains(&ConfigViolation::UnwiredEvent {
            kind: ActorKind::CountyAuthority,
            event: "UPLOAD_CVRS_EVENT",
        }));
        assert!(violations.contains(&ConfigViolation::IdleEndpoint {
            endpoint: "CVRExportUpload",
        }));
        assert!(!violations.contains(&ConfigViolation::IdleEndpoint {
            endpoint: "BallotManifestUpload",
        }));
        assert!(!violations.contains(&ConfigViolation::IdleEndpoint {
            endpoint: "UNIMPLEMENTED",
        }));
    }
}
