//! Property-based tests for the workflow definition.
//!
//! These tests use proptest to check the transition function and the
//! event–endpoint relation over arbitrary states, events and walks.

use auditflow::asm::{
    ActorKind, Asm, AsmEvent, AsmState, AuditBoardState, CountyState, DosState, Endpoint,
    TransitionResult,
};
use auditflow::config::DispatchConfig;
use auditflow::core::{State, StateHistory, StateTransition};
use auditflow::store::{InMemoryMachineStore, MachineInstance, MachineKey, MachineStore};
use auditflow::{DispatchError, DispatchGuard, DispatchRequest};
use chrono::Utc;
use proptest::prelude::*;
use std::sync::Arc;

fn all_states() -> Vec<AsmState> {
    DosState::ALL
        .iter()
        .map(|s| AsmState::Dos(*s))
        .chain(CountyState::ALL.iter().map(|s| AsmState::County(*s)))
        .chain(AuditBoardState::ALL.iter().map(|s| AsmState::AuditBoard(*s)))
        .collect()
}

fn arbitrary_state() -> impl Strategy<Value = AsmState> {
    prop::sample::select(all_states())
}

fn arbitrary_event() -> impl Strategy<Value = AsmEvent> {
    prop::sample::select(AsmEvent::all().collect::<Vec<_>>())
}

fn arbitrary_endpoint() -> impl Strategy<Value = Endpoint> {
    prop::sample::select(Endpoint::ALL.to_vec())
}

fn arbitrary_kind() -> impl Strategy<Value = ActorKind> {
    prop::sample::select(ActorKind::ALL.to_vec())
}

/// An actor kind, a history of its events and one more event to dispatch.
fn kind_with_events() -> impl Strategy<Value = (ActorKind, Vec<AsmEvent>, AsmEvent)> {
    arbitrary_kind().prop_flat_map(|kind| {
        let events: Vec<AsmEvent> = AsmEvent::all().filter(|e| e.actor_kind() == kind).collect();
        (
            Just(kind),
            prop::collection::vec(prop::sample::select(events.clone()), 0..20),
            prop::sample::select(events),
        )
    })
}

fn key_for(kind: ActorKind) -> MachineKey {
    match kind {
        ActorKind::StateAuthority => MachineKey::dos(),
        ActorKind::CountyAuthority => MachineKey::county("eagle").unwrap(),
        ActorKind::AuditBoard => MachineKey::audit_board("eagle").unwrap(),
    }
}

/// Feed `events` to a fresh machine of `kind`, keeping only accepted ones.
fn walk(asm: &Asm, kind: ActorKind, events: &[AsmEvent]) -> StateHistory<AsmState, AsmEvent> {
    let mut state = asm.initial_state(kind);
    let mut history = StateHistory::new();
    for event in events {
        if let TransitionResult::Success(to) = asm.apply(kind, state, *event) {
            history = history.record(StateTransition {
                event: *event,
                from: state,
                to,
                timestamp: Utc::now(),
            });
            state = to;
        }
    }
    history
}

proptest! {
    #[test]
    fn apply_is_deterministic(state in arbitrary_state(), event in arbitrary_event()) {
        let asm = Asm::new().unwrap();
        let kind = state.actor_kind();
        prop_assert_eq!(asm.apply(kind, state, event), asm.apply(kind, state, event));
    }

    #[test]
    fn rejection_reports_the_unchanged_state(
        state in arbitrary_state(),
        event in arbitrary_event(),
    ) {
        let asm = Asm::new().unwrap();
        if let TransitionResult::Rejected { from, event: rejected } =
            asm.apply(state.actor_kind(), state, event)
        {
            prop_assert_eq!(from, state);
            prop_assert_eq!(rejected, event);
        }
    }

    #[test]
    fn accepted_iff_listed_as_legal(state in arbitrary_state(), event in arbitrary_event()) {
        let asm = Asm::new().unwrap();
        let accepted = asm.apply(state.actor_kind(), state, event).is_success();
        prop_assert_eq!(accepted, asm.legal_events(state).contains(&event));
    }

    #[test]
    fn results_stay_within_the_actor_kind(
        state in arbitrary_state(),
        event in arbitrary_event(),
    ) {
        let asm = Asm::new().unwrap();
        let kind = state.actor_kind();
        if let Some(to) = asm.apply(kind, state, event).state() {
            prop_assert_eq!(to.actor_kind(), kind);
            prop_assert_eq!(event.actor_kind(), kind);
        }
    }

    #[test]
    fn foreign_kind_is_always_rejected(
        kind in arbitrary_kind(),
        state in arbitrary_state(),
        event in arbitrary_event(),
    ) {
        prop_assume!(state.actor_kind() != kind || event.actor_kind() != kind);
        let asm = Asm::new().unwrap();
        prop_assert!(!asm.apply(kind, state, event).is_success());
    }

    #[test]
    fn relation_indexes_agree(event in arbitrary_event(), endpoint in arbitrary_endpoint()) {
        let relation = Asm::new().unwrap().relation().clone();
        let contained = relation.contains(&event, endpoint);
        prop_assert_eq!(contained, relation.endpoints_for(&event).contains(&endpoint));
        prop_assert_eq!(contained, relation.events_for(endpoint).contains(&event));
    }

    #[test]
    fn every_event_has_an_endpoint(event in arbitrary_event()) {
        let asm = Asm::new().unwrap();
        prop_assert!(!asm.relation().endpoints_for(&event).is_empty());
    }

    #[test]
    fn walks_chain_from_the_initial_state(
        kind in arbitrary_kind(),
        events in prop::collection::vec(arbitrary_event(), 0..40),
    ) {
        let asm = Asm::new().unwrap();
        let history = walk(&asm, kind, &events);

        if let Some(first) = history.transitions().first() {
            prop_assert_eq!(first.from, asm.initial_state(kind));
        }
        for pair in history.transitions().windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
        prop_assert_eq!(history.get_path().len(), if history.is_empty() { 0 } else { history.len() + 1 });
    }

    #[test]
    fn terminal_states_are_never_left(
        kind in arbitrary_kind(),
        events in prop::collection::vec(arbitrary_event(), 0..60),
    ) {
        let asm = Asm::new().unwrap();
        let history = walk(&asm, kind, &events);

        let mut reached_terminal = None;
        for transition in history.transitions() {
            if let Some(terminal) = reached_terminal {
                prop_assert_eq!(transition.from, terminal);
                prop_assert_eq!(transition.to, terminal);
            }
            if transition.to.is_final() {
                reached_terminal = Some(transition.to);
            }
        }
    }

    #[test]
    fn stored_record_preserves_a_walk(
        events in prop::collection::vec(arbitrary_event(), 0..30),
    ) {
        let asm = Asm::new().unwrap();
        let history = walk(&asm, ActorKind::CountyAuthority, &events);

        let mut instance = MachineInstance::initial(MachineKey::county("denver").unwrap());
        for transition in history.transitions() {
            instance = instance.with_transition(transition.clone());
        }

        let restored = MachineInstance::from_record(instance.to_record()).unwrap();
        prop_assert_eq!(restored.state(), instance.state());
        prop_assert_eq!(restored.history().len(), history.len());
        prop_assert_eq!(restored.version(), instance.version());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rejected_dispatch_leaves_stored_instance_unchanged(
        (kind, history, event) in kind_with_events(),
    ) {
        let asm = Arc::new(Asm::new().unwrap());
        let endpoint = asm
            .relation()
            .endpoints_for(&event)
            .into_iter()
            .find(|endpoint| !endpoint.is_placeholder());
        prop_assume!(endpoint.is_some());
        let endpoint = endpoint.unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryMachineStore::new());
            let key = key_for(kind);
            let mut instance = store.get(&key).await.unwrap();
            for transition in walk(&asm, kind, &history).transitions() {
                instance = store
                    .save(&instance.with_transition(transition.clone()), None)
                    .await
                    .unwrap();
            }

            let accepted = asm.apply(kind, instance.state(), event).is_success();
            let guard = DispatchGuard::new(asm.clone(), store.clone(), DispatchConfig::default());
            let before = store.load(&key).await.unwrap();
            let outcome = guard.dispatch(DispatchRequest::new(key.clone(), endpoint, event)).await;
            let after = store.load(&key).await.unwrap();

            if accepted {
                prop_assert!(outcome.is_ok());
                prop_assert_eq!(
                    after.map(|i| i.version()),
                    before.map(|i| i.version() + 1)
                );
            } else {
                let rejected = matches!(outcome, Err(DispatchError::IllegalTransition { .. }));
                prop_assert!(rejected);
                prop_assert_eq!(after, before);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}