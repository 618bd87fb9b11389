//! Abstract state machines of the audit workflow.
//!
//! Three actor kinds each own a closed vocabulary and a transition table:
//! the state authority ([`dos`]), county authorities ([`county`]) and
//! county audit boards ([`audit_board`]). [`AsmState`] and [`AsmEvent`]
//! erase the kind so instances of all three can share one store and one
//! dispatch path; [`Asm`] holds the tables and the event–endpoint relation
//! built once at startup.

pub mod audit_board;
pub mod county;
pub mod dos;
pub mod relation;
mod table;

pub use audit_board::{AuditBoardEvent, AuditBoardState};
pub use county::{CountyEvent, CountyState};
pub use dos::{DosEvent, DosState};
pub use relation::{Endpoint, EventEndpointRelation};
pub use table::{TransitionResult, TransitionTable};

use crate::core::{Event, State};
use crate::validation::{self, DefinitionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three roles of the audit protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum ActorKind {
    #[serde(rename = "DOS")]
    StateAuthority,
    #[serde(rename = "COUNTY")]
    CountyAuthority,
    #[serde(rename = "AUDIT_BOARD")]
    AuditBoard,
}

impl ActorKind {
    pub const ALL: &'static [ActorKind] = &[
        ActorKind::StateAuthority,
        ActorKind::CountyAuthority,
        ActorKind::AuditBoard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::StateAuthority => "DOS",
            Self::CountyAuthority => "COUNTY",
            Self::AuditBoard => "AUDIT_BOARD",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A state of any actor kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum AsmState {
    Dos(DosState),
    County(CountyState),
    AuditBoard(AuditBoardState),
}

impl AsmState {
    pub fn actor_kind(&self) -> ActorKind {
        match self {
            Self::Dos(_) => ActorKind::StateAuthority,
            Self::County(_) => ActorKind::CountyAuthority,
            Self::AuditBoard(_) => ActorKind::AuditBoard,
        }
    }

    /// The initial state of `kind`.
    pub fn initial(kind: ActorKind) -> Self {
        match kind {
            ActorKind::StateAuthority => Self::Dos(DosState::INITIAL),
            ActorKind::CountyAuthority => Self::County(CountyState::INITIAL),
            ActorKind::AuditBoard => Self::AuditBoard(AuditBoardState::INITIAL),
        }
    }

    /// Look up a state of `kind` by its persisted name.
    pub fn from_name(kind: ActorKind, name: &str) -> Option<Self> {
        match kind {
            ActorKind::StateAuthority => DosState::from_name(name).map(Self::Dos),
            ActorKind::CountyAuthority => CountyState::from_name(name).map(Self::County),
            ActorKind::AuditBoard => AuditBoardState::from_name(name).map(Self::AuditBoard),
        }
    }
}

impl State for AsmState {
    fn name(&self) -> &'static str {
        match self {
            Self::Dos(state) => state.name(),
            Self::County(state) => state.name(),
            Self::AuditBoard(state) => state.name(),
        }
    }

    fn is_final(&self) -> bool {
        match self {
            Self::Dos(state) => state.is_final(),
            Self::County(state) => state.is_final(),
            Self::AuditBoard(state) => state.is_final(),
        }
    }
}

impl fmt::Display for AsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_kind(), self.name())
    }
}

impl From<DosState> for AsmState {
    fn from(state: DosState) -> Self {
        Self::Dos(state)
    }
}

impl From<CountyState> for AsmState {
    fn from(state: CountyState) -> Self {
        Self::County(state)
    }
}

impl From<AuditBoardState> for AsmState {
    fn from(state: AuditBoardState) -> Self {
        Self::AuditBoard(state)
    }
}

/// An event of any actor kind. Equality is by (actor kind, name).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum AsmEvent {
    Dos(DosEvent),
    County(CountyEvent),
    AuditBoard(AuditBoardEvent),
}

impl AsmEvent {
    pub fn actor_kind(&self) -> ActorKind {
        match self {
            Self::Dos(_) => ActorKind::StateAuthority,
            Self::County(_) => ActorKind::CountyAuthority,
            Self::AuditBoard(_) => ActorKind::AuditBoard,
        }
    }

    pub fn from_name(kind: ActorKind, name: &str) -> Option<Self> {
        match kind {
            ActorKind::StateAuthority => DosEvent::from_name(name).map(Self::Dos),
            ActorKind::CountyAuthority => CountyEvent::from_name(name).map(Self::County),
            ActorKind::AuditBoard => AuditBoardEvent::from_name(name).map(Self::AuditBoard),
        }
    }

    /// Every event of every actor kind.
    pub fn all() -> impl Iterator<Item = AsmEvent> {
        DosEvent::ALL
            .iter()
            .map(|e| Self::Dos(*e))
            .chain(CountyEvent::ALL.iter().map(|e| Self::County(*e)))
            .chain(AuditBoardEvent::ALL.iter().map(|e| Self::AuditBoard(*e)))
    }
}

impl Event for AsmEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Dos(event) => event.name(),
            Self::County(event) => event.name(),
            Self::AuditBoard(event) => event.name(),
        }
    }
}

impl fmt::Display for AsmEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_kind(), self.name())
    }
}

impl From<DosEvent> for AsmEvent {
    fn from(event: DosEvent) -> Self {
        Self::Dos(event)
    }
}

impl From<CountyEvent> for AsmEvent {
    fn from(event: CountyEvent) -> Self {
        Self::County(event)
    }
}

impl From<AuditBoardEvent> for AsmEvent {
    fn from(event: AuditBoardEvent) -> Self {
        Self::AuditBoard(event)
    }
}

/// The validated workflow definition: every transition table plus the
/// event–endpoint relation. Immutable once built; share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Asm {
    dos: TransitionTable<DosState, DosEvent>,
    county: TransitionTable<CountyState, CountyEvent>,
    audit_board: TransitionTable<AuditBoardState, AuditBoardEvent>,
    relation: EventEndpointRelation,
}

impl Asm {
    /// Build and validate the standard audit workflow.
    pub fn new() -> Result<Self, DefinitionError> {
        Self::with_relation(EventEndpointRelation::standard())
    }

    /// Build the standard tables with a custom relation, validating both.
    pub fn with_relation(relation: EventEndpointRelation) -> Result<Self, DefinitionError> {
        let asm = Self {
            dos: dos::table()?,
            county: county::table()?,
            audit_board: audit_board::table()?,
            relation,
        };

        validation::validate(&asm)?;

        for event in asm.relation.placeholder_only_events() {
            tracing::warn!(
                kind = %event.actor_kind(),
                event = event.name(),
                "event is wired only to the UNIMPLEMENTED placeholder and cannot be dispatched"
            );
        }

        tracing::debug!(
            dos_edges = asm.dos.len(),
            county_edges = asm.county.len(),
            audit_board_edges = asm.audit_board.len(),
            relation_pairs = asm.relation.len(),
            "workflow definition validated"
        );
        Ok(asm)
    }

    pub fn dos(&self) -> &TransitionTable<DosState, DosEvent> {
        &self.dos
    }

    pub fn county(&self) -> &TransitionTable<CountyState, CountyEvent> {
        &self.county
    }

    pub fn audit_board(&self) -> &TransitionTable<AuditBoardState, AuditBoardEvent> {
        &self.audit_board
    }

    pub fn relation(&self) -> &EventEndpointRelation {
        &self.relation
    }

    pub fn initial_state(&self, kind: ActorKind) -> AsmState {
        match kind {
            ActorKind::StateAuthority => AsmState::Dos(*self.dos.initial()),
            ActorKind::CountyAuthority => AsmState::County(*self.county.initial()),
            ActorKind::AuditBoard => AsmState::AuditBoard(*self.audit_board.initial()),
        }
    }

    /// Apply `event` to `current` on the machine of `kind` (pure).
    ///
    /// A state or event belonging to another actor kind is rejected like
    /// any other missing edge.
    pub fn apply(
        &self,
        kind: ActorKind,
        current: AsmState,
        event: AsmEvent,
    ) -> TransitionResult<AsmState, AsmEvent> {
        let next = match (kind, current, event) {
            (ActorKind::StateAuthority, AsmState::Dos(s), AsmEvent::Dos(e)) => {
                self.dos.target(&s, &e).map(|to| AsmState::Dos(*to))
            }
            (ActorKind::CountyAuthority, AsmState::County(s), AsmEvent::County(e)) => {
                self.county.target(&s, &e).map(|to| AsmState::County(*to))
            }
            (ActorKind::AuditBoard, AsmState::AuditBoard(s), AsmEvent::AuditBoard(e)) => {
                self.audit_board.target(&s, &e).map(|to| AsmState::AuditBoard(*to))
            }
            _ => None,
        };

        match next {
            Some(state) => TransitionResult::Success(state),
            None => TransitionResult::Rejected {
                from: current,
                event,
            },
        }
    }

    /// Events legal in `state`, sorted by name.
    pub fn legal_events(&self, state: AsmState) -> Vec<AsmEvent> {
        match state {
            AsmState::Dos(s) => self.dos.events_from(&s).into_iter().map(AsmEvent::Dos).collect(),
            AsmState::County(s) => self
                .county
                .events_from(&s)
                .into_iter()
                .map(AsmEvent::County)
                .collect(),
            AsmState::AuditBoard(s) => self
                .audit_board
                .events_from(&s)
                .into_iter()
                .map(AsmEvent::AuditBoard)
                .collect(),
        }
    }
}
