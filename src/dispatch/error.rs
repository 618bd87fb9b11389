//! Dispatch error types.

use crate::asm::{ActorKind, AsmEvent, AsmState, Endpoint};
use crate::store::{EffectError, StoreError};
use thiserror::Error;

/// Why an event was not applied.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The endpoint is the placeholder for events with no operation yet.
    #[error("endpoint {endpoint} is not wired to a dispatchable operation")]
    UnwiredEndpoint { endpoint: Endpoint },

    #[error("event {event} cannot be applied to a {kind} machine")]
    WrongActorKind { kind: ActorKind, event: AsmEvent },

    #[error("event {event} is not associated with operation {endpoint}")]
    EventNotAssociated { event: AsmEvent, endpoint: Endpoint },

    #[error("event {event} is illegal in state {state}")]
    IllegalTransition { state: AsmState, event: AsmEvent },

    /// Another writer kept winning; retries are exhausted.
    #[error("concurrent update of {key}; retries exhausted")]
    Conflict { key: String },

    #[error(transparent)]
    Storage(StoreError),

    #[error("side effect failed: {0}")]
    Effect(EffectError),

    /// The task running the unit of work panicked or was aborted.
    #[error("dispatch task failed: {0}")]
    TaskFailed(String),
}

impl DispatchError {
    /// The caller asked for something the workflow does not allow.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnwiredEndpoint { .. }
                | Self::WrongActorKind { .. }
                | Self::EventNotAssociated { .. }
                | Self::IllegalTransition { .. }
        )
    }

    /// Worth another attempt after reloading the instance.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => Self::Conflict { key },
            StoreError::Effect(err) => Self::Effect(err),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{CountyEvent, CountyState};

    #[test]
    fn classification() {
        let illegal = DispatchError::IllegalTransition {
            state: CountyState::Initial.into(),
            event: CountyEvent::StartAudit.into(),
        };
        assert!(illegal.is_protocol_violation());
        assert!(!illegal.is_retryable());

        let conflict = DispatchError::from(StoreError::Conflict {
            key: "COUNTY/adams".to_string(),
            expected: 3,
            actual: 4,
        });
        assert!(matches!(conflict, DispatchError::Conflict { .. }));
        assert!(conflict.is_retryable());
        assert!(!conflict.is_protocol_violation());

        let corrupt = DispatchError::from(StoreError::InvalidKey("bad".to_string()));
        assert!(!corrupt.is_retryable());

        let effect = DispatchError::from(StoreError::Effect(EffectError::new("disk full")));
        assert!(matches!(effect, DispatchError::Effect(_)));
    }

    #[test]
    fn illegal_transition_message_names_state_and_event() {
        let err = DispatchError::IllegalTransition {
            state: CountyState::Initial.into(),
            event: CountyEvent::StartAudit.into(),
        };
        assert_eq!(
            err.to_string(),
            "event COUNTY/START_AUDIT_EVENT is illegal in state COUNTY/COUNTY_INITIAL_STATE"
        );
    }
}
