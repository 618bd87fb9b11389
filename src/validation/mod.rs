//! Startup validation of the workflow definition.
//!
//! Uses Stillwater's `Validation` type to accumulate every violation in
//! the transition tables and the event–endpoint relation, so a broken
//! definition is reported in full the first time the process starts.
//!
//! # Example
//!
//! ```rust
//! use auditflow::asm::{Asm, EventEndpointRelation};
//! use auditflow::validation::DefinitionError;
//!
//! let err = Asm::with_relation(EventEndpointRelation::new()).unwrap_err();
//! match err {
//!     DefinitionError::Invalid(violations) => assert!(!violations.is_empty()),
//!     DefinitionError::Build(_) => unreachable!(),
//! }
//! ```

pub mod rules;
pub mod violations;

pub use violations::ConfigViolation;

use crate::asm::{
    ActorKind, Asm, AuditBoardEvent, AuditBoardState, CountyEvent, CountyState, DosEvent,
    DosState,
};
use crate::builder::BuildError;
use stillwater::validation::Validation;
use thiserror::Error;

/// The workflow definition cannot be used.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("transition table failed to build: {0}")]
    Build(#[from] BuildError),

    #[error("invalid workflow definition ({} violations): {}", .0.len(), join(.0))]
    Invalid(Vec<ConfigViolation>),
}

fn join(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate every table and the relation of `asm`.
pub fn validate(asm: &Asm) -> Result<(), DefinitionError> {
    let mut checks = Vec::new();
    checks.extend(rules::table_checks(
        ActorKind::StateAuthority,
        asm.dos(),
        DosState::ALL,
        DosEvent::ALL,
    ));
    checks.extend(rules::table_checks(
        ActorKind::CountyAuthority,
        asm.county(),
        CountyState::ALL,
        CountyEvent::ALL,
    ));
    checks.extend(rules::table_checks(
        ActorKind::AuditBoard,
        asm.audit_board(),
        AuditBoardState::ALL,
        AuditBoardEvent::ALL,
    ));
    checks.extend(rules::relation_checks(asm.relation()));

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => {
            let violations: Vec<ConfigViolation> = errors.iter().cloned().collect();
            for violation in &violations {
                tracing::error!(%violation, "workflow definition violation");
            }
            Err(DefinitionError::Invalid(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{AsmEvent, EventEndpointRelation};

    #[test]
    fn empty_relation_is_rejected_with_every_violation() {
        let err = Asm::with_relation(EventEndpointRelation::new()).unwrap_err();
        match err {
            DefinitionError::Invalid(violations) => {
                let unwired = violations
                    .iter()
                    .filter(|v| matches!(v, ConfigViolation::UnwiredEvent { .. }))
                    .count();
                assert_eq!(unwired, AsmEvent::all().count());
                assert!(violations
                    .iter()
                    .any(|v| matches!(v, ConfigViolation::IdleEndpoint { .. })));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn error_message_lists_violations() {
        let err = DefinitionError::Invalid(vec![ConfigViolation::IdleEndpoint {
            endpoint: "AuditBoardSignOut",
        }]);
        assert_eq!(
            err.to_string(),
            "invalid workflow definition (1 violations): endpoint AuditBoardSignOut raises no event"
        );
    }
}
