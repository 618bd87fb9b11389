//! The dispatch guard: the only path by which an endpoint moves a machine.
//!
//! A request names the machine, the endpoint handling it and the event the
//! endpoint wants to raise. The guard checks the request against the
//! event–endpoint relation, applies the event to the stored state and
//! saves the result, retrying on concurrent updates. It never chooses
//! between candidate events; the endpoint decides which event to raise.

pub mod error;

pub use error::DispatchError;

use crate::asm::{Asm, AsmEvent, Endpoint, TransitionResult};
use crate::config::DispatchConfig;
use crate::core::{Event, State, StateTransition};
use crate::store::{MachineInstance, MachineKey, MachineStore, TransitionEffect};
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One attempt to raise `event` on the machine named by `key`.
#[derive(Clone)]
pub struct DispatchRequest {
    pub key: MachineKey,
    pub endpoint: Endpoint,
    pub event: AsmEvent,
    /// Committed together with the transition, or not at all.
    pub effect: Option<Arc<dyn TransitionEffect>>,
}

impl DispatchRequest {
    pub fn new(key: MachineKey, endpoint: Endpoint, event: impl Into<AsmEvent>) -> Self {
        Self {
            key,
            endpoint,
            event: event.into(),
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: Arc<dyn TransitionEffect>) -> Self {
        self.effect = Some(effect);
        self
    }
}

impl fmt::Debug for DispatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRequest")
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("event", &self.event)
            .field("effect", &self.effect.is_some())
            .finish()
    }
}

/// Applies events to stored machines on behalf of endpoints.
#[derive(Clone)]
pub struct DispatchGuard {
    asm: Arc<Asm>,
    store: Arc<dyn MachineStore>,
    config: DispatchConfig,
}

impl DispatchGuard {
    pub fn new(asm: Arc<Asm>, store: Arc<dyn MachineStore>, config: DispatchConfig) -> Self {
        Self { asm, store, config }
    }

    pub fn asm(&self) -> &Asm {
        &self.asm
    }

    pub fn store(&self) -> &Arc<dyn MachineStore> {
        &self.store
    }

    /// Checks that need no stored state.
    pub fn check(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        if request.endpoint.is_placeholder() {
            return Err(DispatchError::UnwiredEndpoint {
                endpoint: request.endpoint,
            });
        }
        if request.event.actor_kind() != request.key.kind() {
            return Err(DispatchError::WrongActorKind {
                kind: request.key.kind(),
                event: request.event,
            });
        }
        if !self.asm.relation().contains(&request.event, request.endpoint) {
            return Err(DispatchError::EventNotAssociated {
                event: request.event,
                endpoint: request.endpoint,
            });
        }
        Ok(())
    }

    /// Apply the request's event and persist the result.
    ///
    /// Returns the instance at its new state and version. The unit of work
    /// runs on its own task: dropping the returned future does not stop a
    /// transition that has already begun, so it is applied in full or not
    /// at all.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<MachineInstance, DispatchError> {
        self.check(&request)?;

        let guard = self.clone();
        tokio::spawn(async move { guard.commit_with_retries(&request).await })
            .await
            .map_err(|e| DispatchError::TaskFailed(e.to_string()))?
    }

    async fn commit_with_retries(
        &self,
        request: &DispatchRequest,
    ) -> Result<MachineInstance, DispatchError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.config.retry_backoff_ms))
            .with_max_delay(Duration::from_millis(self.config.max_backoff_ms))
            .with_max_times(self.config.max_conflict_retries as usize);

        (|| async { self.attempt(request).await })
            .retry(backoff)
            .when(DispatchError::is_retryable)
            .notify(|err: &DispatchError, delay: Duration| {
                tracing::warn!(
                    key = %request.key,
                    event = request.event.name(),
                    error = %err,
                    delay = ?delay,
                    "dispatch attempt failed, retrying"
                );
            })
            .await
    }

    async fn attempt(&self, request: &DispatchRequest) -> Result<MachineInstance, DispatchError> {
        let instance = self.store.get(&request.key).await?;
        let from = instance.state();

        let to = match self.asm.apply(request.key.kind(), from, request.event) {
            TransitionResult::Success(to) => to,
            TransitionResult::Rejected { from, event } => {
                tracing::debug!(
                    key = %request.key,
                    endpoint = %request.endpoint,
                    event = event.name(),
                    state = from.name(),
                    "event rejected"
                );
                return Err(DispatchError::IllegalTransition { state: from, event });
            }
        };

        let next = instance.with_transition(StateTransition {
            event: request.event,
            from,
            to,
            timestamp: Utc::now(),
        });
        let committed = self.store.save(&next, request.effect.as_deref()).await?;

        tracing::info!(
            kind = %request.key.kind(),
            identity = request.key.identity(),
            endpoint = %request.endpoint,
            event = request.event.name(),
            from = from.name(),
            to = to.name(),
            version = committed.version(),
            "transition accepted"
        );
        Ok(committed)
    }
}
