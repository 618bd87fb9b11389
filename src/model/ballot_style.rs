//! Ballot styles: which contests appear on a ballot.
//!
//! Styles are interned. Asking for an (identifier, contest list) pair that
//! already exists returns the existing style with its original id.

use crate::projection::ContestId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Hands out increasing ids. Shared by every registry that must not reuse
/// ids, and seeded from storage on restart.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to `next_id` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BallotStyle {
    id: u64,
    identifier: String,
    contests: Vec<ContestId>,
}

impl BallotStyle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn contests(&self) -> &[ContestId] {
        &self.contests
    }
}

#[derive(Debug, Default)]
struct Styles {
    by_content: HashMap<(String, Vec<ContestId>), u64>,
    by_id: BTreeMap<u64, Arc<BallotStyle>>,
}

#[derive(Debug)]
pub struct BallotStyleRegistry {
    ids: Arc<IdSequence>,
    styles: RwLock<Styles>,
}

impl Default for BallotStyleRegistry {
    fn default() -> Self {
        Self::new(Arc::new(IdSequence::new()))
    }
}

impl BallotStyleRegistry {
    pub fn new(ids: Arc<IdSequence>) -> Self {
        Self {
            ids,
            styles: RwLock::new(Styles::default()),
        }
    }

    /// The style for `(identifier, contests)`, created if it is new.
    pub fn intern(&self, identifier: impl Into<String>, contests: Vec<ContestId>) -> Arc<BallotStyle> {
        let content = (identifier.into(), contests);
        let mut styles = self.styles.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(style) = styles
            .by_content
            .get(&content)
            .and_then(|id| styles.by_id.get(id))
        {
            return Arc::clone(style);
        }

        let id = self.ids.next_id();
        let style = Arc::new(BallotStyle {
            id,
            identifier: content.0.clone(),
            contests: content.1.clone(),
        });
        styles.by_content.insert(content, id);
        styles.by_id.insert(id, Arc::clone(&style));
        tracing::debug!(id, identifier = %style.identifier, "ballot style registered");
        style
    }

    pub fn by_id(&self, id: u64) -> Option<Arc<BallotStyle>> {
        let styles = self.styles.read().unwrap_or_else(PoisonError::into_inner);
        styles.by_id.get(&id).cloned()
    }

    /// Styles with `identifier`. Malformed input can register more than
    /// one contest list under the same identifier.
    pub fn matching(&self, identifier: &str) -> Vec<Arc<BallotStyle>> {
        let styles = self.styles.read().unwrap_or_else(PoisonError::into_inner);
        styles
            .by_id
            .values()
            .filter(|style| style.identifier == identifier)
            .cloned()
            .collect()
    }

    /// Every style, in id order.
    pub fn all(&self) -> Vec<Arc<BallotStyle>> {
        let styles = self.styles.read().unwrap_or_else(PoisonError::into_inner);
        styles.by_id.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.styles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
