//! In-memory dedup of gateway message ids.
//!
//! The gateway keeps delivered messages in its inbox until they are deleted,
//! so every poll re-reads the same rows. The datastore upserts by external id,
//! which makes re-pushing harmless but wasteful; this set lets a cycle skip
//! ids it has already pushed successfully. State is process-local and lost on
//! restart, which is fine: a restart just re-pushes and the upsert absorbs it.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, external_id: &str) -> bool {
        self.ids.contains(external_id)
    }

    /// Record an id after a confirmed datastore write. Returns false if it
    /// was already present.
    pub fn record(&mut self, external_id: &str) -> bool {
        self.ids.insert(external_id.to_owned())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
