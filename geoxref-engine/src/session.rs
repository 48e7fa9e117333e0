//! Scoped store transaction.

use crate::error::Result;
use geoxref_store::FeatureStore;

/// Transaction guard: rolls back on drop unless [`commit`](Self::commit)
/// succeeded.
///
/// Every early return, including a failed commit, ends in exactly one
/// rollback attempt.
///
/// Declare cursors *after* the session so they are dropped (released)
/// before the rollback runs.
pub struct EditSession<'s, S: FeatureStore + ?Sized> {
    store: &'s S,
    open: bool,
}

impl<'s, S: FeatureStore + ?Sized> EditSession<'s, S> {
    /// Begin a transaction. Fails if the store already has one active.
    pub fn begin(store: &'s S) -> Result<Self> {
        store.begin_transaction()?;
        Ok(Self { store, open: true })
    }

    /// Commit the transaction. If the store refuses the commit, the guard
    /// stays open and its drop rolls every write back.
    pub fn commit(mut self) -> Result<()> {
        self.store.commit_transaction()?;
        self.open = false;
        Ok(())
    }
}

impl<S: FeatureStore + ?Sized> Drop for EditSession<'_, S> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        tracing::warn!("edit session dropped without commit, rolling back");
        if let Err(err) = self.store.rollback_transaction() {
            tracing::error!(error = %err, "rollback failed");
        }
    }
}
