//! Instance id → analysis context table.
//!
//! Each host instance owns at most one [`AnalysisContext`]. Entries are inserted only after a
//! context reached `Ready`, so a lookup never observes a half-built or disposed context.
//!
//! Contexts are built outside any shard lock, so a slow model load for one instance never
//! stalls instances that hash to the same shard. If two callers build the same key at once,
//! the first insert wins and the other context is disposed.

use crate::context::AnalysisContext;
use crate::error::{Error, Result};
use crate::InstanceId;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct StateTable {
    contexts: DashMap<InstanceId, AnalysisContext>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context for `key`, building it with `create` if absent.
    ///
    /// `create` runs without holding any lock. If it fails nothing is inserted and the error
    /// is returned.
    pub fn get_or_create<F>(
        &self,
        key: InstanceId,
        create: F,
    ) -> Result<RefMut<'_, InstanceId, AnalysisContext>>
    where
        F: FnOnce() -> Result<AnalysisContext>,
    {
        if let Some(existing) = self.contexts.get_mut(&key) {
            return Ok(existing);
        }

        let context = create()?;
        if let Entry::Vacant(entry) = self.contexts.entry(key) {
            return Ok(entry.insert(context));
        }

        tracing::debug!("Context for instance {} was built twice; disposing the duplicate", key);
        drop(context);
        self.contexts
            .get_mut(&key)
            .ok_or_else(|| Error::InterfaceInit(format!("context for instance {key} was removed during construction")))
    }

    pub fn get_mut(&self, key: InstanceId) -> Option<RefMut<'_, InstanceId, AnalysisContext>> {
        self.contexts.get_mut(&key)
    }

    pub fn contains(&self, key: InstanceId) -> bool {
        self.contexts.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Detaches the context for `key`. The caller disposes it.
    pub fn remove(&self, key: InstanceId) -> Option<AnalysisContext> {
        self.contexts.remove(&key).map(|(_, context)| context)
    }

    /// Removes and disposes every context. Returns how many were disposed.
    pub fn dispose_all(&self) -> usize {
        let keys: Vec<InstanceId> = self.contexts.iter().map(|entry| *entry.key()).collect();
        let mut disposed = 0;
        for key in keys {
            if let Some(mut context) = self.remove(key) {
                context.dispose();
                disposed += 1;
            }
        }
        disposed
    }
}
