use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::FetchKey;

/// Keys of fetch jobs that are queued or running.
#[derive(Clone, Default)]
pub(crate) struct PendingSet {
    keys: Arc<Mutex<HashSet<FetchKey>>>,
}

impl PendingSet {
    fn keys(&self) -> MutexGuard<'_, HashSet<FetchKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `key`. Returns `None` when a job for it is already outstanding.
    pub(crate) fn try_claim(&self, key: FetchKey) -> Option<PendingGuard> {
        if !self.keys().insert(key.clone()) {
            return None;
        }
        Some(PendingGuard {
            set: self.clone(),
            key,
        })
    }

    pub(crate) fn contains(&self, key: &FetchKey) -> bool {
        self.keys().contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys().len()
    }

    pub(crate) fn clear(&self) {
        self.keys().clear();
    }
}

/// Releases its key when dropped: on completion, failure, timeout, cancellation, or when an
/// unstarted job is discarded.
pub(crate) struct PendingGuard {
    set: PendingSet,
    key: FetchKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.set.keys().remove(&self.key);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manager/pending.rs"]
mod tests;
