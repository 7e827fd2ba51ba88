//! Exclusion regions for shared Sui authority objects
//!
//! Every mint and burn references the same treasury and minter objects, so
//! concurrent requests must not build transactions from the same fetched
//! versions. Each object id maps to an async mutex; a caller locks all the
//! ids it touches (in sorted order, so two callers can never deadlock) before
//! refreshing versions and keeps the guard until its submission completes.
//!
//! An id's mutex lives in the arena only while some caller holds or waits on
//! it; the last guard to release it removes the entry.
//!
//! The arena also remembers the highest version seen in successful effects.
//! A refresh that returns something older came from a lagging node and must
//! not be used to build a transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::ObjectRef;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub struct AuthorityLocks {
    locks: Arc<Mutex<LockMap>>,
    observed: Mutex<HashMap<String, u64>>,
}

/// Held for the duration of one refresh-build-submit cycle
#[derive(Debug)]
pub struct AuthorityGuard {
    arena: Arc<Mutex<LockMap>>,
    object_ids: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for AuthorityGuard {
    fn drop(&mut self) {
        self.guards.clear();
        let mut locks = lock_unpoisoned(&self.arena);
        for id in &self.object_ids {
            // the map's own reference is the only one left
            if locks.get(id).is_some_and(|m| Arc::strong_count(m) == 1) {
                locks.remove(id);
            }
        }
    }
}

impl AuthorityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every id in `object_ids`. Duplicates are locked once.
    pub async fn acquire(&self, object_ids: &[String]) -> AuthorityGuard {
        let mut ids: Vec<String> = object_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = lock_unpoisoned(&self.locks);
            ids.iter()
                .map(|id| locks.entry(id.clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        AuthorityGuard {
            arena: self.locks.clone(),
            object_ids: ids,
            guards,
        }
    }

    /// Number of ids currently held or awaited
    pub fn active(&self) -> usize {
        lock_unpoisoned(&self.locks).len()
    }

    /// Highest version of `object_id` seen in executed effects
    pub fn observed_version(&self, object_id: &str) -> Option<u64> {
        lock_unpoisoned(&self.observed).get(object_id).copied()
    }

    /// Remember versions reported by executed effects. Never moves backwards.
    pub fn record_versions(&self, refs: &[ObjectRef]) {
        let mut observed = lock_unpoisoned(&self.observed);
        for r in refs {
            let entry = observed.entry(r.object_id.clone()).or_insert(r.version);
            if r.version > *entry {
                *entry = r.version;
            }
        }
    }

    /// True if `r` is at least as fresh as anything already observed
    pub fn is_fresh(&self, r: &ObjectRef) -> bool {
        self.observed_version(&r.object_id)
            .map_or(true, |seen| r.version >= seen)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
