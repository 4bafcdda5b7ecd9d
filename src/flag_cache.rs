//! A thread-safe in-memory storage for the currently loaded flag set. [`FlagCache`] provides
//! concurrent access for readers (flag evaluation) and writers (initial load, refresh, poller).
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::flags::{FlagSet, TryParse};

/// One immutable, fully-loaded flag set.
#[derive(Debug)]
pub struct FlagSnapshot {
    pub(crate) flags: FlagSet,
    pub(crate) loaded_at: DateTime<Utc>,
}

impl FlagSnapshot {
    pub fn new(mut flags: FlagSet, loaded_at: DateTime<Utc>) -> Self {
        // The wire format keys flags by name; copy the key into the definition.
        for (name, flag) in flags.iter_mut() {
            if let TryParse::Parsed(flag) = flag {
                flag.name.clone_from(name);
            }
        }
        FlagSnapshot { flags, loaded_at }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[cfg(test)]
    pub fn contains(&self, flag_name: &str) -> bool {
        self.flags.contains_key(flag_name)
    }
}

/// Summary of the flag cache, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of flags in the current snapshot (including ones that failed to parse).
    pub flag_count: usize,
    /// When the current snapshot was loaded. `None` if nothing has been loaded yet.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// `FlagCache` provides a `Sync` storage for flag snapshots.
///
/// A snapshot is never mutated in place; it can only be replaced completely, so readers observe
/// either the previous or the new flag set in full.
#[derive(Debug, Default)]
pub struct FlagCache {
    snapshot: RwLock<Option<Arc<FlagSnapshot>>>,
}

impl FlagCache {
    pub fn new() -> Self {
        FlagCache::default()
    }

    /// Get the current snapshot. Returns `None` if no flag set has been loaded yet.
    pub fn snapshot(&self) -> Option<Arc<FlagSnapshot>> {
        // self.snapshot.read() should always return Ok(). Err() is possible only if the lock is
        // poisoned (writer panicked while holding the lock), which should never happen. Still,
        // using .ok()? here to not crash the app.
        let snapshot = self.snapshot.read().ok()?;
        snapshot.clone()
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn replace(&self, snapshot: FlagSnapshot) -> Option<Arc<FlagSnapshot>> {
        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Some(Arc::new(snapshot));

        let mut slot = self.snapshot.write().ok()?;
        std::mem::replace(&mut *slot, new_value)
    }

    pub fn stats(&self) -> CacheStats {
        match self.snapshot() {
            Some(snapshot) => CacheStats {
                flag_count: snapshot.len(),
                loaded_at: Some(snapshot.loaded_at),
            },
            None => CacheStats {
                flag_count: 0,
                loaded_at: None,
            },
        }
    }
}
