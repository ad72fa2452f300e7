//! In-memory per-user presence tracking with multi-connection support.
//!
//! Presence is per-**user**, not per-connection. A user may hold several
//! simultaneous connections (tabs, devices); broadcasts fire only on the true
//! online/offline edge, so the counter mutations must be atomic — two
//! decrements racing to zero would otherwise leave a user stuck online or
//! spuriously offline.

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Thread-safe, DashMap-backed presence registry.
///
/// The invariant: a user id is present in the map iff its count ≥ 1. The
/// entry API holds the shard lock across the read-modify-write, so each
/// increment/decrement is a single atomic step.
pub struct PresenceRegistry {
    counts: DashMap<i64, usize>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
        }
    }

    /// Register a connection opening. Returns `true` only on the 0→1 edge.
    pub fn mark_online(&self, user_id: i64) -> bool {
        match self.counts.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() += 1;
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(1);
                true
            }
        }
    }

    /// Register a connection closing. Returns `true` only on the 1→0 edge.
    /// Decrementing an absent user is a no-op returning `false`.
    pub fn mark_offline(&self, user_id: i64) -> bool {
        match self.counts.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() <= 1 {
                    occupied.remove();
                    true
                } else {
                    *occupied.get_mut() -= 1;
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.counts.contains_key(&user_id)
    }

    /// Snapshot of all users with at least one open connection.
    pub fn online_user_ids(&self) -> HashSet<i64> {
        self.counts.iter().map(|entry| *entry.key()).collect()
    }

    /// Filter a candidate set down to the online ones, in O(|candidates|).
    pub fn online_among(&self, candidates: &[i64]) -> Vec<i64> {
        candidates
            .iter()
            .copied()
            .filter(|id| self.is_online(*id))
            .collect()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
