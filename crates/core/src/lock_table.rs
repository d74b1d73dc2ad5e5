//! In-memory table of edit locks.
//!
//! [`LockTable`] is a plain data structure with no interior locking and no
//! clock of its own: every time-dependent operation takes `now` from the
//! caller. Exactly one owner (the coordinator actor) mutates it, which is
//! what makes `request` linearizable.

use std::collections::HashMap;
use std::time::Duration;

use crate::locking::ReleaseReason;
use crate::protocol::{Lock, LockHolder};
use crate::types::Timestamp;

/// Key of one lockable record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey {
    pub resource_kind: String,
    pub resource_id: String,
}

impl LockKey {
    pub fn new(resource_kind: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Result of a lock request. Contention is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The caller holds the lock. `reacquired` is set when the caller
    /// already held it and only the activity clock and connection moved.
    Accepted { lock: Lock, reacquired: bool },
    /// Another user holds the lock.
    Denied { holder: LockHolder },
}

/// A lock the sweep decided to evict, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleLock {
    pub key: LockKey,
    pub reason: ReleaseReason,
}

/// Mapping `(kind, id)` -> [`Lock`]. At most one entry per key.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: HashMap<LockKey, Lock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock on `(kind, id)` for `user_id`.
    ///
    /// A request from the current holder's user id is an idempotent
    /// re-acquisition: `last_activity_at`, `connection_id`, and the display
    /// name are refreshed, `acquired_at` is kept.
    pub fn request(
        &mut self,
        resource_kind: &str,
        resource_id: &str,
        user_id: &str,
        display_name: &str,
        connection_id: &str,
        now: Timestamp,
    ) -> LockOutcome {
        let key = LockKey::new(resource_kind, resource_id);

        if let Some(existing) = self.locks.get_mut(&key) {
            if existing.holder_user_id != user_id {
                return LockOutcome::Denied {
                    holder: existing.holder(),
                };
            }
            existing.last_activity_at = now;
            existing.connection_id = connection_id.to_string();
            existing.holder_display_name = display_name.to_string();
            return LockOutcome::Accepted {
                lock: existing.clone(),
                reacquired: true,
            };
        }

        let lock = Lock {
            resource_kind: key.resource_kind.clone(),
            resource_id: key.resource_id.clone(),
            holder_user_id: user_id.to_string(),
            holder_display_name: display_name.to_string(),
            connection_id: connection_id.to_string(),
            acquired_at: now,
            last_activity_at: now,
        };
        self.locks.insert(key, lock.clone());
        LockOutcome::Accepted {
            lock,
            reacquired: false,
        }
    }

    /// Refresh the activity clock if `user_id` holds the lock.
    ///
    /// Returns `false` (and changes nothing) for anyone else, including
    /// when no lock exists: a heartbeat never creates a lock.
    pub fn heartbeat(
        &mut self,
        resource_kind: &str,
        resource_id: &str,
        user_id: &str,
        now: Timestamp,
    ) -> bool {
        match self.locks.get_mut(&LockKey::new(resource_kind, resource_id)) {
            Some(lock) if lock.holder_user_id == user_id => {
                lock.last_activity_at = now;
                true
            }
            _ => false,
        }
    }

    /// Remove the lock if `user_id` holds it. Anyone else: no-op, `None`.
    pub fn release(&mut self, resource_kind: &str, resource_id: &str, user_id: &str) -> Option<Lock> {
        let key = LockKey::new(resource_kind, resource_id);
        match self.locks.get(&key) {
            Some(lock) if lock.holder_user_id == user_id => self.locks.remove(&key),
            _ => None,
        }
    }

    /// Remove the lock regardless of holder. Used by eviction only.
    pub fn evict(&mut self, key: &LockKey) -> Option<Lock> {
        self.locks.remove(key)
    }

    /// Current lock on `(kind, id)`, if any.
    pub fn get(&self, resource_kind: &str, resource_id: &str) -> Option<&Lock> {
        self.locks.get(&LockKey::new(resource_kind, resource_id))
    }

    /// Every lock of one kind, oldest first.
    pub fn snapshot(&self, resource_kind: &str) -> Vec<Lock> {
        let mut locks: Vec<Lock> = self
            .locks
            .values()
            .filter(|lock| lock.resource_kind == resource_kind)
            .cloned()
            .collect();
        locks.sort_by(|a, b| {
            a.acquired_at
                .cmp(&b.acquired_at)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        locks
    }

    /// Locks that must be evicted at `now`.
    ///
    /// A lock whose connection is no longer live is reported as
    /// [`ReleaseReason::Disconnect`]; otherwise one idle for strictly longer
    /// than `threshold` is reported as [`ReleaseReason::Timeout`].
    pub fn find_stale<F>(&self, now: Timestamp, threshold: Duration, is_live: F) -> Vec<StaleLock>
    where
        F: Fn(&str) -> bool,
    {
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::MAX);
        let mut stale: Vec<StaleLock> = self
            .locks
            .iter()
            .filter_map(|(key, lock)| {
                let reason = if !is_live(&lock.connection_id) {
                    ReleaseReason::Disconnect
                } else if now - lock.last_activity_at > threshold {
                    ReleaseReason::Timeout
                } else {
                    return None;
                };
                Some(StaleLock {
                    key: key.clone(),
                    reason,
                })
            })
            .collect();
        stale.sort_by(|a, b| a.key.cmp(&b.key));
        stale
    }

    /// Number of locks across all kinds.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    const THRESHOLD: Duration = Duration::from_secs(180);

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    fn all_live(_: &str) -> bool {
        true
    }

    #[test]
    fn first_request_is_accepted() {
        let mut table = LockTable::new();
        let outcome = table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert_matches!(
            outcome,
            LockOutcome::Accepted { ref lock, reacquired: false }
                if lock.acquired_at == at(0) && lock.last_activity_at == at(0)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn second_user_is_denied_with_holder() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        let outcome = table.request("pedido", "ORD-1", "b", "Beto", "c-b", at(1));
        assert_matches!(
            outcome,
            LockOutcome::Denied { ref holder } if holder.display_name == "Ana" && holder.user_id == "a"
        );
        assert_eq!(table.get("pedido", "ORD-1").unwrap().holder_user_id, "a");
    }

    #[test]
    fn same_user_reacquires_and_moves_connection() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        let outcome = table.request("pedido", "ORD-1", "a", "Ana", "c-a2", at(40));
        assert_matches!(outcome, LockOutcome::Accepted { reacquired: true, .. });

        let lock = table.get("pedido", "ORD-1").unwrap();
        assert_eq!(lock.connection_id, "c-a2");
        assert_eq!(lock.acquired_at, at(0));
        assert_eq!(lock.last_activity_at, at(40));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn kinds_are_independent() {
        let mut table = LockTable::new();
        table.request("pedido", "1", "a", "Ana", "c-a", at(0));

        let outcome = table.request("cliente", "1", "b", "Beto", "c-b", at(0));
        assert_matches!(outcome, LockOutcome::Accepted { .. });
        assert_eq!(table.snapshot("pedido").len(), 1);
        assert_eq!(table.snapshot("cliente").len(), 1);
    }

    #[test]
    fn heartbeat_from_holder_refreshes_activity() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(table.heartbeat("pedido", "ORD-1", "a", at(60)));
        assert_eq!(table.get("pedido", "ORD-1").unwrap().last_activity_at, at(60));
    }

    #[test]
    fn heartbeat_from_non_holder_is_ignored() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(!table.heartbeat("pedido", "ORD-1", "b", at(60)));
        assert_eq!(table.get("pedido", "ORD-1").unwrap().last_activity_at, at(0));
    }

    #[test]
    fn heartbeat_never_creates_a_lock() {
        let mut table = LockTable::new();
        assert!(!table.heartbeat("pedido", "ORD-1", "a", at(0)));
        assert!(table.is_empty());
    }

    #[test]
    fn release_by_holder_removes_lock() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        let released = table.release("pedido", "ORD-1", "a");
        assert_eq!(released.map(|l| l.holder_user_id), Some("a".to_string()));
        assert!(table.is_empty());
    }

    #[test]
    fn release_by_non_holder_is_noop() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(table.release("pedido", "ORD-1", "b").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn double_release_is_noop() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(table.release("pedido", "ORD-1", "a").is_some());
        assert!(table.release("pedido", "ORD-1", "a").is_none());
    }

    #[test]
    fn released_lock_can_be_taken_by_another_user() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));
        table.release("pedido", "ORD-1", "a");

        let outcome = table.request("pedido", "ORD-1", "b", "Beto", "c-b", at(5));
        assert_matches!(outcome, LockOutcome::Accepted { reacquired: false, .. });
    }

    #[test]
    fn snapshot_is_filtered_and_ordered() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-2", "a", "Ana", "c-a", at(10));
        table.request("pedido", "ORD-1", "b", "Beto", "c-b", at(5));
        table.request("vendedor", "V-1", "a", "Ana", "c-a", at(0));

        let ids: Vec<String> = table
            .snapshot("pedido")
            .into_iter()
            .map(|l| l.resource_id)
            .collect();
        assert_eq!(ids, vec!["ORD-1".to_string(), "ORD-2".to_string()]);
        assert!(table.snapshot("cliente").is_empty());
    }

    #[test]
    fn lock_within_threshold_is_not_stale() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(table.find_stale(at(180), THRESHOLD, all_live).is_empty());
    }

    #[test]
    fn idle_lock_past_threshold_is_stale_with_timeout() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        let stale = table.find_stale(at(181), THRESHOLD, all_live);
        assert_eq!(
            stale,
            vec![StaleLock {
                key: LockKey::new("pedido", "ORD-1"),
                reason: ReleaseReason::Timeout,
            }]
        );
    }

    #[test]
    fn heartbeat_postpones_staleness() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));
        table.heartbeat("pedido", "ORD-1", "a", at(120));

        assert!(table.find_stale(at(250), THRESHOLD, all_live).is_empty());
    }

    #[test]
    fn dead_connection_is_stale_with_disconnect() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));
        table.request("pedido", "ORD-2", "b", "Beto", "c-b", at(0));

        let stale = table.find_stale(at(1), THRESHOLD, |conn| conn != "c-a");
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].key.resource_id, "ORD-1");
        assert_eq!(stale[0].reason, ReleaseReason::Disconnect);
    }

    #[test]
    fn evict_removes_regardless_of_holder() {
        let mut table = LockTable::new();
        table.request("pedido", "ORD-1", "a", "Ana", "c-a", at(0));

        assert!(table.evict(&LockKey::new("pedido", "ORD-1")).is_some());
        assert!(table.evict(&LockKey::new("pedido", "ORD-1")).is_none());
    }
}
