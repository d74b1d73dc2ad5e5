//! Read-only view of every lock of one kind.
//!
//! Lists and cards show who is editing which record without ever requesting
//! a lock themselves. [`LockObserver`] folds snapshots and broadcasts into a
//! map; replaying the same frames always yields the same view, so a client
//! that reconnects and applies a fresh snapshot converges with one that
//! never disconnected.

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::locking::ResourceKind;
use crate::protocol::ServerMessage;
use crate::types::{ResourceId, Timestamp, UserId};

/// One observed lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedLock {
    pub user_id: UserId,
    pub display_name: String,
    pub acquired_at: Timestamp,
}

/// What an indicator needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockInfo {
    pub is_locked: bool,
    pub is_locked_by_me: bool,
    pub locked_by: Option<String>,
}

/// Map of resource id -> current holder for kind `K`.
#[derive(Debug)]
pub struct LockObserver<K: ResourceKind> {
    locks: HashMap<ResourceId, ObservedLock>,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Default for LockObserver<K> {
    fn default() -> Self {
        Self {
            locks: HashMap::new(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> LockObserver<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one server frame into the view. Returns `true` if it changed.
    pub fn apply(&mut self, message: &ServerMessage) -> bool {
        if message.resource_kind() != Some(K::NAME) {
            return false;
        }
        match message {
            ServerMessage::LocksSnapshot { locks, .. } => {
                let next: HashMap<ResourceId, ObservedLock> = locks
                    .iter()
                    .map(|lock| {
                        (
                            lock.resource_id.clone(),
                            ObservedLock {
                                user_id: lock.holder_user_id.clone(),
                                display_name: lock.holder_display_name.clone(),
                                acquired_at: lock.acquired_at,
                            },
                        )
                    })
                    .collect();
                let changed = next != self.locks;
                self.locks = next;
                changed
            }
            // The requester gets `lock-accepted` instead of its own
            // `resource-locked`.
            ServerMessage::LockAccepted {
                resource_id,
                user_id,
                display_name,
                acquired_at,
                ..
            }
            | ServerMessage::ResourceLocked {
                resource_id,
                user_id,
                display_name,
                acquired_at,
                ..
            } => {
                let entry = ObservedLock {
                    user_id: user_id.clone(),
                    display_name: display_name.clone(),
                    acquired_at: *acquired_at,
                };
                self.locks.insert(resource_id.clone(), entry.clone()) != Some(entry)
            }
            ServerMessage::ResourceUnlocked { resource_id, .. } => {
                self.locks.remove(resource_id).is_some()
            }
            _ => false,
        }
    }

    /// Indicator state for `resource_id` as seen by `current_user`.
    pub fn lock_info(&self, resource_id: &str, current_user: Option<&str>) -> LockInfo {
        match self.locks.get(resource_id) {
            None => LockInfo::default(),
            Some(lock) => LockInfo {
                is_locked: true,
                is_locked_by_me: current_user.is_some_and(|me| me == lock.user_id),
                locked_by: Some(lock.display_name.clone()),
            },
        }
    }

    pub fn get(&self, resource_id: &str) -> Option<&ObservedLock> {
        self.locks.get(resource_id)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Forget everything. Called when the channel drops; the snapshot sent
    /// after reconnect rebuilds the view.
    pub fn clear(&mut self) {
        self.locks.clear();
    }
}
