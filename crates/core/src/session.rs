//! Client-side lock session state machine.
//!
//! One [`LockSession`] exists per open record-editing view. It owns no
//! socket and no timer: every input (view lifecycle, server frame, timer
//! tick, visibility change, transport loss) is a method call, and every
//! output is a [`SessionEffect`] the caller carries out. That keeps the
//! machine deterministic and testable without a network.

use std::marker::PhantomData;

use crate::locking::ResourceKind;
use crate::protocol::{ClientMessage, Lock, ServerMessage};
use crate::types::{ResourceId, UserId};

/// Who this session edits as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Lock state of the open record as this session sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No lock held and none requested.
    Idle,
    /// A request is in flight (or must be re-confirmed after reconnect).
    Pending,
    /// This session holds the lock.
    HeldByMe,
    /// Someone else holds the lock. The view stays usable read-only.
    HeldByOther { holder_display_name: String },
}

/// Something the caller must do as a result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Send this frame to the server.
    Send(ClientMessage),
    /// Start the periodic heartbeat timer.
    StartHeartbeat,
    /// Stop the periodic heartbeat timer.
    StopHeartbeat,
    /// Tell the user the record is being edited by someone else.
    LockDenied { holder_display_name: String },
    /// Tell the user their lock was reclaimed and unsaved edits may be lost.
    LockLost,
}

/// Lock session for one record of kind `K`.
#[derive(Debug)]
pub struct LockSession<K: ResourceKind> {
    identity: Identity,
    resource_id: Option<ResourceId>,
    state: SessionState,
    visible: bool,
    connected: bool,
    reconfirm_on_reconnect: bool,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> LockSession<K> {
    /// A new session with no record open. Assumes a connected, visible tab.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            resource_id: None,
            state: SessionState::Idle,
            visible: true,
            connected: true,
            reconfirm_on_reconnect: false,
            _kind: PhantomData,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_held_by_me(&self) -> bool {
        self.state == SessionState::HeldByMe
    }

    /// Display name of the other holder, when there is one.
    pub fn locked_by(&self) -> Option<&str> {
        match &self.state {
            SessionState::HeldByOther {
                holder_display_name,
            } => Some(holder_display_name),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // View lifecycle
    // -----------------------------------------------------------------------

    /// The view opened `resource_id` for editing.
    ///
    /// Opening a different record while one is open switches to it; opening
    /// the record already open is a no-op.
    pub fn open(&mut self, resource_id: impl Into<ResourceId>) -> Vec<SessionEffect> {
        let resource_id = resource_id.into();
        if self.resource_id.as_deref() == Some(resource_id.as_str()) {
            return Vec::new();
        }
        let mut effects = self.release_current();
        self.resource_id = Some(resource_id);
        effects.extend(self.request_current());
        effects
    }

    /// The view switched from the open record to `resource_id`.
    ///
    /// The previous record is released before the new one is requested, so
    /// a session never holds two locks.
    pub fn switch_to(&mut self, resource_id: impl Into<ResourceId>) -> Vec<SessionEffect> {
        self.open(resource_id)
    }

    /// Explicit retry after a denial or after the lock went away.
    pub fn retry(&mut self) -> Vec<SessionEffect> {
        match self.state {
            SessionState::Idle | SessionState::HeldByOther { .. } => self.request_current(),
            SessionState::Pending | SessionState::HeldByMe => Vec::new(),
        }
    }

    /// The view closed. Releases if held or requested.
    pub fn close(&mut self) -> Vec<SessionEffect> {
        let effects = self.release_current();
        self.resource_id = None;
        effects
    }

    /// The process is going away. Best-effort release; the server's
    /// eviction sweep covers a lost frame.
    pub fn teardown(&mut self) -> Vec<SessionEffect> {
        self.close()
    }

    // -----------------------------------------------------------------------
    // Timers and environment
    // -----------------------------------------------------------------------

    /// The heartbeat timer fired.
    pub fn heartbeat_tick(&mut self) -> Vec<SessionEffect> {
        if self.visible {
            self.heartbeat_frame().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// The tab went to the background or came back.
    ///
    /// Hidden: keep the lock, suppress heartbeats. Visible again: send one
    /// heartbeat immediately.
    pub fn visibility_changed(&mut self, visible: bool) -> Vec<SessionEffect> {
        let was_visible = std::mem::replace(&mut self.visible, visible);
        if visible && !was_visible {
            self.heartbeat_frame().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// The real-time channel dropped. Nothing held is assumed to survive.
    pub fn transport_lost(&mut self) -> Vec<SessionEffect> {
        self.connected = false;
        match self.state {
            SessionState::HeldByMe | SessionState::Pending => {
                self.reconfirm_on_reconnect = true;
                self.state = SessionState::Pending;
                vec![SessionEffect::StopHeartbeat]
            }
            _ => Vec::new(),
        }
    }

    /// The channel is back. Re-requests the snapshot and re-confirms any
    /// lock this session held or was waiting for.
    pub fn transport_restored(&mut self) -> Vec<SessionEffect> {
        self.connected = true;
        let mut effects = vec![SessionEffect::Send(ClientMessage::GetLocks {
            resource_kind: K::NAME.to_string(),
        })];
        if std::mem::take(&mut self.reconfirm_on_reconnect) {
            if let Some(frame) = self.request_frame() {
                self.state = SessionState::Pending;
                effects.push(SessionEffect::Send(frame));
            }
        }
        effects
    }

    // -----------------------------------------------------------------------
    // Server frames
    // -----------------------------------------------------------------------

    /// React to a server frame. Frames for other kinds or records, and
    /// repeats of the current state, produce no effects.
    pub fn handle(&mut self, message: &ServerMessage) -> Vec<SessionEffect> {
        if message.resource_kind().is_some_and(|kind| kind != K::NAME) {
            return Vec::new();
        }

        match message {
            ServerMessage::LockAccepted {
                resource_id,
                user_id,
                ..
            } => {
                if !self.is_current(resource_id) || *user_id != self.identity.user_id {
                    return Vec::new();
                }
                self.become_held()
            }
            ServerMessage::LockDenied {
                resource_id,
                current_holder,
                ..
            } => {
                if !self.is_current(resource_id) || self.state != SessionState::Pending {
                    return Vec::new();
                }
                self.state = SessionState::HeldByOther {
                    holder_display_name: current_holder.display_name.clone(),
                };
                vec![SessionEffect::LockDenied {
                    holder_display_name: current_holder.display_name.clone(),
                }]
            }
            ServerMessage::ResourceLocked {
                resource_id,
                user_id,
                display_name,
                ..
            } => {
                if !self.is_current(resource_id) {
                    return Vec::new();
                }
                self.apply_holder(user_id, display_name)
            }
            ServerMessage::ResourceUnlocked {
                resource_id,
                reason,
                ..
            } => {
                if !self.is_current(resource_id) {
                    return Vec::new();
                }
                match self.state {
                    SessionState::HeldByMe => {
                        self.state = SessionState::Idle;
                        let mut effects = vec![SessionEffect::StopHeartbeat];
                        if reason.is_eviction() {
                            effects.push(SessionEffect::LockLost);
                        }
                        effects
                    }
                    SessionState::HeldByOther { .. } => {
                        self.state = SessionState::Idle;
                        Vec::new()
                    }
                    // A release ahead of our answer; the answer follows.
                    SessionState::Pending | SessionState::Idle => Vec::new(),
                }
            }
            ServerMessage::LocksSnapshot { locks, .. } => self.apply_snapshot(locks),
            ServerMessage::UsersList { .. } | ServerMessage::Error { .. } => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn is_current(&self, resource_id: &str) -> bool {
        self.resource_id.as_deref() == Some(resource_id)
    }

    fn become_held(&mut self) -> Vec<SessionEffect> {
        if self.state == SessionState::HeldByMe {
            return Vec::new();
        }
        self.state = SessionState::HeldByMe;
        vec![SessionEffect::StartHeartbeat]
    }

    /// Someone (maybe us on another tab) holds the open record.
    fn apply_holder(&mut self, user_id: &str, display_name: &str) -> Vec<SessionEffect> {
        if user_id == self.identity.user_id {
            // Same user on another connection counts as us; our own
            // request's answer decides this session's state.
            return Vec::new();
        }
        if self.state == SessionState::Pending {
            // Our request is still in flight; its answer decides.
            return Vec::new();
        }
        let lost = self.state == SessionState::HeldByMe;
        self.state = SessionState::HeldByOther {
            holder_display_name: display_name.to_string(),
        };
        if lost {
            // We missed our own eviction and someone already took over.
            vec![SessionEffect::StopHeartbeat, SessionEffect::LockLost]
        } else {
            Vec::new()
        }
    }

    fn apply_snapshot(&mut self, locks: &[Lock]) -> Vec<SessionEffect> {
        let Some(current) = self.resource_id.as_deref() else {
            return Vec::new();
        };
        match locks.iter().find(|lock| lock.resource_id == current) {
            Some(lock) => {
                let (user_id, display_name) =
                    (lock.holder_user_id.clone(), lock.holder_display_name.clone());
                self.apply_holder(&user_id, &display_name)
            }
            None => match self.state {
                SessionState::HeldByMe => {
                    self.state = SessionState::Idle;
                    vec![SessionEffect::StopHeartbeat, SessionEffect::LockLost]
                }
                SessionState::HeldByOther { .. } => {
                    self.state = SessionState::Idle;
                    Vec::new()
                }
                SessionState::Pending | SessionState::Idle => Vec::new(),
            },
        }
    }

    fn request_frame(&self) -> Option<ClientMessage> {
        self.resource_id
            .as_ref()
            .map(|resource_id| ClientMessage::RequestLock {
                resource_kind: K::NAME.to_string(),
                resource_id: resource_id.clone(),
                user_id: self.identity.user_id.clone(),
                display_name: self.identity.display_name.clone(),
            })
    }

    fn heartbeat_frame(&self) -> Option<SessionEffect> {
        if self.state != SessionState::HeldByMe || !self.connected {
            return None;
        }
        self.resource_id.as_ref().map(|resource_id| {
            SessionEffect::Send(ClientMessage::Heartbeat {
                resource_kind: K::NAME.to_string(),
                resource_id: resource_id.clone(),
                user_id: self.identity.user_id.clone(),
            })
        })
    }

    fn request_current(&mut self) -> Vec<SessionEffect> {
        let Some(frame) = self.request_frame() else {
            return Vec::new();
        };
        self.state = SessionState::Pending;
        if self.connected {
            vec![SessionEffect::Send(frame)]
        } else {
            self.reconfirm_on_reconnect = true;
            Vec::new()
        }
    }

    /// Release the open record if held or requested, and go idle.
    ///
    /// A pending request is released too: if the server accepts it before
    /// seeing the release, the release still arrives after it on the same
    /// connection.
    fn release_current(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        let was_held = self.state == SessionState::HeldByMe;
        let should_release = matches!(self.state, SessionState::HeldByMe | SessionState::Pending);

        if was_held {
            effects.push(SessionEffect::StopHeartbeat);
        }
        if should_release && self.connected {
            if let Some(resource_id) = &self.resource_id {
                effects.push(SessionEffect::Send(ClientMessage::ReleaseLock {
                    resource_kind: K::NAME.to_string(),
                    resource_id: resource_id.clone(),
                    user_id: self.identity.user_id.clone(),
                }));
            }
        }
        self.reconfirm_on_reconnect = false;
        self.state = SessionState::Idle;
        effects
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::{Cliente, Pedido, ReleaseReason};
    use crate::protocol::LockHolder;
    use chrono::{TimeZone, Utc};

    fn now() -> crate::types::Timestamp {
        Utc.timestamp_opt(1_760_000_000, 0).unwrap()
    }

    fn ana() -> LockSession<Pedido> {
        LockSession::new(Identity::new("a", "Ana"))
    }

    fn accepted(id: &str) -> ServerMessage {
        ServerMessage::LockAccepted {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            user_id: "a".into(),
            display_name: "Ana".into(),
            acquired_at: now(),
        }
    }

    fn denied(id: &str, holder: &str) -> ServerMessage {
        ServerMessage::LockDenied {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            current_holder: LockHolder {
                user_id: "b".into(),
                display_name: holder.into(),
                acquired_at: now(),
            },
        }
    }

    fn locked(id: &str, user_id: &str, name: &str) -> ServerMessage {
        ServerMessage::ResourceLocked {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            user_id: user_id.into(),
            display_name: name.into(),
            acquired_at: now(),
        }
    }

    fn unlocked(id: &str, reason: ReleaseReason) -> ServerMessage {
        ServerMessage::ResourceUnlocked {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            reason,
        }
    }

    fn release_frame(id: &str) -> SessionEffect {
        SessionEffect::Send(ClientMessage::ReleaseLock {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            user_id: "a".into(),
        })
    }

    fn request_frame(id: &str) -> SessionEffect {
        SessionEffect::Send(ClientMessage::RequestLock {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            user_id: "a".into(),
            display_name: "Ana".into(),
        })
    }

    fn heartbeat_frame(id: &str) -> SessionEffect {
        SessionEffect::Send(ClientMessage::Heartbeat {
            resource_kind: "pedido".into(),
            resource_id: id.into(),
            user_id: "a".into(),
        })
    }

    fn held(id: &str) -> LockSession<Pedido> {
        let mut session = ana();
        session.open(id);
        session.handle(&accepted(id));
        session
    }

    #[test]
    fn open_requests_the_lock() {
        let mut session = ana();
        let effects = session.open("ORD-1");

        assert_eq!(effects, vec![request_frame("ORD-1")]);
        assert_eq!(session.state(), &SessionState::Pending);
    }

    #[test]
    fn accepted_starts_heartbeat() {
        let mut session = ana();
        session.open("ORD-1");

        assert_eq!(session.handle(&accepted("ORD-1")), vec![SessionEffect::StartHeartbeat]);
        assert!(session.is_held_by_me());
        // A repeated accept is a no-op.
        assert!(session.handle(&accepted("ORD-1")).is_empty());
    }

    #[test]
    fn denied_surfaces_holder_once() {
        let mut session = ana();
        session.open("ORD-1");

        let effects = session.handle(&denied("ORD-1", "Beto"));
        assert_eq!(
            effects,
            vec![SessionEffect::LockDenied {
                holder_display_name: "Beto".into()
            }]
        );
        assert_eq!(session.locked_by(), Some("Beto"));
        // No automatic retry, and a duplicate denial does not re-notify.
        assert!(session.handle(&denied("ORD-1", "Beto")).is_empty());
    }

    #[test]
    fn held_by_other_tracks_new_holder() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));

        assert!(session.handle(&locked("ORD-1", "c", "Carla")).is_empty());
        assert_eq!(session.locked_by(), Some("Carla"));
    }

    #[test]
    fn held_by_other_goes_idle_on_any_unlock_without_lock_lost() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));

        let effects = session.handle(&unlocked("ORD-1", ReleaseReason::Timeout));
        assert!(effects.is_empty());
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn timeout_eviction_fires_lock_lost() {
        let mut session = held("ORD-1");

        let effects = session.handle(&unlocked("ORD-1", ReleaseReason::Timeout));
        assert_eq!(
            effects,
            vec![SessionEffect::StopHeartbeat, SessionEffect::LockLost]
        );
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn manual_unlock_of_own_lock_does_not_fire_lock_lost() {
        let mut session = held("ORD-1");

        let effects = session.handle(&unlocked("ORD-1", ReleaseReason::Manual));
        assert_eq!(effects, vec![SessionEffect::StopHeartbeat]);
    }

    #[test]
    fn close_while_holding_releases() {
        let mut session = held("ORD-1");

        let effects = session.close();
        assert_eq!(
            effects,
            vec![SessionEffect::StopHeartbeat, release_frame("ORD-1")]
        );
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.resource_id(), None);
        // Closing twice sends nothing more.
        assert!(session.close().is_empty());
    }

    #[test]
    fn close_while_held_by_other_sends_nothing() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));

        assert!(session.close().is_empty());
    }

    #[test]
    fn switch_releases_previous_before_requesting_next() {
        let mut session = held("ORD-1");

        let effects = session.switch_to("ORD-2");
        assert_eq!(
            effects,
            vec![
                SessionEffect::StopHeartbeat,
                release_frame("ORD-1"),
                request_frame("ORD-2"),
            ]
        );
        assert_eq!(session.resource_id(), Some("ORD-2"));
        assert_eq!(session.state(), &SessionState::Pending);
    }

    #[test]
    fn switch_while_pending_releases_the_unanswered_request() {
        let mut session = ana();
        session.open("ORD-1");

        let effects = session.switch_to("ORD-2");
        assert_eq!(effects, vec![release_frame("ORD-1"), request_frame("ORD-2")]);
        // A late accept for the old record is ignored.
        assert!(session.handle(&accepted("ORD-1")).is_empty());
        assert_eq!(session.state(), &SessionState::Pending);
    }

    #[test]
    fn reopening_same_record_is_noop() {
        let mut session = held("ORD-1");
        assert!(session.open("ORD-1").is_empty());
        assert!(session.is_held_by_me());
    }

    #[test]
    fn retry_after_denial_requests_again() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));

        assert_eq!(session.retry(), vec![request_frame("ORD-1")]);
        assert_eq!(session.state(), &SessionState::Pending);
    }

    #[test]
    fn heartbeat_only_while_held_and_visible() {
        let mut session = ana();
        session.open("ORD-1");
        assert!(session.heartbeat_tick().is_empty());

        session.handle(&accepted("ORD-1"));
        assert_eq!(session.heartbeat_tick(), vec![heartbeat_frame("ORD-1")]);

        assert!(session.visibility_changed(false).is_empty());
        assert!(session.heartbeat_tick().is_empty());
        assert!(session.is_held_by_me());
    }

    #[test]
    fn returning_to_foreground_sends_immediate_heartbeat() {
        let mut session = held("ORD-1");
        session.visibility_changed(false);

        assert_eq!(session.visibility_changed(true), vec![heartbeat_frame("ORD-1")]);
        // Already visible: nothing extra.
        assert!(session.visibility_changed(true).is_empty());
    }

    #[test]
    fn foregrounding_without_lock_sends_nothing() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));
        session.visibility_changed(false);

        assert!(session.visibility_changed(true).is_empty());
    }

    #[test]
    fn teardown_releases_held_lock() {
        let mut session = held("ORD-1");
        assert!(session.teardown().contains(&release_frame("ORD-1")));
    }

    #[test]
    fn transport_loss_then_restore_reconfirms() {
        let mut session = held("ORD-1");

        assert_eq!(session.transport_lost(), vec![SessionEffect::StopHeartbeat]);
        assert_eq!(session.state(), &SessionState::Pending);
        assert!(session.heartbeat_tick().is_empty());

        let effects = session.transport_restored();
        assert_eq!(
            effects,
            vec![
                SessionEffect::Send(ClientMessage::GetLocks {
                    resource_kind: "pedido".into()
                }),
                request_frame("ORD-1"),
            ]
        );
        assert_eq!(session.handle(&accepted("ORD-1")), vec![SessionEffect::StartHeartbeat]);
    }

    #[test]
    fn restore_without_prior_lock_only_asks_for_snapshot() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));
        session.transport_lost();

        assert_eq!(session.transport_restored().len(), 1);
    }

    #[test]
    fn open_while_disconnected_requests_on_restore() {
        let mut session = ana();
        session.transport_lost();

        assert!(session.open("ORD-1").is_empty());
        let effects = session.transport_restored();
        assert!(effects.contains(&request_frame("ORD-1")));
    }

    #[test]
    fn close_while_disconnected_is_not_reconfirmed() {
        let mut session = held("ORD-1");
        session.transport_lost();

        assert!(session.close().is_empty());
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(
            session.transport_restored(),
            vec![SessionEffect::Send(ClientMessage::GetLocks {
                resource_kind: "pedido".into()
            })]
        );
    }

    #[test]
    fn snapshot_shows_other_holder() {
        let mut session = ana();
        session.open("ORD-1");
        session.handle(&denied("ORD-1", "Beto"));
        session.handle(&unlocked("ORD-1", ReleaseReason::Manual));

        let lock = Lock {
            resource_kind: "pedido".into(),
            resource_id: "ORD-1".into(),
            holder_user_id: "c".into(),
            holder_display_name: "Carla".into(),
            connection_id: "c-c".into(),
            acquired_at: now(),
            last_activity_at: now(),
        };
        session.handle(&ServerMessage::LocksSnapshot {
            resource_kind: "pedido".into(),
            locks: vec![lock],
        });
        assert_eq!(session.locked_by(), Some("Carla"));
    }

    #[test]
    fn snapshot_without_our_lock_means_it_was_lost() {
        let mut session = held("ORD-1");

        let effects = session.handle(&ServerMessage::LocksSnapshot {
            resource_kind: "pedido".into(),
            locks: vec![],
        });
        assert_eq!(
            effects,
            vec![SessionEffect::StopHeartbeat, SessionEffect::LockLost]
        );
    }

    #[test]
    fn other_user_locking_our_record_means_we_lost_it() {
        let mut session = held("ORD-1");

        let effects = session.handle(&locked("ORD-1", "b", "Beto"));
        assert_eq!(
            effects,
            vec![SessionEffect::StopHeartbeat, SessionEffect::LockLost]
        );
        assert_eq!(session.locked_by(), Some("Beto"));
    }

    #[test]
    fn pending_request_waits_for_its_own_answer() {
        let mut session = ana();
        session.open("ORD-1");

        assert!(session.handle(&locked("ORD-1", "b", "Beto")).is_empty());
        assert_eq!(session.state(), &SessionState::Pending);
        assert_eq!(session.handle(&denied("ORD-1", "Beto")).len(), 1);
    }

    #[test]
    fn own_user_on_another_tab_is_still_me() {
        let mut session = held("ORD-1");
        assert!(session.handle(&locked("ORD-1", "a", "Ana")).is_empty());
        assert!(session.is_held_by_me());
    }

    #[test]
    fn frames_for_other_kinds_are_ignored() {
        let mut session: LockSession<Cliente> = LockSession::new(Identity::new("a", "Ana"));
        session.open("ORD-1");

        assert!(session.handle(&accepted("ORD-1")).is_empty());
        assert_eq!(session.state(), &SessionState::Pending);
    }

    #[test]
    fn frames_for_other_records_are_ignored() {
        let mut session = held("ORD-1");
        assert!(session
            .handle(&unlocked("ORD-9", ReleaseReason::Timeout))
            .is_empty());
        assert!(session.is_held_by_me());
    }
}
