//! Wire protocol for the lock channel.
//!
//! Every frame is a JSON object with an internally-tagged `"type"`
//! discriminator and camelCase fields, so browser and native clients can
//! route frames by type string alone.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::locking::{validate_identity, validate_resource_ref, ReleaseReason};
use crate::types::{ConnectionId, ResourceId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Shared payload types
// ---------------------------------------------------------------------------

/// An exclusive claim by one identity over one business record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    pub resource_kind: String,
    pub resource_id: ResourceId,
    pub holder_user_id: UserId,
    pub holder_display_name: String,
    pub connection_id: ConnectionId,
    pub acquired_at: Timestamp,
    pub last_activity_at: Timestamp,
}

impl Lock {
    /// The public view of who holds this lock.
    pub fn holder(&self) -> LockHolder {
        LockHolder {
            user_id: self.holder_user_id.clone(),
            display_name: self.holder_display_name.clone(),
            acquired_at: self.acquired_at,
        }
    }

    /// The `resource-locked` broadcast announcing this lock.
    pub fn locked_message(&self) -> ServerMessage {
        ServerMessage::ResourceLocked {
            resource_kind: self.resource_kind.clone(),
            resource_id: self.resource_id.clone(),
            user_id: self.holder_user_id.clone(),
            display_name: self.holder_display_name.clone(),
            acquired_at: self.acquired_at,
        }
    }
}

/// Holder details returned to a denied requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockHolder {
    pub user_id: UserId,
    pub display_name: String,
    pub acquired_at: Timestamp,
}

/// An authenticated user entry in a `users-list` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedUser {
    pub user_id: UserId,
    pub display_name: String,
    pub connected_at: Timestamp,
}

/// Codes carried by `error` frames.
pub mod error_codes {
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const IDENTITY_MISMATCH: &str = "IDENTITY_MISMATCH";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// Frames sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Attach an identity to this connection.
    #[serde(rename = "authenticate", rename_all = "camelCase")]
    Authenticate { user_id: UserId, display_name: String },

    /// Ask for exclusive edit access to a record.
    #[serde(rename = "request-lock", rename_all = "camelCase")]
    RequestLock {
        resource_kind: String,
        resource_id: ResourceId,
        user_id: UserId,
        display_name: String,
    },

    /// Give up edit access to a record.
    #[serde(rename = "release-lock", rename_all = "camelCase")]
    ReleaseLock {
        resource_kind: String,
        resource_id: ResourceId,
        user_id: UserId,
    },

    /// Prove the holder is still editing.
    #[serde(rename = "heartbeat", rename_all = "camelCase")]
    Heartbeat {
        resource_kind: String,
        resource_id: ResourceId,
        user_id: UserId,
    },

    /// Ask for every current lock of one kind.
    #[serde(rename = "get-locks", rename_all = "camelCase")]
    GetLocks { resource_kind: String },
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The user id the frame claims to act for, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ClientMessage::Authenticate { user_id, .. }
            | ClientMessage::RequestLock { user_id, .. }
            | ClientMessage::ReleaseLock { user_id, .. }
            | ClientMessage::Heartbeat { user_id, .. } => Some(user_id),
            ClientMessage::GetLocks { .. } => None,
        }
    }

    /// Check field contents beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClientMessage::Authenticate {
                user_id,
                display_name,
            } => validate_identity(user_id, display_name),
            ClientMessage::RequestLock {
                resource_kind,
                resource_id,
                user_id,
                display_name,
            } => {
                validate_resource_ref(resource_kind, resource_id)?;
                validate_identity(user_id, display_name)
            }
            ClientMessage::ReleaseLock {
                resource_kind,
                resource_id,
                ..
            }
            | ClientMessage::Heartbeat {
                resource_kind,
                resource_id,
                ..
            } => validate_resource_ref(resource_kind, resource_id),
            ClientMessage::GetLocks { resource_kind } => {
                if crate::locking::is_valid_resource_kind(resource_kind) {
                    Ok(())
                } else {
                    Err(format!("Invalid resourceKind '{resource_kind}'"))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Frames sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// To the requester: the lock is yours.
    #[serde(rename = "lock-accepted", rename_all = "camelCase")]
    LockAccepted {
        resource_kind: String,
        resource_id: ResourceId,
        user_id: UserId,
        display_name: String,
        acquired_at: Timestamp,
    },

    /// To the requester: someone else holds the lock.
    #[serde(rename = "lock-denied", rename_all = "camelCase")]
    LockDenied {
        resource_kind: String,
        resource_id: ResourceId,
        current_holder: LockHolder,
    },

    /// To everyone but the originator: a lock was taken or re-taken.
    #[serde(rename = "resource-locked", rename_all = "camelCase")]
    ResourceLocked {
        resource_kind: String,
        resource_id: ResourceId,
        user_id: UserId,
        display_name: String,
        acquired_at: Timestamp,
    },

    /// To everyone: a lock went away.
    #[serde(rename = "resource-unlocked", rename_all = "camelCase")]
    ResourceUnlocked {
        resource_kind: String,
        resource_id: ResourceId,
        reason: ReleaseReason,
    },

    /// To the requester: every current lock of one kind.
    #[serde(rename = "locks-snapshot", rename_all = "camelCase")]
    LocksSnapshot {
        resource_kind: String,
        locks: Vec<Lock>,
    },

    /// To everyone: the authenticated users currently connected.
    #[serde(rename = "users-list", rename_all = "camelCase")]
    UsersList { connected_users: Vec<ConnectedUser> },

    /// To the sender of a frame that could not be processed.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build an `error` frame.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// The resource kind the frame concerns, if it concerns one.
    pub fn resource_kind(&self) -> Option<&str> {
        match self {
            ServerMessage::LockAccepted { resource_kind, .. }
            | ServerMessage::LockDenied { resource_kind, .. }
            | ServerMessage::ResourceLocked { resource_kind, .. }
            | ServerMessage::ResourceUnlocked { resource_kind, .. }
            | ServerMessage::LocksSnapshot { resource_kind, .. } => Some(resource_kind),
            ServerMessage::UsersList { .. } | ServerMessage::Error { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
