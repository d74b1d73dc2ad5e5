//! Edit-lock constants, resource kinds, release reasons, and validation.
//!
//! This module lives in `core` (zero internal deps) so that the coordinator,
//! the WebSocket handlers, and the client runtime all agree on the same
//! timings, kind names, and reason strings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// How often a holder renews its lock while the record stays open (seconds).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Locks idle for longer than this are evicted (seconds). Three heartbeats.
pub const DEFAULT_INACTIVITY_THRESHOLD_SECS: u64 = 180;

/// How often the eviction sweep runs (seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// The inactivity threshold must cover at least this many heartbeat periods,
/// so a single late heartbeat never evicts a live editor.
pub const MIN_THRESHOLD_HEARTBEATS: u32 = 2;

/// Upper bound on resource id length accepted over the wire.
pub const MAX_RESOURCE_ID_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// Known resource kind names.
pub mod resource_kinds {
    pub const PEDIDO: &str = "pedido";
    pub const CLIENTE: &str = "cliente";
    pub const VENDEDOR: &str = "vendedor";
}

/// The set of all lockable resource kinds.
pub const VALID_RESOURCE_KINDS: &[&str] = &[
    resource_kinds::PEDIDO,
    resource_kinds::CLIENTE,
    resource_kinds::VENDEDOR,
];

/// Returns `true` if the given resource kind is lockable.
pub fn is_valid_resource_kind(kind: &str) -> bool {
    VALID_RESOURCE_KINDS.contains(&kind)
}

/// Compile-time tag for a lockable resource kind.
///
/// Client sessions are generic over this trait so one state machine serves
/// orders, clients, and vendors alike.
pub trait ResourceKind: Send + Sync + 'static {
    /// Wire name of the kind, one of [`VALID_RESOURCE_KINDS`].
    const NAME: &'static str;
}

/// Manufacturing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pedido;

/// Customer records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cliente;

/// Sales-rep records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vendedor;

impl ResourceKind for Pedido {
    const NAME: &'static str = resource_kinds::PEDIDO;
}

impl ResourceKind for Cliente {
    const NAME: &'static str = resource_kinds::CLIENTE;
}

impl ResourceKind for Vendedor {
    const NAME: &'static str = resource_kinds::VENDEDOR;
}

// ---------------------------------------------------------------------------
// Release reasons
// ---------------------------------------------------------------------------

/// Why a lock went away. Carried on every `resource-unlocked` broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseReason {
    /// The holder closed the record.
    Manual,
    /// The holder stopped heartbeating past the inactivity threshold.
    Timeout,
    /// The holder's connection is gone.
    Disconnect,
}

impl ReleaseReason {
    /// Returns `true` for server-initiated releases. A holder that sees one
    /// of these for its own lock has lost it.
    pub fn is_eviction(self) -> bool {
        matches!(self, ReleaseReason::Timeout | ReleaseReason::Disconnect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseReason::Manual => "manual",
            ReleaseReason::Timeout => "timeout",
            ReleaseReason::Disconnect => "disconnect",
        }
    }
}

impl std::fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timing configuration
// ---------------------------------------------------------------------------

/// Heartbeat, eviction, and sweep timings shared by server and client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    pub heartbeat_interval: Duration,
    pub inactivity_threshold: Duration,
    pub sweep_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            inactivity_threshold: Duration::from_secs(DEFAULT_INACTIVITY_THRESHOLD_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl LockConfig {
    /// Check the timing relationships eviction depends on.
    ///
    /// - every interval is non-zero;
    /// - the threshold covers at least [`MIN_THRESHOLD_HEARTBEATS`] heartbeats;
    /// - the sweep runs more often than the threshold elapses.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval.is_zero()
            || self.inactivity_threshold.is_zero()
            || self.sweep_interval.is_zero()
        {
            return Err("Lock intervals must be greater than zero".to_string());
        }
        let min_threshold = self.heartbeat_interval * MIN_THRESHOLD_HEARTBEATS;
        if self.inactivity_threshold < min_threshold {
            return Err(format!(
                "Inactivity threshold must be at least {}s ({MIN_THRESHOLD_HEARTBEATS} heartbeats), got {}s",
                min_threshold.as_secs(),
                self.inactivity_threshold.as_secs()
            ));
        }
        if self.sweep_interval >= self.inactivity_threshold {
            return Err(format!(
                "Sweep interval must be shorter than the inactivity threshold ({}s), got {}s",
                self.inactivity_threshold.as_secs(),
                self.sweep_interval.as_secs()
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate that both kind and id are acceptable.
pub fn validate_resource_ref(kind: &str, resource_id: &str) -> Result<(), String> {
    if !is_valid_resource_kind(kind) {
        return Err(format!(
            "Invalid resourceKind '{kind}'. Must be one of: {}",
            VALID_RESOURCE_KINDS.join(", ")
        ));
    }
    if resource_id.trim().is_empty() {
        return Err("resourceId must not be empty".to_string());
    }
    if resource_id.len() > MAX_RESOURCE_ID_LEN {
        return Err(format!(
            "resourceId must be at most {MAX_RESOURCE_ID_LEN} characters, got {}",
            resource_id.len()
        ));
    }
    Ok(())
}

/// Validate an identity attached to a connection.
pub fn validate_identity(user_id: &str, display_name: &str) -> Result<(), String> {
    if user_id.trim().is_empty() {
        return Err("userId must not be empty".to_string());
    }
    if display_name.trim().is_empty() {
        return Err("displayName must not be empty".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_resource_kinds() {
        assert!(is_valid_resource_kind("pedido"));
        assert!(is_valid_resource_kind("cliente"));
        assert!(is_valid_resource_kind("vendedor"));
    }

    #[test]
    fn test_invalid_resource_kinds() {
        assert!(!is_valid_resource_kind(""));
        assert!(!is_valid_resource_kind("Pedido"));
        assert!(!is_valid_resource_kind("factura"));
    }

    #[test]
    fn test_marker_names_are_valid_kinds() {
        assert!(is_valid_resource_kind(Pedido::NAME));
        assert!(is_valid_resource_kind(Cliente::NAME));
        assert!(is_valid_resource_kind(Vendedor::NAME));
    }

    #[test]
    fn test_eviction_reasons() {
        assert!(!ReleaseReason::Manual.is_eviction());
        assert!(ReleaseReason::Timeout.is_eviction());
        assert!(ReleaseReason::Disconnect.is_eviction());
    }

    #[test]
    fn test_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReleaseReason::Timeout).unwrap(),
            r#""timeout""#
        );
        let parsed: ReleaseReason = serde_json::from_str(r#""manual""#).unwrap();
        assert_eq!(parsed, ReleaseReason::Manual);
        assert_eq!(ReleaseReason::Disconnect.to_string(), "disconnect");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LockConfig::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_below_two_heartbeats_rejected() {
        let config = LockConfig {
            inactivity_threshold: Duration::from_secs(90),
            ..LockConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("at least 120s"));
    }

    #[test]
    fn test_sweep_not_shorter_than_threshold_rejected() {
        let config = LockConfig {
            sweep_interval: Duration::from_secs(180),
            ..LockConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("Sweep interval"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = LockConfig {
            sweep_interval: Duration::ZERO,
            ..LockConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_resource_ref() {
        assert!(validate_resource_ref("pedido", "ORD-1").is_ok());
        assert!(validate_resource_ref("cliente", "42").is_ok());
    }

    #[test]
    fn test_invalid_kind_in_ref() {
        let result = validate_resource_ref("factura", "1");
        assert!(result.unwrap_err().contains("Invalid resourceKind"));
    }

    #[test]
    fn test_blank_resource_id() {
        assert!(validate_resource_ref("pedido", "  ").is_err());
    }

    #[test]
    fn test_oversized_resource_id() {
        let id = "x".repeat(MAX_RESOURCE_ID_LEN + 1);
        assert!(validate_resource_ref("pedido", &id)
            .unwrap_err()
            .contains("at most"));
    }

    #[test]
    fn test_identity_validation() {
        assert!(validate_identity("7", "Ana").is_ok());
        assert!(validate_identity("", "Ana").is_err());
        assert!(validate_identity("7", " ").is_err());
    }
}
