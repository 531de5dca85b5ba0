//! Tunable parameters for the membership table and failure detector (spec
//! §3, §8), grounded in the teacher's `Config` struct in `lib.rs` and the
//! `HealthCheckConfig` in `networking/health/checker.rs` — a plain struct
//! with a sane `Default` rather than a builder, since every field here is a
//! flat scalar.

use std::time::Duration;
use tracing::warn;

/// Configuration for one SWIM node.
#[derive(Debug, Clone)]
pub struct SwimConfig {
    /// Local UDP port to bind.
    pub port: u16,
    /// Length of one probe period (spec §4.2 `tick`).
    pub period_timeout: Duration,
    /// How long to wait for a direct `Ack` before falling back to indirect
    /// probing (spec §4.2 `onPingTimeout`).
    pub ping_timeout: Duration,
    /// Number of helpers recruited for indirect probing, `k` in spec §4.2.
    pub ping_request_group_size: usize,
    /// How long a `Suspect` entry survives before auto-escalating to `Dead`
    /// (spec §4.1).
    pub suspect_timeout: Duration,
    /// Capacity of the dissemination sink (spec §6).
    pub dissemination_capacity: usize,
    /// Maximum gossip events piggybacked per outgoing message (spec §6).
    pub piggyback_batch: usize,
}

impl Default for SwimConfig {
    fn default() -> Self {
        Self {
            port: 7946,
            period_timeout: Duration::from_secs(1),
            ping_timeout: Duration::from_millis(500),
            ping_request_group_size: 3,
            suspect_timeout: Duration::from_secs(5),
            dissemination_capacity: 256,
            piggyback_batch: 8,
        }
    }
}

impl SwimConfig {
    /// Sanity-check the configuration. Never returns an error: an
    /// inconsistent timeout relationship is a misconfiguration worth a
    /// warning, not a reason to refuse to start (spec §8).
    pub fn validate(&self) {
        if self.ping_timeout >= self.period_timeout {
            warn!(
                ping_timeout = ?self.ping_timeout,
                period_timeout = ?self.period_timeout,
                "ping_timeout should be shorter than period_timeout, or probe periods will overlap",
            );
        }
        if self.ping_request_group_size == 0 {
            warn!("ping_request_group_size is 0: indirect probing is effectively disabled");
        }
    }
}
