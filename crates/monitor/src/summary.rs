//! Monitor snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;

use collections_flow_core::DecisionTier;

use crate::alerts::Alert;

/// Per-tier statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub tier: DecisionTier,
    pub hits: u64,
    /// Share of all requests, in percent
    pub usage_pct: f64,
    pub avg_response_time_ms: f64,
    /// Mean success signal for the rule tier, mean confidence for ML and
    /// fallback; always 0 for the cache tier
    pub avg_success: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSummary {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: u64,
    pub hit_rate: f64,
}

/// Consistent snapshot taken under the monitor lock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSummary {
    pub total_requests: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub avg_response_time_ms: f64,
    pub tiers: Vec<TierSummary>,
    pub cache: CacheSummary,
    pub recent_alerts: Vec<Alert>,
    pub timestamp: DateTime<Utc>,
}

impl MonitorSummary {
    pub fn tier(&self, tier: DecisionTier) -> Option<&TierSummary> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}
