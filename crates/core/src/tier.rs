//! Decision tiers of the classification pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage that produced an intention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionTier {
    /// Deterministic rules
    Rule,
    /// Learned classifier
    Ml,
    /// Generalist fallback service
    Fallback,
    /// Cache short-circuit
    Cache,
}

impl DecisionTier {
    pub const ALL: [DecisionTier; 4] = [Self::Rule, Self::Ml, Self::Fallback, Self::Cache];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Ml => "ml",
            Self::Fallback => "fallback",
            Self::Cache => "cache",
        }
    }

    /// Position in per-tier tables
    pub fn index(&self) -> usize {
        match self {
            Self::Rule => 0,
            Self::Ml => 1,
            Self::Fallback => 2,
            Self::Cache => 3,
        }
    }
}

impl fmt::Display for DecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache layer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEvent {
    Hit,
    Miss,
    Eviction,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Eviction => "eviction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_indices_are_distinct() {
        let mut seen = [false; 4];
        for tier in DecisionTier::ALL {
            assert!(!seen[tier.index()]);
            seen[tier.index()] = true;
        }
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&DecisionTier::Ml).unwrap(), "\"ML\"");
        let tier: DecisionTier = serde_json::from_str("\"FALLBACK\"").unwrap();
        assert_eq!(tier, DecisionTier::Fallback);
        assert_eq!(DecisionTier::Cache.to_string(), "cache");
    }

    #[test]
    fn test_cache_event_serialization() {
        assert_eq!(serde_json::to_string(&CacheEvent::Eviction).unwrap(), "\"eviction\"");
    }
}
