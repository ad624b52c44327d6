//! Alerts and the alert log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Alerts older than this are dropped from the log
pub const MAX_ALERT_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    HighResponseTime,
    HighErrorRate,
    LowMlConfidence,
    LowCacheHitRate,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighResponseTime => "HIGH_RESPONSE_TIME",
            Self::HighErrorRate => "HIGH_ERROR_RATE",
            Self::LowMlConfidence => "LOW_ML_CONFIDENCE",
            Self::LowCacheHitRate => "LOW_CACHE_HIT_RATE",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only alert history with recency-based deduplication
#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    dedup_window: usize,
}

impl AlertLog {
    pub fn new(dedup_window: usize) -> Self {
        Self {
            alerts: VecDeque::new(),
            dedup_window,
        }
    }

    /// True when an alert of `kind` is among the last `dedup_window` alerts
    pub fn is_recent(&self, kind: AlertKind) -> bool {
        self.alerts
            .iter()
            .rev()
            .take(self.dedup_window)
            .any(|a| a.kind == kind)
    }

    /// Append unless suppressed; returns the alert when it was recorded
    pub fn raise(&mut self, kind: AlertKind, message: String) -> Option<Alert> {
        if self.is_recent(kind) {
            return None;
        }
        let alert = Alert::new(kind, message);
        if self.alerts.len() == MAX_ALERT_HISTORY {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert.clone());
        Some(alert)
    }

    /// Last `n` alerts, oldest first
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        let skip = self.alerts.len().saturating_sub(n);
        self.alerts.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}
