//! System monitor
//!
//! Every counter, window and the alert log sit behind one mutex so a
//! recorded request, the alert decision it triggers and any concurrent
//! summary all see the same state. Work under the lock is bounded by the
//! window capacity. Metric export and logging happen after it is released.

use chrono::Utc;
use parking_lot::Mutex;

use collections_flow_config::MonitorConfig;
use collections_flow_core::{CacheEvent, DecisionTier};

use crate::alerts::{Alert, AlertKind, AlertLog};
use crate::summary::{CacheSummary, MonitorSummary, TierSummary};
use crate::window::RollingWindow;

#[derive(Debug)]
struct TierStats {
    hits: u64,
    response_times: RollingWindow,
    success: RollingWindow,
}

impl TierStats {
    fn new(capacity: usize) -> Self {
        Self {
            hits: 0,
            response_times: RollingWindow::new(capacity),
            success: RollingWindow::new(capacity),
        }
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
    size: u64,
}

impl CacheCounters {
    fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    total_requests: u64,
    errors: u64,
    tiers: [TierStats; 4],
    response_times: RollingWindow,
    cache: CacheCounters,
    alerts: AlertLog,
}

impl MonitorState {
    fn new(config: &MonitorConfig) -> Self {
        let cap = config.window_capacity;
        Self {
            total_requests: 0,
            errors: 0,
            tiers: [
                TierStats::new(cap),
                TierStats::new(cap),
                TierStats::new(cap),
                TierStats::new(cap),
            ],
            response_times: RollingWindow::new(cap),
            cache: CacheCounters::default(),
            alerts: AlertLog::new(config.alert_dedup_window),
        }
    }

    fn error_rate(&self) -> f64 {
        self.errors as f64 / self.total_requests.max(1) as f64
    }

    /// Check thresholds and append any new alerts
    fn evaluate_alerts(&mut self, config: &MonitorConfig) -> Vec<Alert> {
        let mut raised = Vec::new();

        if let Some(mean) = self.response_times.mean() {
            if mean > config.high_response_time_ms {
                raised.extend(self.alerts.raise(
                    AlertKind::HighResponseTime,
                    format!(
                        "Average response time {:.1} ms exceeds {:.0} ms",
                        mean, config.high_response_time_ms
                    ),
                ));
            }
        }

        if self.total_requests > config.min_requests_for_error_rate {
            let rate = self.error_rate();
            if rate > config.high_error_rate {
                raised.extend(self.alerts.raise(
                    AlertKind::HighErrorRate,
                    format!(
                        "Error rate {:.1}% exceeds {:.1}%",
                        rate * 100.0,
                        config.high_error_rate * 100.0
                    ),
                ));
            }
        }

        if let Some(mean) = self.tiers[DecisionTier::Ml.index()].success.mean() {
            if mean < config.low_ml_confidence {
                raised.extend(self.alerts.raise(
                    AlertKind::LowMlConfidence,
                    format!(
                        "Average ML confidence {:.2} below {:.2}",
                        mean, config.low_ml_confidence
                    ),
                ));
            }
        }

        if self.cache.lookups() > config.min_cache_samples {
            let rate = self.cache.hit_rate();
            if rate < config.low_cache_hit_rate {
                raised.extend(self.alerts.raise(
                    AlertKind::LowCacheHitRate,
                    format!(
                        "Cache hit rate {:.1}% below {:.1}%",
                        rate * 100.0,
                        config.low_cache_hit_rate * 100.0
                    ),
                ));
            }
        }

        raised
    }
}

/// Thread-safe monitor for the tiered decision pipeline
///
/// Construct once and share as `Arc<SystemMonitor>`.
#[derive(Debug)]
pub struct SystemMonitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

impl SystemMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let state = Mutex::new(MonitorState::new(&config));
        Self { config, state }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Record one pipeline decision
    ///
    /// Never fails: non-finite or negative times count as 0 and confidence
    /// is clamped to [0, 1].
    pub fn record_request(
        &self,
        tier: DecisionTier,
        response_time_ms: f64,
        success: bool,
        confidence: f64,
    ) {
        let response_time_ms = sanitize_time(response_time_ms);
        let confidence = sanitize_confidence(confidence);

        let raised = {
            let mut state = self.state.lock();

            state.total_requests += 1;
            if !success {
                state.errors += 1;
            }

            let stats = &mut state.tiers[tier.index()];
            stats.hits += 1;
            stats.response_times.push(response_time_ms);
            match tier {
                DecisionTier::Rule => stats.success.push(if success { 1.0 } else { 0.0 }),
                DecisionTier::Ml | DecisionTier::Fallback => stats.success.push(confidence),
                DecisionTier::Cache => {}
            }

            state.response_times.push(response_time_ms);
            state.evaluate_alerts(&self.config)
        };

        metrics::counter!("flow_requests_total", "tier" => tier.as_str()).increment(1);
        if !success {
            metrics::counter!("flow_request_errors_total", "tier" => tier.as_str()).increment(1);
        }
        metrics::histogram!("flow_response_time_ms", "tier" => tier.as_str())
            .record(response_time_ms);

        for alert in raised {
            metrics::counter!("flow_alerts_total", "kind" => alert.kind.as_str()).increment(1);
            tracing::warn!(
                alert = %alert.kind,
                message = %alert.message,
                "Monitor alert raised"
            );
        }
    }

    pub fn record_cache_event(&self, event: CacheEvent) {
        {
            let mut state = self.state.lock();
            match event {
                CacheEvent::Hit => state.cache.hits += 1,
                CacheEvent::Miss => state.cache.misses += 1,
                CacheEvent::Eviction => state.cache.evictions += 1,
            }
        }
        metrics::counter!("flow_cache_events_total", "kind" => event.as_str()).increment(1);
    }

    pub fn update_cache_size(&self, size: u64) {
        self.state.lock().cache.size = size;
        metrics::gauge!("flow_cache_size").set(size as f64);
    }

    /// Snapshot of all statistics
    pub fn get_summary(&self) -> MonitorSummary {
        let state = self.state.lock();
        let total = state.total_requests.max(1) as f64;

        let tiers = DecisionTier::ALL
            .iter()
            .map(|tier| {
                let stats = &state.tiers[tier.index()];
                TierSummary {
                    tier: *tier,
                    hits: stats.hits,
                    usage_pct: stats.hits as f64 / total * 100.0,
                    avg_response_time_ms: stats.response_times.mean_or_zero(),
                    avg_success: stats.success.mean_or_zero(),
                }
            })
            .collect();

        MonitorSummary {
            total_requests: state.total_requests,
            error_count: state.errors,
            error_rate: state.error_rate(),
            avg_response_time_ms: state.response_times.mean_or_zero(),
            tiers,
            cache: CacheSummary {
                hits: state.cache.hits,
                misses: state.cache.misses,
                evictions: state.cache.evictions,
                size: state.cache.size,
                hit_rate: state.cache.hit_rate(),
            },
            recent_alerts: state.alerts.recent(self.config.recent_alerts),
            timestamp: Utc::now(),
        }
    }

    /// Clear every counter, window and alert
    pub fn reset_metrics(&self) {
        *self.state.lock() = MonitorState::new(&self.config);
        tracing::debug!("Monitor metrics reset");
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

fn sanitize_time(ms: f64) -> f64 {
    if ms.is_finite() && ms > 0.0 {
        ms
    } else {
        0.0
    }
}

fn sanitize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
