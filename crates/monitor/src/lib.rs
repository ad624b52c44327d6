//! Observability for the tiered decision pipeline
//!
//! `SystemMonitor` records the tier, latency, outcome and confidence of every
//! decision, keeps rolling statistics and raises deduplicated threshold
//! alerts. Recorded values are also mirrored to the `metrics` facade so any
//! installed exporter sees them.

pub mod alerts;
pub mod monitor;
pub mod summary;
pub mod window;

pub use alerts::{Alert, AlertKind, AlertLog, MAX_ALERT_HISTORY};
pub use monitor::SystemMonitor;
pub use summary::{CacheSummary, MonitorSummary, TierSummary};
pub use window::RollingWindow;
