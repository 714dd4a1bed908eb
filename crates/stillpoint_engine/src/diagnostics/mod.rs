//! Runtime diagnostics
//!
//! Frame-rate monitoring and the snapshot a developer panel or log line
//! reads instead of reaching into subsystems directly.

pub mod performance_monitor;
pub mod snapshot;

pub use performance_monitor::{MonitorReport, PerformanceMonitor, PerformanceTier};
pub use snapshot::DiagnosticsSnapshot;
