//! Read-only roll-up of subsystem health

use std::fmt;

use super::performance_monitor::{MonitorReport, PerformanceTier};
use crate::assets::geometry_cache::CacheStats;
use crate::render::dynamic::PoolStats;
use crate::scene::culling::CullingStats;
use crate::scheduler::FrameStats;
use crate::spatial::SpatialStats;

/// Point-in-time view of every subsystem the coordinator owns
///
/// Values are copies; holding a snapshot never borrows the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
    /// Scheduler budget accounting for the last tick
    pub frame: FrameStats,
    /// Enabled scheduler tasks
    pub task_count: usize,
    /// Scene nodes registered with the coordinator
    pub node_count: usize,
    /// Current performance tier
    pub performance_tier: PerformanceTier,
    /// Spatial index occupancy (visible nodes only)
    pub spatial: SpatialStats,
    /// Visibility counts
    pub culling: CullingStats,
    /// Attached object pool, if any
    pub pool: Option<PoolStats>,
    /// Geometry cache counters
    pub cache: CacheStats,
    /// Frame-rate monitor
    pub monitor: MonitorReport,
}

impl fmt::Display for DiagnosticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fps {} (avg {}, {} tier) | budget {:.2}/{:.2}ms ({:.0}% free) | tasks {} | nodes {} visible {}/{} | grid {} in {} cells | cache {}/{} hit {:.0}%",
            self.monitor.current_fps,
            self.monitor.average_fps,
            self.performance_tier,
            self.frame.usage_ms,
            self.frame.budget_ms,
            self.frame.efficiency * 100.0,
            self.task_count,
            self.node_count,
            self.culling.visible_count,
            self.culling.total_objects,
            self.spatial.total_objects,
            self.spatial.total_cells,
            self.cache.entries,
            self.cache.capacity,
            self.cache.hit_rate * 100.0,
        )?;
        if let Some(pool) = &self.pool {
            write!(f, " | pool {} active, {} parked", pool.active_count, pool.pool_size)?;
        }
        Ok(())
    }
}
