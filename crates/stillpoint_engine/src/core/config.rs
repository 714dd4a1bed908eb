//! # Unified Configuration System
//!
//! Construction-time settings for the frame-budget core. Nothing here is
//! reconfigured at runtime; a coordinator is built from one
//! [`StillpointConfig`] and keeps it for its lifetime.
//!
//! ## Configuration Categories
//!
//! - **Engine Settings**: logging and diagnostics cadence
//! - **Scheduler Config**: frame target, budget fraction, starvation guard
//! - **Spatial / Cache / Pool Config**: sizing of the supporting containers
//! - **Monitor Config**: FPS sampling and performance tier thresholds
//! - **Adaptive LOD Policy**: distance thresholds per performance tier

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::config::{Config, ConfigError};
use crate::scene::lod::AdaptiveLodPolicy;

/// # Engine Settings
///
/// Process-level behaviour: logging and how often diagnostics are reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
    /// Seconds between diagnostics snapshots in the host loop
    pub diagnostics_interval_secs: f32,
}

impl EngineSettings {
    /// Create engine settings with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            diagnostics_interval_secs: 1.0,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// # Scheduler Configuration
///
/// The per-tick budget is `target_frame_time_ms * max_frame_budget_fraction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Target frame duration in milliseconds (60 Hz by default)
    pub target_frame_time_ms: f32,
    /// Share of the frame available to scheduled tasks
    pub max_frame_budget_fraction: f32,
    /// Consecutive budget cut-offs after which a due task is run first on
    /// the next tick; `None` disables promotion
    pub starvation_threshold: Option<u32>,
}

impl SchedulerConfig {
    /// Default target frame time (60 fps)
    pub const DEFAULT_FRAME_TIME_MS: f32 = 16.67;
    /// Default budget fraction
    pub const DEFAULT_BUDGET_FRACTION: f32 = 0.8;
    /// Default starvation threshold in ticks
    pub const DEFAULT_STARVATION_THRESHOLD: u32 = 30;
    /// Longest accepted target frame time (one minute)
    pub const MAX_FRAME_TIME_MS: f32 = 60_000.0;

    /// Create a scheduler configuration with defaults
    pub fn new() -> Self {
        Self {
            target_frame_time_ms: Self::DEFAULT_FRAME_TIME_MS,
            max_frame_budget_fraction: Self::DEFAULT_BUDGET_FRACTION,
            starvation_threshold: Some(Self::DEFAULT_STARVATION_THRESHOLD),
        }
    }

    /// Set target frame time
    pub fn with_frame_time_ms(mut self, frame_time_ms: f32) -> Self {
        self.target_frame_time_ms = frame_time_ms;
        self
    }

    /// Set budget fraction
    pub fn with_budget_fraction(mut self, fraction: f32) -> Self {
        self.max_frame_budget_fraction = fraction;
        self
    }

    /// Set or disable the starvation threshold
    pub fn with_starvation_threshold(mut self, threshold: Option<u32>) -> Self {
        self.starvation_threshold = threshold;
        self
    }

    /// Budget in milliseconds
    pub fn budget_ms(&self) -> f32 {
        self.target_frame_time_ms * self.max_frame_budget_fraction
    }

    /// Budget as a duration
    ///
    /// Saturates instead of panicking: a budget too large to represent is
    /// `Duration::MAX`, a negative or NaN one is zero.
    pub fn budget(&self) -> Duration {
        let secs = self.budget_ms() / 1000.0;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
    }

    /// Target frame time as a duration, saturating like [`budget`]
    ///
    /// [`budget`]: SchedulerConfig::budget
    pub fn frame_time(&self) -> Duration {
        let secs = self.target_frame_time_ms / 1000.0;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_frame_time_ms.is_finite() || self.target_frame_time_ms <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "target frame time must be positive, got {}",
                self.target_frame_time_ms
            )));
        }
        if self.target_frame_time_ms > Self::MAX_FRAME_TIME_MS {
            return Err(ConfigError::Invalid(format!(
                "target frame time must be at most {}ms, got {}",
                Self::MAX_FRAME_TIME_MS,
                self.target_frame_time_ms
            )));
        }
        if !(self.max_frame_budget_fraction > 0.0 && self.max_frame_budget_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "frame budget fraction must be in (0, 1], got {}",
                self.max_frame_budget_fraction
            )));
        }
        if self.starvation_threshold == Some(0) {
            return Err(ConfigError::Invalid(
                "starvation threshold must be at least 1 tick".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Spatial Grid Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Edge length of one grid cell in world units
    pub cell_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { cell_size: 50.0 }
    }
}

/// # Cache Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of generated meshes kept by the geometry cache
    pub geometry_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            geometry_capacity: 50,
        }
    }
}

/// # Pool Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Free-list ceiling for general scene node pools
    pub max_size: usize,
    /// Free-list ceiling for particle pools
    pub particle_max_size: usize,
    /// Objects created ahead of demand when a pool is built
    pub preallocate: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            particle_max_size: 5000,
            preallocate: 0,
        }
    }
}

/// # Performance Monitor Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Minimum time between FPS samples
    pub sample_window_ms: u64,
    /// Number of FPS samples kept for the rolling average
    pub history_length: usize,
    /// Rolling average below this is the low tier
    pub low_fps_threshold: f32,
    /// Rolling average above this is the high tier
    pub high_fps_threshold: f32,
}

impl MonitorConfig {
    /// Sampling window as a duration
    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_window_ms == 0 {
            return Err(ConfigError::Invalid("sample window must be non-zero".to_string()));
        }
        if self.history_length == 0 {
            return Err(ConfigError::Invalid("FPS history must hold at least one sample".to_string()));
        }
        if self.low_fps_threshold > self.high_fps_threshold {
            return Err(ConfigError::Invalid(format!(
                "low FPS threshold {} exceeds high threshold {}",
                self.low_fps_threshold, self.high_fps_threshold
            )));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_window_ms: 1000,
            history_length: 60,
            low_fps_threshold: 45.0,
            high_fps_threshold: 55.0,
        }
    }
}

/// # Scene Task Configuration
///
/// Registration parameters of the coordinator's own culling/LOD task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTaskConfig {
    /// Scheduler priority (higher runs first)
    pub priority: i32,
    /// Minimum milliseconds between runs
    pub interval_ms: u64,
}

impl Default for SceneTaskConfig {
    fn default() -> Self {
        Self {
            priority: 8,
            interval_ms: 100,
        }
    }
}

/// # Complete Configuration
///
/// Top-level configuration that encompasses all subsystems. This is what a
/// host loads from disk and hands to the coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StillpointConfig {
    /// Process-level settings
    pub engine: EngineSettings,
    /// Frame scheduler
    pub scheduler: SchedulerConfig,
    /// Spatial hash grid
    pub spatial: SpatialConfig,
    /// Geometry cache
    pub cache: CacheConfig,
    /// Object pools
    pub pool: PoolConfig,
    /// Performance monitor
    pub monitor: MonitorConfig,
    /// Coordinator scene task
    pub scene_task: SceneTaskConfig,
    /// LOD thresholds per performance tier
    pub lod_policy: AdaptiveLodPolicy,
}

impl StillpointConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.monitor.validate()?;
        if !self.spatial.cell_size.is_finite() || self.spatial.cell_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "spatial cell size must be positive, got {}",
                self.spatial.cell_size
            )));
        }
        self.lod_policy.validate()?;
        Ok(())
    }
}

impl Config for StillpointConfig {}
