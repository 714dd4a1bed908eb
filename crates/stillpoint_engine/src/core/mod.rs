//! # Core Engine Module
//!
//! Shared configuration for every subsystem of the frame-budget core.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for scheduler, spatial grid, caches,
//!   pools, performance monitor and adaptive LOD

pub mod config;

pub use config::{
    CacheConfig, EngineSettings, MonitorConfig, PoolConfig, SceneTaskConfig, SchedulerConfig,
    SpatialConfig, StillpointConfig,
};
pub use crate::config::{Config, ConfigError};
