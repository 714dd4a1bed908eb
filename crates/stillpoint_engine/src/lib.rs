//! # Stillpoint Engine
//!
//! Frame-budget core for a mostly static 3D hero scene: a cooperative task
//! scheduler that stays inside a per-frame time budget, frustum culling with
//! distance-based level of detail, a uniform spatial hash, an LRU geometry
//! cache and handle-based object pools, tied together by a scene
//! coordinator.
//!
//! ## Features
//!
//! - **Frame Scheduler**: priority ordered, interval throttled, budget bounded
//! - **Visibility**: frustum culling that fails open, adaptive LOD tiers
//! - **Spatial Hash**: proximity queries over visible object positions
//! - **Caching and Pooling**: shared generated meshes, recycled particles
//! - **Diagnostics**: one snapshot of every subsystem's health
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stillpoint_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StillpointConfig::default();
//!     let camera = Camera::perspective(Vec3::new(0.0, 2.0, 12.0), 75.0, 16.0 / 9.0, 0.1, 1000.0);
//!     let mut coordinator = SceneCoordinator::new(config, camera)?;
//!
//!     coordinator.add_task(ScheduledTask::every_frame("spin", 5, |context: &mut SceneContext, dt| {
//!         context.camera.position.x += dt;
//!         Ok(())
//!     }))?;
//!
//!     for _ in 0..60 {
//!         coordinator.tick(1.0 / 60.0);
//!     }
//!     println!("{}", coordinator.diagnostics());
//!     coordinator.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration
pub mod core;
pub mod config;

pub mod foundation;
pub mod scheduler;
pub mod scene;
pub mod spatial;
pub mod render;
pub mod assets;
pub mod diagnostics;

mod coordinator;

pub use coordinator::{
    CoordinatorError, SceneContext, SceneCoordinator, ScenePassSummary, SCENE_TASK_ID,
};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        CoordinatorError, SceneContext, SceneCoordinator, SCENE_TASK_ID,
        foundation::{
            math::{Vec3, Mat4, Transform},
            time::{Clock, ManualClock, SystemClock, Timer},
        },
        scheduler::{FrameScheduler, ScheduledTask, TaskError, TaskResult, TickSummary},
        scene::{AdaptiveQuality, QualityChange, QualityTier, SceneNode, AABB},
        spatial::{SpatialHashGrid, SpatialQuery},
        render::{Camera, Poolable, PooledNode, ResourcePool},
        assets::{GeometryCache, GeometryParams, MeshData, PebbleGenerator},
        diagnostics::{DiagnosticsSnapshot, PerformanceTier},
        core::config::{Config, StillpointConfig},
    };
}
