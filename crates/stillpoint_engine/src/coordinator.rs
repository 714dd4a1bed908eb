//! Per-tick scene driver
//!
//! The coordinator owns every subsystem of the frame-budget core and lends
//! them to scheduled tasks as one [`SceneContext`]. Its own scene task keeps
//! visibility, the spatial index and per-node quality in step with the
//! camera.

use std::time::Duration;

use thiserror::Error;

use crate::assets::geometry_cache::GeometryCache;
use crate::config::ConfigError;
use crate::core::config::{SceneTaskConfig, StillpointConfig};
use crate::diagnostics::{DiagnosticsSnapshot, PerformanceMonitor};
use crate::foundation::math::Vec3;
use crate::foundation::time::{SharedClock, SystemClock};
use crate::render::dynamic::ParticlePool;
use crate::render::primitives::Camera;
use crate::scene::{
    AdaptiveLodPolicy, NodeKey, QualityChange, SceneGraph, SceneNode, VisibilityCuller,
};
use crate::scheduler::{
    FrameScheduler, ScheduledTask, SchedulerError, TaskError, TaskResult, TickSummary,
};
use crate::spatial::{SpatialError, SpatialHashGrid, SpatialQuery};

/// Id of the coordinator's culling/LOD task
pub const SCENE_TASK_ID: &str = "scene-manager-optimization";

/// Errors raised while building or driving a coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Configuration failed to load or validate
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task registration failed
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Spatial index could not be built
    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),

    /// A node with this id is already in the scene
    #[error("Scene node '{0}' already exists")]
    DuplicateNode(String),
}

/// Outcome of the most recent scene pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenePassSummary {
    /// Nodes inside the frustum (or without bounds)
    pub visible: usize,
    /// Nodes culled
    pub hidden: usize,
    /// Nodes that switched quality tier
    pub quality_changes: usize,
    /// Nodes whose quality switch failed
    pub quality_failures: usize,
}

/// Everything scheduled tasks get to work with
///
/// Lent to every task as `&mut SceneContext` for the duration of its run.
pub struct SceneContext {
    /// Camera driving culling and LOD
    pub camera: Camera,
    /// Registered scene nodes
    pub scene: SceneGraph,
    /// Frustum culler, keyed by node id
    pub culler: VisibilityCuller<String>,
    /// Spatial index of visible node positions
    pub spatial: SpatialHashGrid<String>,
    /// Shared generated meshes
    pub geometry: GeometryCache,
    /// Frame-rate monitor
    pub monitor: PerformanceMonitor,
    /// Distance thresholds per performance tier
    pub policy: AdaptiveLodPolicy,
    /// Attached particle pool
    pub pool: Option<ParticlePool>,
    /// Result of the last scene pass
    pub last_pass: ScenePassSummary,
}

/// Owns the scheduler and the scene context it drives
pub struct SceneCoordinator {
    scheduler: FrameScheduler<SceneContext>,
    context: SceneContext,
    config: StillpointConfig,
    frames: u64,
}

impl SceneCoordinator {
    /// Build a coordinator on the system clock
    pub fn new(config: StillpointConfig, camera: Camera) -> Result<Self, CoordinatorError> {
        Self::with_clock(config, camera, SystemClock::shared())
    }

    /// Build a coordinator reading time from `clock`
    ///
    /// Validates the configuration, builds every subsystem and registers
    /// the scene task.
    pub fn with_clock(
        config: StillpointConfig,
        camera: Camera,
        clock: SharedClock,
    ) -> Result<Self, CoordinatorError> {
        log::info!("Initializing scene coordinator...");
        config.validate()?;

        let context = SceneContext {
            camera,
            scene: SceneGraph::new(),
            culler: VisibilityCuller::new(),
            spatial: SpatialHashGrid::new(config.spatial.cell_size)?,
            geometry: GeometryCache::new(config.cache.geometry_capacity),
            monitor: PerformanceMonitor::new(config.monitor.clone(), clock.clone()),
            policy: config.lod_policy.clone(),
            pool: None,
            last_pass: ScenePassSummary::default(),
        };

        let mut scheduler = FrameScheduler::new(config.scheduler.clone(), clock);
        scheduler.add_task(scene_task(&config.scene_task))?;

        log::info!(
            "Scene coordinator ready: {:.2}ms budget, grid cell {}, cache capacity {}",
            config.scheduler.budget_ms(),
            config.spatial.cell_size,
            config.cache.geometry_capacity
        );
        Ok(Self {
            scheduler,
            context,
            config,
            frames: 0,
        })
    }

    /// Advance one frame
    ///
    /// Records the frame with the performance monitor, then runs the due
    /// tasks within the frame budget.
    pub fn tick(&mut self, delta_time: f32) -> TickSummary {
        self.frames += 1;
        self.context.monitor.record_frame();
        self.scheduler.update(&mut self.context, delta_time)
    }

    /// Frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Configuration the coordinator was built from
    pub fn config(&self) -> &StillpointConfig {
        &self.config
    }

    /// Add a node; ids must be unique
    pub fn add_node(&mut self, node: Box<dyn SceneNode>) -> Result<NodeKey, CoordinatorError> {
        let id = node.id().to_string();
        let transform = node.world_transform();
        let bounds = node.local_bounds();
        let Ok(key) = self.context.scene.insert(node) else {
            return Err(CoordinatorError::DuplicateNode(id));
        };

        log::trace!("Added scene node '{}'", id);
        self.context.culler.add_object(id, transform, bounds);
        Ok(key)
    }

    /// Remove a node and forget it in the culler and spatial index
    pub fn remove_node(&mut self, id: &str) -> Option<Box<dyn SceneNode>> {
        let node = self.context.scene.remove(id)?;
        self.context.culler.remove_object(id);
        self.context.spatial.remove(id);
        log::trace!("Removed scene node '{}'", id);
        Some(node)
    }

    /// Node by id
    pub fn node(&self, id: &str) -> Option<&dyn SceneNode> {
        self.context.scene.get(id)
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: &str) -> Option<&mut dyn SceneNode> {
        self.context.scene.get_mut(id)
    }

    /// Number of scene nodes
    pub fn node_count(&self) -> usize {
        self.context.scene.len()
    }

    /// Camera driving culling and LOD
    pub fn camera(&self) -> &Camera {
        &self.context.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.context.camera
    }

    /// Scheduler, for inspection
    pub fn scheduler(&self) -> &FrameScheduler<SceneContext> {
        &self.scheduler
    }

    /// Scheduler, to register or tune tasks
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<SceneContext> {
        &mut self.scheduler
    }

    /// Register a host task
    pub fn add_task(&mut self, task: ScheduledTask<SceneContext>) -> Result<(), CoordinatorError> {
        self.scheduler.add_task(task)?;
        Ok(())
    }

    /// Unregister a task; returns whether it existed
    pub fn remove_task(&mut self, id: &str) -> bool {
        self.scheduler.remove_task(id)
    }

    /// Shared scene state
    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    /// Mutable scene state
    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.context
    }

    /// Attach a particle pool, returning the one it replaces
    pub fn attach_pool(&mut self, pool: ParticlePool) -> Option<ParticlePool> {
        self.context.pool.replace(pool)
    }

    /// Attached particle pool
    pub fn pool(&self) -> Option<&ParticlePool> {
        self.context.pool.as_ref()
    }

    /// Mutable attached particle pool
    pub fn pool_mut(&mut self) -> Option<&mut ParticlePool> {
        self.context.pool.as_mut()
    }

    /// Roll-up of every subsystem's health
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        let context = &self.context;
        DiagnosticsSnapshot {
            frame: self.scheduler.frame_stats(),
            task_count: self.scheduler.task_count(),
            node_count: context.scene.len(),
            performance_tier: context.monitor.performance_tier(),
            spatial: context.spatial.stats(),
            culling: context.culler.stats(),
            pool: context.pool.as_ref().map(ParticlePool::stats),
            cache: context.geometry.stats(),
            monitor: context.monitor.report(),
        }
    }

    /// Tear down the scene machinery
    ///
    /// Removes the scene task, releases every pooled object and clears the
    /// culler, spatial index and geometry cache. Nodes and host tasks stay.
    pub fn shutdown(&mut self) {
        log::info!("Shutting down scene coordinator...");
        self.scheduler.remove_task(SCENE_TASK_ID);
        if let Some(pool) = self.context.pool.as_mut() {
            pool.release_all();
        }
        self.context.culler.clear();
        self.context.spatial.clear();
        self.context.geometry.clear();
        self.context.last_pass = ScenePassSummary::default();
        log::info!("Scene coordinator shutdown complete");
    }
}

fn scene_task(config: &SceneTaskConfig) -> ScheduledTask<SceneContext> {
    ScheduledTask::new(
        SCENE_TASK_ID,
        config.priority,
        Duration::from_millis(config.interval_ms),
        |context: &mut SceneContext, _delta_time| run_scene_pass(context),
    )
}

/// Cull, re-index visible nodes and adapt node quality
fn run_scene_pass(context: &mut SceneContext) -> TaskResult {
    context.culler.update_camera(&context.camera);
    for (_, node) in context.scene.iter() {
        context.culler.set_object_transform(node.id(), node.world_transform());
        context.culler.update_object_bounds(node.id(), node.local_bounds());
    }

    let culled = context.culler.cull_objects();
    let visible: Vec<(String, Vec3)> = culled
        .visible
        .iter()
        .filter_map(|id| context.scene.get(id).map(|node| (id.clone(), node.position())))
        .collect();
    reindex(&mut context.spatial, visible);

    let mut summary = ScenePassSummary {
        visible: culled.visible.len(),
        hidden: culled.hidden.len(),
        ..ScenePassSummary::default()
    };

    let performance = context.monitor.performance_tier();
    let camera_position = context.camera.position;
    let mut failed = Vec::new();
    for (_, node) in context.scene.iter_mut() {
        if node.as_adaptive().is_none() {
            continue;
        }
        let id = node.id().to_string();
        let distance = (node.position() - camera_position).norm();
        let Some(adaptive) = node.as_adaptive_mut() else {
            continue;
        };

        let previous = adaptive.quality();
        let tier = context.policy.target_tier(performance, distance);
        if tier == previous {
            continue;
        }

        let change = QualityChange {
            previous,
            tier,
            distance,
            performance,
        };
        match adaptive.apply_quality(&change, &mut context.geometry) {
            Ok(()) => {
                log::trace!("Node '{}' quality {} -> {} at {:.1}", id, previous, tier, distance);
                summary.quality_changes += 1;
            }
            Err(err) => {
                log::warn!("Node '{}' failed to switch to {} quality: {}", id, tier, err);
                failed.push(id);
            }
        }
    }
    summary.quality_failures = failed.len();

    log::debug!(
        "Scene pass: {} visible, {} hidden, {} quality change(s) ({} performance)",
        summary.visible,
        summary.hidden,
        summary.quality_changes,
        performance
    );
    context.last_pass = summary;

    if failed.is_empty() {
        Ok(())
    } else {
        Err(TaskError::failed(format!(
            "quality change failed for {}",
            failed.join(", ")
        )))
    }
}

/// Replace an index's contents with `entries`
fn reindex<S>(index: &mut S, entries: Vec<(String, Vec3)>)
where
    S: SpatialQuery<String> + ?Sized,
{
    index.clear();
    for (id, position) in entries {
        index.insert(id, position);
    }
}
