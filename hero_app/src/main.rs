//! Headless hero scene
//!
//! Drives the frame-budget core over a scattered pebble garden with an
//! orbiting camera and a drifting particle field, logging a diagnostics line
//! once per simulated interval.
//!
//! Usage: `hero_scene [config.toml|config.ron] [frames]`

mod particles;
mod pebble;

use std::time::Duration;

use stillpoint_engine::assets::{GeometryParams, PebbleGenerator};
use stillpoint_engine::core::config::{Config, StillpointConfig};
use stillpoint_engine::foundation::logging;
use stillpoint_engine::foundation::math::{utils, Vec3};
use stillpoint_engine::foundation::time::Timer;
use stillpoint_engine::render::dynamic::particle_pool_from_config;
use stillpoint_engine::render::Camera;
use stillpoint_engine::scheduler::ScheduledTask;
use stillpoint_engine::{SceneContext, SceneCoordinator};
use thiserror::Error;

use particles::{DustField, PARTICLE_TASK_ID};

// Scene constants
const DEFAULT_FRAMES: u64 = 600;
const PEBBLE_COUNT: usize = 120;
const SCENE_SEED: u64 = 7;
const ORBIT_NEAR: f32 = 8.0;
const ORBIT_FAR: f32 = 70.0;
const ORBIT_SPEED: f32 = 0.15;
const DUST_PER_SECOND: f32 = 40.0;

#[derive(Error, Debug)]
enum HeroError {
    #[error("Invalid frame count '{0}'")]
    InvalidFrameCount(String),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => StillpointConfig::load_from_file(&path)?,
        None => StillpointConfig::default(),
    };
    let frames = match args.next() {
        Some(text) => text.parse::<u64>().map_err(|_| HeroError::InvalidFrameCount(text))?,
        None => DEFAULT_FRAMES,
    };

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting Stillpoint hero scene ({} frames)", frames);

    let result = run(config, frames);
    match &result {
        Ok(()) => log::info!("Hero scene completed successfully"),
        Err(e) => log::error!("Hero scene failed: {}", e),
    }
    result
}

fn run(config: StillpointConfig, frames: u64) -> Result<(), Box<dyn std::error::Error>> {
    let camera = Camera::perspective(Vec3::new(0.0, 4.0, ORBIT_NEAR), 60.0, 16.0 / 9.0, 0.1, 1000.0);
    let mut coordinator = SceneCoordinator::new(config.clone(), camera)?;
    let frame_time = config.scheduler.frame_time();
    let report_every = config.engine.diagnostics_interval_secs.max(0.1);

    let dust_mesh = coordinator
        .context_mut()
        .geometry
        .get_or_generate(&GeometryParams::new(0.05, 8, 6, 0.0, true), &PebbleGenerator);
    coordinator.attach_pool(particle_pool_from_config(Some(dust_mesh), &config.pool));

    pebble::scatter(&mut coordinator, PEBBLE_COUNT, SCENE_SEED)?;

    let mut elapsed = 0.0_f32;
    coordinator.add_task(ScheduledTask::every_frame("camera-orbit", 10, move |context: &mut SceneContext, dt| {
        elapsed += dt;
        let sweep = ((elapsed * ORBIT_SPEED).sin() + 1.0) * 0.5;
        let radius = utils::lerp(ORBIT_NEAR, ORBIT_FAR, sweep);
        let angle = elapsed * ORBIT_SPEED * 2.0;
        context
            .camera
            .set_position(Vec3::new(angle.cos() * radius, 4.0, angle.sin() * radius));
        context.camera.set_target(Vec3::zeros());
        Ok(())
    }))?;

    let mut dust = DustField::new(DUST_PER_SECOND, SCENE_SEED);
    coordinator.add_task(ScheduledTask::new(
        PARTICLE_TASK_ID,
        5,
        Duration::from_millis(16),
        move |context: &mut SceneContext, dt| dust.update(context, dt),
    ))?;

    let mut timer = Timer::new();
    let mut since_report = 0.0_f32;
    for _ in 0..frames {
        timer.update();
        let dt = timer.delta_time();
        let summary = coordinator.tick(dt);
        if summary.budget_exhausted {
            log::debug!("Frame {} deferred {} task(s)", timer.frame_count(), summary.deferred);
        }

        since_report += dt;
        if since_report >= report_every {
            since_report = 0.0;
            log::info!("{}", coordinator.diagnostics());
        }

        let usage_secs = coordinator.scheduler().frame_stats().usage_ms / 1000.0;
        let spent = Duration::try_from_secs_f32(usage_secs).unwrap_or(Duration::ZERO);
        if let Some(rest) = frame_time.checked_sub(spent) {
            std::thread::sleep(rest);
        }
    }

    let snapshot = coordinator.diagnostics();
    log::info!(
        "Ran {} frames in {:.1}s, final tier {}",
        coordinator.frame_count(),
        timer.total_time(),
        snapshot.performance_tier
    );
    for hint in &snapshot.monitor.recommendations {
        log::info!("  {}", hint);
    }

    coordinator.shutdown();
    Ok(())
}
