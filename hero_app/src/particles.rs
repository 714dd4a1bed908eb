//! Dust particles drifting over the garden
//!
//! Particles are checked out of the coordinator's pool, rise for a few
//! seconds and are handed back.

use rand::prelude::*;
use stillpoint_engine::foundation::math::Vec3;
use stillpoint_engine::render::{PoolHandle, Poolable};
use stillpoint_engine::scheduler::{TaskError, TaskResult};
use stillpoint_engine::SceneContext;

/// Id of the particle task
pub const PARTICLE_TASK_ID: &str = "dust-particles";

/// Spawns, moves and retires pooled particles
pub struct DustField {
    live: Vec<(PoolHandle, f32)>,
    spawn_per_second: f32,
    spawn_debt: f32,
    rng: StdRng,
}

impl DustField {
    /// Create a field spawning `spawn_per_second` particles
    pub fn new(spawn_per_second: f32, seed: u64) -> Self {
        Self {
            live: Vec::new(),
            spawn_per_second,
            spawn_debt: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advance the field by `dt` seconds
    pub fn update(&mut self, context: &mut SceneContext, dt: f32) -> TaskResult {
        let pool = context
            .pool
            .as_mut()
            .ok_or_else(|| TaskError::Unavailable("no particle pool attached".to_string()))?;

        let mut expired = Vec::new();
        self.live.retain(|&(handle, lifetime)| {
            let Some(particle) = pool.get_mut(handle) else {
                return false;
            };
            if particle.age + dt >= lifetime {
                expired.push(handle);
                return false;
            }
            particle.advance(dt);
            true
        });
        for handle in expired {
            pool.release(handle);
        }

        self.spawn_debt += self.spawn_per_second * dt;
        while self.spawn_debt >= 1.0 {
            self.spawn_debt -= 1.0;
            let handle = pool.acquire();
            if let Some(particle) = pool.get_mut(handle) {
                particle.transform_mut().position = Vec3::new(
                    self.rng.gen_range(-30.0..30.0),
                    self.rng.gen_range(0.0..0.5),
                    self.rng.gen_range(-30.0..30.0),
                );
                particle.velocity = Vec3::new(
                    self.rng.gen_range(-0.2..0.2),
                    self.rng.gen_range(0.3..0.8),
                    self.rng.gen_range(-0.2..0.2),
                );
            }
            self.live.push((handle, self.rng.gen_range(2.0..6.0)));
        }

        log::trace!("{} dust particle(s) alive", self.live.len());
        Ok(())
    }
}
