//! Frame-rate sampling and performance tiers
//!
//! The monitor counts frames and, once per sample window, turns the count
//! into an FPS sample. A rolling history of samples drives the performance
//! tier that adaptive quality reacts to.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::core::config::MonitorConfig;
use crate::foundation::time::SharedClock;

/// Frame rate assumed before the first sample
const INITIAL_FPS: f32 = 60.0;

/// Samples needed before stability is measured
const MIN_STABILITY_SAMPLES: usize = 10;

/// Standard deviation (in FPS) at which stability reaches zero
const MAX_ACCEPTABLE_DEVIATION: f32 = 10.0;

/// Coarse frame-rate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceTier {
    /// Average FPS below the low threshold
    Low,
    /// Between the thresholds
    Medium,
    /// Average FPS above the high threshold
    High,
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// Everything the monitor knows, in one value
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    /// Latest sample, rounded
    pub current_fps: u32,
    /// Rolling average, rounded
    pub average_fps: u32,
    /// Lowest sample in the history, rounded
    pub min_fps: u32,
    /// Highest sample in the history, rounded
    pub max_fps: u32,
    /// Tier derived from the average
    pub tier: PerformanceTier,
    /// `0.0` (erratic) to `1.0` (steady)
    pub stability: f32,
    /// Human-readable hints
    pub recommendations: Vec<String>,
}

/// Rolling FPS monitor
pub struct PerformanceMonitor {
    config: MonitorConfig,
    clock: SharedClock,
    frame_count: u32,
    window_start: Duration,
    fps: f32,
    history: VecDeque<f32>,
}

impl PerformanceMonitor {
    /// Create a monitor; the first sample window starts now
    pub fn new(config: MonitorConfig, clock: SharedClock) -> Self {
        let window_start = clock.now();
        let history = VecDeque::with_capacity(config.history_length);
        Self {
            config,
            clock,
            frame_count: 0,
            window_start,
            fps: INITIAL_FPS,
            history,
        }
    }

    /// Count one frame; returns the new FPS sample when a window closed
    pub fn record_frame(&mut self) -> Option<f32> {
        self.frame_count += 1;
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.window_start);
        if elapsed < self.config.sample_window() {
            return None;
        }

        self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.history.push_back(self.fps);
        while self.history.len() > self.config.history_length {
            self.history.pop_front();
        }
        self.frame_count = 0;
        self.window_start = now;

        log::debug!(
            "FPS sample {:.1} (average {}, tier {})",
            self.fps,
            self.average_fps(),
            self.performance_tier()
        );
        Some(self.fps)
    }

    /// Latest sample, rounded
    pub fn fps(&self) -> u32 {
        round_fps(self.fps)
    }

    /// Rolling average, rounded; the latest sample when there is no history
    pub fn average_fps(&self) -> u32 {
        round_fps(self.mean())
    }

    /// Lowest sample in the history, rounded
    pub fn min_fps(&self) -> u32 {
        round_fps(self.history.iter().copied().reduce(f32::min).unwrap_or(self.fps))
    }

    /// Highest sample in the history, rounded
    pub fn max_fps(&self) -> u32 {
        round_fps(self.history.iter().copied().reduce(f32::max).unwrap_or(self.fps))
    }

    /// Samples currently held
    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    /// Tier of the rolling average
    pub fn performance_tier(&self) -> PerformanceTier {
        let average = self.average_fps() as f32;
        if average < self.config.low_fps_threshold {
            PerformanceTier::Low
        } else if average > self.config.high_fps_threshold {
            PerformanceTier::High
        } else {
            PerformanceTier::Medium
        }
    }

    /// `max(0, 1 - stddev / 10)`; 1.0 until ten samples exist
    pub fn stability_score(&self) -> f32 {
        if self.history.len() < MIN_STABILITY_SAMPLES {
            return 1.0;
        }
        let average = self.average_fps() as f32;
        let variance = self
            .history
            .iter()
            .map(|fps| (fps - average).powi(2))
            .sum::<f32>()
            / self.history.len() as f32;
        (1.0 - variance.sqrt() / MAX_ACCEPTABLE_DEVIATION).max(0.0)
    }

    /// Hints for the current state
    pub fn recommendations(&self) -> Vec<String> {
        let mut recommendations = Vec::new();
        if self.performance_tier() == PerformanceTier::Low {
            recommendations.push("Consider reducing particle count or 3D quality settings".to_string());
            recommendations.push("Check for excessive object creation; pool short-lived objects".to_string());
        }
        if self.stability_score() < 0.7 {
            recommendations.push("Frame rate is unstable - check for blocking operations".to_string());
            recommendations.push("Lower the scheduler frame budget or spread work over intervals".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("Performance is optimal".to_string());
        }
        recommendations
    }

    /// Everything above in one value
    pub fn report(&self) -> MonitorReport {
        MonitorReport {
            current_fps: self.fps(),
            average_fps: self.average_fps(),
            min_fps: self.min_fps(),
            max_fps: self.max_fps(),
            tier: self.performance_tier(),
            stability: self.stability_score(),
            recommendations: self.recommendations(),
        }
    }

    /// Forget all samples and restart the window
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.window_start = self.clock.now();
        self.fps = INITIAL_FPS;
        self.history.clear();
    }

    fn mean(&self) -> f32 {
        if self.history.is_empty() {
            return self.fps;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("config", &self.config)
            .field("fps", &self.fps)
            .field("samples", &self.history.len())
            .finish_non_exhaustive()
    }
}

fn round_fps(fps: f32) -> u32 {
    if fps.is_finite() && fps > 0.0 {
        fps.round() as u32
    } else {
        0
    }
}
