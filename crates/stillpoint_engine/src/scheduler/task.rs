//! Scheduled task records

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Outcome of one task invocation
pub type TaskResult = Result<(), TaskError>;

/// Boxed per-frame callback; receives the shared context and the frame delta
/// in seconds
pub type TaskCallback<C> = Box<dyn FnMut(&mut C, f32) -> TaskResult>;

/// Error reported by a task callback
///
/// The scheduler logs these and carries on with the remaining tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task could not complete its work this tick
    #[error("task failed: {0}")]
    Failed(String),

    /// Something the task depends on is not available yet
    #[error("task dependency unavailable: {0}")]
    Unavailable(String),
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Failed`]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// A per-frame callback registered with the [`FrameScheduler`]
///
/// [`FrameScheduler`]: super::FrameScheduler
pub struct ScheduledTask<C> {
    pub(crate) id: String,
    pub(crate) priority: i32,
    pub(crate) update_interval: Duration,
    pub(crate) callback: TaskCallback<C>,
    pub(crate) last_run: Duration,
    pub(crate) enabled: bool,
    /// Registration order, breaks priority ties
    pub(crate) sequence: u64,
    /// Consecutive ticks this task was due but cut off by the budget
    pub(crate) skipped_ticks: u32,
    pub(crate) run_count: u64,
    pub(crate) failure_count: u64,
}

impl<C> ScheduledTask<C> {
    /// Create a task
    ///
    /// # Arguments
    /// * `id` - Unique identifier, also the caller's handle for later changes
    /// * `priority` - Higher runs earlier in the tick
    /// * `update_interval` - Minimum time between two runs
    /// * `callback` - Work to perform; gets the frame delta in seconds
    pub fn new<F>(id: impl Into<String>, priority: i32, update_interval: Duration, callback: F) -> Self
    where
        F: FnMut(&mut C, f32) -> TaskResult + 'static,
    {
        Self {
            id: id.into(),
            priority,
            update_interval,
            callback: Box::new(callback),
            last_run: Duration::ZERO,
            enabled: true,
            sequence: 0,
            skipped_ticks: 0,
            run_count: 0,
            failure_count: 0,
        }
    }

    /// Create a task that is due on every tick
    pub fn every_frame<F>(id: impl Into<String>, priority: i32, callback: F) -> Self
    where
        F: FnMut(&mut C, f32) -> TaskResult + 'static,
    {
        Self::new(id, priority, Duration::ZERO, callback)
    }

    /// Task identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current priority
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Minimum time between runs
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Whether the task takes part in scheduling
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn is_due(&self, now: Duration) -> bool {
        self.enabled && now.saturating_sub(self.last_run) >= self.update_interval
    }

    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id.clone(),
            priority: self.priority,
            update_interval: self.update_interval,
            enabled: self.enabled,
            run_count: self.run_count,
            failure_count: self.failure_count,
            skipped_ticks: self.skipped_ticks,
        }
    }
}

impl<C> fmt::Debug for ScheduledTask<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("update_interval", &self.update_interval)
            .field("last_run", &self.last_run)
            .field("enabled", &self.enabled)
            .field("skipped_ticks", &self.skipped_ticks)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a registered task, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Task identifier
    pub id: String,
    /// Current priority
    pub priority: i32,
    /// Minimum time between runs
    pub update_interval: Duration,
    /// Whether the task is enabled
    pub enabled: bool,
    /// Completed invocations (successful or not)
    pub run_count: u64,
    /// Invocations that returned an error or panicked
    pub failure_count: u64,
    /// Consecutive budget cut-offs
    pub skipped_ticks: u32,
}
