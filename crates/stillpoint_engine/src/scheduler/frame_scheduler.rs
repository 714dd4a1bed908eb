//! Priority-ordered, interval-throttled, budget-bounded task runner
//!
//! Each tick walks the registered tasks from highest to lowest priority and
//! runs the ones whose interval has elapsed, until the wall-clock time spent
//! in the tick exceeds the frame budget. Skipped tasks are simply picked up
//! again on a later tick; nothing is queued.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;

use super::task::{ScheduledTask, TaskInfo};
use crate::core::config::SchedulerConfig;
use crate::foundation::time::{SharedClock, SystemClock};

/// Scheduler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A task with this id is already registered
    #[error("a task with id '{0}' is already scheduled")]
    DuplicateTask(String),
}

/// Budget accounting for the most recent tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Time available to tasks per tick, in milliseconds
    pub budget_ms: f32,
    /// Time the last tick actually took, in milliseconds
    pub usage_ms: f32,
    /// `(budget - usage) / budget`; negative when the tick overran
    pub efficiency: f32,
}

/// What happened during one call to [`FrameScheduler::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Tasks invoked this tick
    pub executed: usize,
    /// Invoked tasks that returned an error or panicked
    pub failed: usize,
    /// Due tasks left unrun because the budget ran out
    pub deferred: usize,
    /// Whether the budget cut the walk short
    pub budget_exhausted: bool,
}

/// Cooperative per-frame scheduler
///
/// Generic over the context `C` that callbacks mutate. The owner keeps the
/// context next to the scheduler and lends it to [`update`] each tick, so
/// tasks never need shared ownership of the state they touch.
///
/// [`update`]: FrameScheduler::update
pub struct FrameScheduler<C> {
    tasks: Vec<ScheduledTask<C>>,
    config: SchedulerConfig,
    clock: SharedClock,
    running: bool,
    next_sequence: u64,
    last_usage: Duration,
}

impl<C> FrameScheduler<C> {
    /// Create a scheduler reading time from `clock`
    pub fn new(config: SchedulerConfig, clock: SharedClock) -> Self {
        log::debug!(
            "Frame scheduler created: {:.2}ms frame, {:.0}% budget ({:.2}ms)",
            config.target_frame_time_ms,
            config.max_frame_budget_fraction * 100.0,
            config.budget_ms()
        );
        Self {
            tasks: Vec::new(),
            config,
            clock,
            running: true,
            next_sequence: 0,
            last_usage: Duration::ZERO,
        }
    }

    /// Create a scheduler with default settings on the system clock
    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default(), SystemClock::shared())
    }

    /// Scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a task
    ///
    /// The task's interval starts counting now. Ids must be unique; remove
    /// the old task before re-adding one with the same id.
    pub fn add_task(&mut self, mut task: ScheduledTask<C>) -> Result<(), SchedulerError> {
        if self.contains(&task.id) {
            return Err(SchedulerError::DuplicateTask(task.id));
        }

        task.last_run = self.clock.now();
        task.sequence = self.next_sequence;
        self.next_sequence += 1;

        log::debug!(
            "Scheduled task '{}' (priority {}, every {:?})",
            task.id,
            task.priority,
            task.update_interval
        );
        self.tasks.push(task);
        self.sort_by_priority();
        Ok(())
    }

    /// Unregister a task; returns whether it existed
    pub fn remove_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            log::debug!("Removed task '{}'", id);
        }
        removed
    }

    /// Resume a disabled task in place
    pub fn enable_task(&mut self, id: &str) -> bool {
        self.with_task(id, |task| task.enabled = true)
    }

    /// Suspend a task without losing its position
    pub fn disable_task(&mut self, id: &str) -> bool {
        self.with_task(id, |task| task.enabled = false)
    }

    /// Change a task's priority and reorder
    pub fn update_priority(&mut self, id: &str, priority: i32) -> bool {
        let found = self.with_task(id, |task| task.priority = priority);
        if found {
            self.sort_by_priority();
        }
        found
    }

    /// Change a task's minimum interval
    pub fn update_interval(&mut self, id: &str, interval: Duration) -> bool {
        self.with_task(id, |task| task.update_interval = interval)
    }

    /// Resume ticking
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Pause ticking; `update` becomes a no-op
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether `update` runs tasks
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Drop every task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Whether a task with this id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }

    /// Number of enabled tasks
    pub fn task_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_enabled()).count()
    }

    /// Number of registered tasks, enabled or not
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are registered
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Snapshot of one task
    pub fn task(&self, id: &str) -> Option<TaskInfo> {
        self.tasks.iter().find(|task| task.id == id).map(ScheduledTask::info)
    }

    /// Snapshot of all tasks in execution order
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.iter().map(ScheduledTask::info).collect()
    }

    /// Run the due tasks for one frame
    ///
    /// # Arguments
    /// * `context` - State lent to every callback
    /// * `delta_time` - Host frame delta in seconds, forwarded to callbacks
    pub fn update(&mut self, context: &mut C, delta_time: f32) -> TickSummary {
        let mut summary = TickSummary::default();
        if !self.running {
            return summary;
        }

        let start = self.clock.now();
        let budget = self.config.budget();

        for index in self.execution_order() {
            let task = &mut self.tasks[index];
            if !task.is_due(start) {
                continue;
            }

            if !summary.budget_exhausted && self.clock.now().saturating_sub(start) > budget {
                summary.budget_exhausted = true;
                log::debug!(
                    "Frame budget of {:?} exhausted before '{}', deferring remaining tasks",
                    budget,
                    task.id
                );
            }
            if summary.budget_exhausted {
                task.skipped_ticks = task.skipped_ticks.saturating_add(1);
                summary.deferred += 1;
                continue;
            }

            let callback = &mut task.callback;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(context, delta_time)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::warn!("Scheduled task '{}' failed: {}", task.id, err);
                    task.failure_count += 1;
                    summary.failed += 1;
                }
                Err(payload) => {
                    log::error!(
                        "Scheduled task '{}' panicked: {}",
                        task.id,
                        panic_message(payload.as_ref())
                    );
                    task.failure_count += 1;
                    summary.failed += 1;
                }
            }

            task.last_run = start;
            task.run_count += 1;
            task.skipped_ticks = 0;
            summary.executed += 1;
        }

        self.last_usage = self.clock.now().saturating_sub(start);
        if summary.budget_exhausted {
            log::trace!(
                "Tick used {:?} of {:?}; {} task(s) deferred",
                self.last_usage,
                budget,
                summary.deferred
            );
        }
        summary
    }

    /// Budget, usage and efficiency of the last tick
    pub fn frame_stats(&self) -> FrameStats {
        let budget_ms = self.config.budget_ms();
        let usage_ms = self.last_usage.as_secs_f32() * 1000.0;
        let efficiency = if budget_ms > 0.0 {
            (budget_ms - usage_ms) / budget_ms
        } else {
            1.0
        };
        FrameStats {
            budget_ms,
            usage_ms,
            efficiency,
        }
    }

    /// Task indices for this tick: starved tasks first, then priority order
    fn execution_order(&self) -> Vec<usize> {
        let Some(threshold) = self.config.starvation_threshold else {
            return (0..self.tasks.len()).collect();
        };

        let (mut promoted, rest): (Vec<usize>, Vec<usize>) =
            (0..self.tasks.len()).partition(|&index| self.tasks[index].skipped_ticks >= threshold);
        if !promoted.is_empty() {
            log::debug!("Promoting {} starved task(s) this tick", promoted.len());
        }
        promoted.extend(rest);
        promoted
    }

    fn sort_by_priority(&mut self) {
        self.tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
    }

    fn with_task(&mut self, id: &str, apply: impl FnOnce(&mut ScheduledTask<C>)) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                apply(task);
                true
            }
            None => false,
        }
    }
}

impl<C> std::fmt::Debug for FrameScheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("tasks", &self.tasks)
            .field("config", &self.config)
            .field("running", &self.running)
            .field("last_usage", &self.last_usage)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::ManualClock;
    use crate::scheduler::task::TaskError;
    use approx::assert_relative_eq;

    fn recorder(id: &'static str, priority: i32) -> ScheduledTask<Vec<&'static str>> {
        ScheduledTask::every_frame(id, priority, move |log: &mut Vec<&'static str>, _| {
            log.push(id);
            Ok(())
        })
    }

    fn ample_budget() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_frame_time_ms(1000.0)
            .with_budget_fraction(1.0)
    }

    #[test]
    fn test_priority_order_keeps_ties_in_insertion_order() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        for (id, priority) in [("p3", 3), ("p8a", 8), ("p1", 1), ("p8b", 8), ("p5", 5)] {
            scheduler.add_task(recorder(id, priority)).unwrap();
        }

        let mut ran = Vec::new();
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["p8a", "p8b", "p5", "p3", "p1"]);
    }

    #[test]
    fn test_end_to_end_runs_each_task_once_in_priority_order() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler.add_task(recorder("low", 1)).unwrap();
        scheduler.add_task(recorder("high", 10)).unwrap();
        scheduler.add_task(recorder("mid", 5)).unwrap();

        let mut ran = Vec::new();
        let summary = scheduler.update(&mut ran, 0.016);

        assert_eq!(ran, vec!["high", "mid", "low"]);
        assert_eq!(summary.executed, 3);
        assert!(!summary.budget_exhausted);
    }

    #[test]
    fn test_interval_throttles_runs() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(SchedulerConfig::default(), clock.shared());
        scheduler
            .add_task(ScheduledTask::new(
                "throttled",
                1,
                Duration::from_millis(100),
                |runs: &mut u32, _| {
                    *runs += 1;
                    Ok(())
                },
            ))
            .unwrap();

        let mut runs = 0;
        for _ in 0..20 {
            clock.advance_ms(10);
            scheduler.update(&mut runs, 0.010);
        }
        assert!(runs >= 1 && runs <= 3, "ran {runs} times in 200ms");
    }

    #[derive(Default)]
    struct Tally {
        counter: u32,
    }

    #[test]
    fn test_budget_cutoff_defers_lower_priority_tasks() {
        let clock = ManualClock::new();
        let burner = clock.clone();
        let mut scheduler = FrameScheduler::new(SchedulerConfig::default(), clock.shared());
        scheduler
            .add_task(ScheduledTask::new(
                "heavy",
                10,
                Duration::from_millis(1000),
                move |_: &mut Tally, _| {
                    burner.advance_ms(20);
                    Ok(())
                },
            ))
            .unwrap();
        scheduler
            .add_task(ScheduledTask::every_frame("light", 1, |state: &mut Tally, _| {
                state.counter += 1;
                Ok(())
            }))
            .unwrap();

        let mut state = Tally::default();
        clock.advance_ms(1000);
        let summary = scheduler.update(&mut state, 0.016);
        assert_eq!(state.counter, 0);
        assert!(summary.budget_exhausted);
        assert_eq!(summary.deferred, 1);

        clock.advance_ms(16);
        scheduler.update(&mut state, 0.016);
        assert_eq!(state.counter, 1);
    }

    #[test]
    fn test_budget_cutoff_with_real_sleep() {
        struct Workload {
            burn_pending: bool,
            counter: u32,
        }

        let mut scheduler = FrameScheduler::with_defaults();
        scheduler
            .add_task(ScheduledTask::every_frame("sleeper", 10, |state: &mut Workload, _| {
                if state.burn_pending {
                    state.burn_pending = false;
                    std::thread::sleep(Duration::from_millis(20));
                }
                Ok(())
            }))
            .unwrap();
        scheduler
            .add_task(ScheduledTask::every_frame("counter", 1, |state: &mut Workload, _| {
                state.counter += 1;
                Ok(())
            }))
            .unwrap();

        let mut state = Workload {
            burn_pending: true,
            counter: 0,
        };
        scheduler.update(&mut state, 0.016);
        assert_eq!(state.counter, 0);
        assert!(scheduler.frame_stats().efficiency < 0.0);

        scheduler.update(&mut state, 0.016);
        assert_eq!(state.counter, 1);
    }

    #[test]
    fn test_failing_task_does_not_stop_others() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler
            .add_task(ScheduledTask::every_frame("broken", 5, |_: &mut Vec<&'static str>, _| {
                Err(TaskError::failed("shader uniforms missing"))
            }))
            .unwrap();
        scheduler.add_task(recorder("after", 1)).unwrap();

        let mut ran = Vec::new();
        let summary = scheduler.update(&mut ran, 0.016);

        assert_eq!(ran, vec!["after"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.executed, 2);
        assert_eq!(scheduler.task("broken").unwrap().failure_count, 1);
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler
            .add_task(ScheduledTask::every_frame("explodes", 5, |_: &mut Vec<&'static str>, _| {
                panic!("particle buffer overflow")
            }))
            .unwrap();
        scheduler.add_task(recorder("survivor", 1)).unwrap();

        let mut ran = Vec::new();
        let summary = scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["survivor"]);
        assert_eq!(summary.failed, 1);

        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["survivor", "survivor"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut scheduler: FrameScheduler<Vec<&'static str>> = FrameScheduler::with_defaults();
        scheduler.add_task(recorder("breathing", 9)).unwrap();
        let result = scheduler.add_task(recorder("breathing", 1));

        assert_eq!(result, Err(SchedulerError::DuplicateTask("breathing".to_string())));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.task("breathing").unwrap().priority, 9);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut scheduler: FrameScheduler<Vec<&'static str>> = FrameScheduler::with_defaults();
        scheduler.add_task(recorder("particles", 3)).unwrap();
        assert!(scheduler.remove_task("particles"));
        assert!(!scheduler.remove_task("particles"));
        assert!(!scheduler.remove_task("never-added"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_disable_keeps_position() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler.add_task(recorder("a", 5)).unwrap();
        scheduler.add_task(recorder("b", 5)).unwrap();
        scheduler.add_task(recorder("c", 5)).unwrap();

        assert!(scheduler.disable_task("a"));
        assert_eq!(scheduler.task_count(), 2);
        assert_eq!(scheduler.len(), 3);

        let mut ran = Vec::new();
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["b", "c"]);

        assert!(scheduler.enable_task("a"));
        ran.clear();
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_priority_reorders() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler.add_task(recorder("first", 2)).unwrap();
        scheduler.add_task(recorder("second", 1)).unwrap();
        assert!(scheduler.update_priority("second", 7));
        assert!(!scheduler.update_priority("missing", 7));

        let mut ran = Vec::new();
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["second", "first"]);
    }

    #[test]
    fn test_update_interval_changes_throttle() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler.add_task(recorder("pulse", 1)).unwrap();
        scheduler.update_interval("pulse", Duration::from_millis(50));

        let mut ran = Vec::new();
        clock.advance_ms(20);
        scheduler.update(&mut ran, 0.02);
        assert!(ran.is_empty());

        clock.advance_ms(30);
        scheduler.update(&mut ran, 0.03);
        assert_eq!(ran, vec!["pulse"]);
    }

    #[test]
    fn test_starved_task_is_promoted() {
        let clock = ManualClock::new();
        let burner = clock.clone();
        let config = SchedulerConfig::default().with_starvation_threshold(Some(3));
        let mut scheduler = FrameScheduler::new(config, clock.shared());
        scheduler
            .add_task(ScheduledTask::every_frame("hog", 10, move |log: &mut Vec<&'static str>, _| {
                burner.advance_ms(20);
                log.push("hog");
                Ok(())
            }))
            .unwrap();
        scheduler.add_task(recorder("victim", 1)).unwrap();

        let mut ran = Vec::new();
        for _ in 0..3 {
            clock.advance_ms(16);
            scheduler.update(&mut ran, 0.016);
        }
        assert_eq!(ran, vec!["hog", "hog", "hog"]);
        assert_eq!(scheduler.task("victim").unwrap().skipped_ticks, 3);

        ran.clear();
        clock.advance_ms(16);
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["victim", "hog"]);
        assert_eq!(scheduler.task("victim").unwrap().skipped_ticks, 0);

        ran.clear();
        clock.advance_ms(16);
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["hog"]);
    }

    #[test]
    fn test_starvation_disabled_never_promotes() {
        let clock = ManualClock::new();
        let burner = clock.clone();
        let config = SchedulerConfig::default().with_starvation_threshold(None);
        let mut scheduler = FrameScheduler::new(config, clock.shared());
        scheduler
            .add_task(ScheduledTask::every_frame("hog", 10, move |_: &mut Vec<&'static str>, _| {
                burner.advance_ms(20);
                Ok(())
            }))
            .unwrap();
        scheduler.add_task(recorder("victim", 1)).unwrap();

        let mut ran = Vec::new();
        for _ in 0..50 {
            clock.advance_ms(16);
            scheduler.update(&mut ran, 0.016);
        }
        assert!(ran.is_empty());
        assert_eq!(scheduler.task("victim").unwrap().skipped_ticks, 50);
    }

    #[test]
    fn test_stopped_scheduler_runs_nothing() {
        let clock = ManualClock::new();
        let mut scheduler = FrameScheduler::new(ample_budget(), clock.shared());
        scheduler.add_task(recorder("idle", 1)).unwrap();
        scheduler.stop();
        assert!(!scheduler.is_running());

        let mut ran = Vec::new();
        assert_eq!(scheduler.update(&mut ran, 0.016), TickSummary::default());
        assert!(ran.is_empty());

        scheduler.start();
        scheduler.update(&mut ran, 0.016);
        assert_eq!(ran, vec!["idle"]);
    }

    #[test]
    fn test_frame_stats_efficiency() {
        let clock = ManualClock::new();
        let burner = clock.clone();
        let config = SchedulerConfig::default()
            .with_frame_time_ms(10.0)
            .with_budget_fraction(1.0);
        let mut scheduler = FrameScheduler::new(config, clock.shared());
        scheduler
            .add_task(ScheduledTask::every_frame("work", 1, move |_: &mut (), _| {
                burner.advance_ms(4);
                Ok(())
            }))
            .unwrap();

        scheduler.update(&mut (), 0.016);
        let stats = scheduler.frame_stats();
        assert_relative_eq!(stats.budget_ms, 10.0);
        assert_relative_eq!(stats.usage_ms, 4.0, epsilon = 1e-3);
        assert_relative_eq!(stats.efficiency, 0.6, epsilon = 1e-3);
    }

    #[test]
    fn test_unrepresentable_budget_saturates() {
        let clock = ManualClock::new();
        for frame_time in [f32::INFINITY, 1.0e30] {
            let config = SchedulerConfig::default()
                .with_frame_time_ms(frame_time)
                .with_budget_fraction(1.0);
            let mut scheduler = FrameScheduler::new(config, clock.shared());
            scheduler.add_task(recorder("only", 1)).unwrap();

            let mut ran = Vec::new();
            let summary = scheduler.update(&mut ran, 0.016);
            assert_eq!(ran, vec!["only"]);
            assert!(!summary.budget_exhausted);
        }
    }

    #[test]
    fn test_disabled_task_reports_disabled() {
        let task = recorder("idle", 1);
        assert!(task.is_enabled());

        let mut scheduler = FrameScheduler::new(ample_budget(), ManualClock::new().shared());
        scheduler.add_task(task).unwrap();
        scheduler.disable_task("idle");
        assert!(!scheduler.task("idle").unwrap().enabled);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut scheduler: FrameScheduler<Vec<&'static str>> = FrameScheduler::with_defaults();
        scheduler.add_task(recorder("a", 1)).unwrap();
        scheduler.add_task(recorder("b", 2)).unwrap();
        scheduler.clear();
        assert_eq!(scheduler.task_count(), 0);
        assert!(scheduler.tasks().is_empty());
    }
}
