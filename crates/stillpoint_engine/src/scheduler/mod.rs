//! Frame-budget task scheduling
//!
//! Host code registers callbacks with a priority and a minimum interval;
//! [`FrameScheduler::update`] runs the due ones each frame without letting
//! them consume more than a fixed share of the frame.

pub mod frame_scheduler;
pub mod task;

pub use frame_scheduler::{FrameScheduler, FrameStats, SchedulerError, TickSummary};
pub use task::{ScheduledTask, TaskCallback, TaskError, TaskInfo, TaskResult};
