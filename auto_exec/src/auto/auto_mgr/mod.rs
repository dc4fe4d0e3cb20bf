//! # AutoMgr module
//!
//! This module implements the [`AutoMgr`], which is responsible for running the autonomous
//! routines of the robot. A routine is a tree of [`Task`]s. Each task goes through:
//!
//! - `init` - called once before the first `advance`,
//! - `advance` - called every cycle until the task reports it is `Done` or `Aborted`,
//! - `end` - called exactly once when the task stops, with `interrupted` set if the task was
//!   cancelled or aborted. Tasks must leave their equipment safe in `end`.
//! - `handover` - after a task completes without interruption it may hand over to a follow-on
//!   task, which the manager (or the enclosing sequence) runs next.
//!
//! Tasks are composed with the combinators in [`tasks`]. The routines available to the robot are
//! built from `routines.toml` by the [`RoutineRegistry`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod classify;
mod follow;
mod params;
mod routines;
pub mod tasks;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use self::{
    classify::ClassifyLayout,
    follow::FollowPath,
    params::{LayoutPaths, RoutineKind, RoutineParams, RoutineSpec},
    routines::{RoutineBuilder, RoutineError, RoutineRegistry},
};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::{info, warn};

use crate::robot::Robot;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A unit of autonomous behaviour.
pub trait Task {
    /// Name of the task, used in logs.
    fn name(&self) -> &str;

    /// Called once before the first call to `advance`.
    fn init(&mut self, _robot: &mut Robot) {}

    /// Step the task by one cycle.
    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus;

    /// Called once when the task stops. `interrupted` is true if the task did not complete.
    fn end(&mut self, _interrupted: bool, _robot: &mut Robot) {}

    /// The task to run after this one completed, if any.
    fn handover(&mut self) -> Option<Box<dyn Task>> {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Timing of one control cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Tick {
    /// Number of the cycle since the start of the routine
    pub cycle: u64,

    /// Length of the cycle
    pub dt_s: f64,

    /// Time since the start of the routine
    pub elapsed_s: f64,
}

/// Autonomy Manager
///
/// Runs one root task at a time, performing its handovers.
#[derive(Default)]
pub struct AutoMgr {
    current: Option<Box<dyn Task>>,

    /// True once `init` has been called on the current task
    initialised: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of advancing a task.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Done,
    Aborted,
}

/// Status of the manager after a step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AutoMgrStatus {
    /// No task is running
    Off,

    /// A task is running
    Running,

    /// The task completed this cycle, with no task to hand over to
    Done,

    /// The task aborted this cycle
    Aborted,
}

/// Errors that can occur in the autonomy manager.
#[derive(Debug, thiserror::Error)]
pub enum AutoMgrError {
    #[error("Cannot start {0} while {1} is running")]
    AlreadyRunning(String, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start running a task. The task is initialised on the next call to `step`.
    pub fn start(&mut self, task: Box<dyn Task>) -> Result<(), AutoMgrError> {
        if let Some(ref current) = self.current {
            return Err(AutoMgrError::AlreadyRunning(
                task.name().to_string(),
                current.name().to_string(),
            ));
        }

        info!("AutoMgr state change to: {}", task.name());
        self.current = Some(task);
        self.initialised = false;

        Ok(())
    }

    /// Step the current task.
    pub fn step(&mut self, tick: &Tick, robot: &mut Robot) -> AutoMgrStatus {
        let task = match self.current.as_mut() {
            Some(t) => t,
            None => return AutoMgrStatus::Off,
        };

        if !self.initialised {
            task.init(robot);
            self.initialised = true;
        }

        match task.advance(tick, robot) {
            TaskStatus::Running => AutoMgrStatus::Running,
            TaskStatus::Done => {
                task.end(false, robot);
                let name = task.name().to_string();

                match task.handover() {
                    Some(next) => {
                        info!("AutoMgr state change to: {}", next.name());
                        self.current = Some(next);
                        self.initialised = false;
                        AutoMgrStatus::Running
                    }
                    None => {
                        info!("AutoMgr task {} complete", name);
                        self.current = None;
                        AutoMgrStatus::Done
                    }
                }
            }
            TaskStatus::Aborted => {
                task.end(true, robot);
                warn!("AutoMgr task {} aborted", task.name());
                self.current = None;
                AutoMgrStatus::Aborted
            }
        }
    }

    /// Cancel the current task, if any.
    pub fn abort(&mut self, robot: &mut Robot) {
        if let Some(mut task) = self.current.take() {
            warn!("Aborting AutoMgr task {}", task.name());

            // A task which never ran has nothing to clean up, but the robot is still made safe
            if self.initialised {
                task.end(true, robot);
            } else {
                robot.safe_stop();
            }
        }
        self.initialised = false;
    }

    pub fn is_off(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_on(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the current task.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.name())
    }
}

impl Tick {
    /// The tick following this one, `dt_s` later.
    pub fn next(&self, dt_s: f64) -> Self {
        Self {
            cycle: self.cycle + 1,
            dt_s,
            elapsed_s: self.elapsed_s + dt_s,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Done => write!(f, "Done"),
            TaskStatus::Aborted => write!(f, "Aborted"),
        }
    }
}
