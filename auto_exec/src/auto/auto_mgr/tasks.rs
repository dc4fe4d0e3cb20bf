//! # Task combinators
//!
//! Generic tasks from which routines are composed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use log::{debug, info};

use super::{Task, TaskStatus, Tick};
use crate::robot::Robot;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// An action performed on the robot's equipment.
pub type Action = Box<dyn FnMut(&mut Robot)>;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Conveniences for building task trees.
pub trait TaskExt: Task + Sized + 'static {
    fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }

    /// Interrupt the task if it hasn't finished after `limit_s` seconds.
    fn with_timeout(self, limit_s: f64) -> Timeout {
        Timeout::new(Box::new(self), limit_s)
    }
}

impl<T: Task + Sized + 'static> TaskExt for T {}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs tasks one after the other.
///
/// A task's handover is run before the rest of the sequence. If any task aborts the sequence
/// aborts.
pub struct Sequence {
    name: String,
    pending: VecDeque<Box<dyn Task>>,
    current: Option<Box<dyn Task>>,
}

/// Runs tasks together until all have completed.
///
/// If any task aborts all others are interrupted and the group aborts. Handovers of the tasks are
/// not run.
pub struct Parallel {
    name: String,
    tasks: Vec<Box<dyn Task>>,
    running: Vec<bool>,
}

/// Runs tasks together until the first one finishes, interrupting the rest.
///
/// If the first task to finish completed, its handover becomes the race's handover.
pub struct Race {
    name: String,
    tasks: Vec<Box<dyn Task>>,
    running: bool,

    /// The task which completed first
    winner: Option<usize>,
}

/// Interrupts a task which runs for too long. Timing out counts as completion.
pub struct Timeout {
    name: String,
    inner: Box<dyn Task>,
    limit_s: f64,
    elapsed_s: f64,
    active: bool,
    completed: bool,
}

/// Performs an action once and completes.
pub struct RunOnce {
    name: String,
    action: Action,
}

/// Performs one action on start and another on end, running until interrupted.
pub struct StartEnd {
    name: String,
    start: Action,
    end: Action,
}

/// Does nothing for a fixed time.
pub struct Wait {
    name: String,
    duration_s: f64,
    elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Sequence {
    pub fn new(name: &str, tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            name: name.to_string(),
            pending: tasks.into(),
            current: None,
        }
    }

    fn start_next(&mut self, robot: &mut Robot) {
        self.current = self.pending.pop_front().map(|mut next| {
            debug!("{}: starting {}", self.name, next.name());
            next.init(robot);
            next
        });
    }
}

impl Task for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, robot: &mut Robot) {
        self.start_next(robot);
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        let current = match self.current.as_mut() {
            Some(c) => c,
            None => return TaskStatus::Done,
        };

        match current.advance(tick, robot) {
            TaskStatus::Running => TaskStatus::Running,
            TaskStatus::Done => {
                current.end(false, robot);
                if let Some(next) = current.handover() {
                    self.pending.push_front(next);
                }

                self.start_next(robot);
                match self.current {
                    Some(_) => TaskStatus::Running,
                    None => TaskStatus::Done,
                }
            }
            TaskStatus::Aborted => {
                current.end(true, robot);
                self.current = None;
                TaskStatus::Aborted
            }
        }
    }

    fn end(&mut self, interrupted: bool, robot: &mut Robot) {
        if let Some(mut current) = self.current.take() {
            current.end(interrupted, robot);
        }
    }
}

impl Parallel {
    pub fn new(name: &str, tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            name: name.to_string(),
            running: vec![false; tasks.len()],
            tasks,
        }
    }
}

impl Task for Parallel {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, robot: &mut Robot) {
        for (task, running) in self.tasks.iter_mut().zip(self.running.iter_mut()) {
            task.init(robot);
            *running = true;
        }
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        for i in 0..self.tasks.len() {
            if !self.running[i] {
                continue;
            }

            match self.tasks[i].advance(tick, robot) {
                TaskStatus::Running => (),
                TaskStatus::Done => {
                    self.tasks[i].end(false, robot);
                    self.running[i] = false;
                }
                TaskStatus::Aborted => {
                    self.tasks[i].end(true, robot);
                    self.running[i] = false;
                    self.end(true, robot);
                    return TaskStatus::Aborted;
                }
            }
        }

        match self.running.iter().any(|r| *r) {
            true => TaskStatus::Running,
            false => TaskStatus::Done,
        }
    }

    fn end(&mut self, interrupted: bool, robot: &mut Robot) {
        for (task, running) in self.tasks.iter_mut().zip(self.running.iter_mut()) {
            if *running {
                task.end(interrupted, robot);
                *running = false;
            }
        }
    }
}

impl Race {
    pub fn new(name: &str, tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            name: name.to_string(),
            tasks,
            running: false,
            winner: None,
        }
    }
}

impl Task for Race {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, robot: &mut Robot) {
        for task in self.tasks.iter_mut() {
            task.init(robot);
        }
        self.running = true;
        self.winner = None;
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        if !self.running {
            return TaskStatus::Done;
        }

        for i in 0..self.tasks.len() {
            let status = self.tasks[i].advance(tick, robot);
            if status == TaskStatus::Running {
                continue;
            }

            debug!("{}: {} finished first ({})", self.name, self.tasks[i].name(), status);

            for (j, task) in self.tasks.iter_mut().enumerate() {
                let interrupted = j != i || status == TaskStatus::Aborted;
                task.end(interrupted, robot);
            }
            self.running = false;
            if status == TaskStatus::Done {
                self.winner = Some(i);
            }

            return status;
        }

        TaskStatus::Running
    }

    fn end(&mut self, interrupted: bool, robot: &mut Robot) {
        if self.running {
            for task in self.tasks.iter_mut() {
                task.end(interrupted, robot);
            }
            self.running = false;
        }
    }

    fn handover(&mut self) -> Option<Box<dyn Task>> {
        let winner = self.winner.take()?;
        self.tasks[winner].handover()
    }
}

impl Timeout {
    pub fn new(inner: Box<dyn Task>, limit_s: f64) -> Self {
        Self {
            name: format!("{} (timeout {:.1} s)", inner.name(), limit_s),
            inner,
            limit_s,
            elapsed_s: 0.0,
            active: false,
            completed: false,
        }
    }
}

impl Task for Timeout {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, robot: &mut Robot) {
        self.elapsed_s = 0.0;
        self.active = true;
        self.completed = false;
        self.inner.init(robot);
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        if !self.active {
            return TaskStatus::Done;
        }

        let status = self.inner.advance(tick, robot);
        self.elapsed_s += tick.dt_s;

        match status {
            TaskStatus::Running if self.elapsed_s >= self.limit_s => {
                info!("{} timed out", self.inner.name());
                self.inner.end(true, robot);
                self.active = false;
                TaskStatus::Done
            }
            TaskStatus::Running => TaskStatus::Running,
            TaskStatus::Done => {
                self.inner.end(false, robot);
                self.active = false;
                self.completed = true;
                TaskStatus::Done
            }
            TaskStatus::Aborted => {
                self.inner.end(true, robot);
                self.active = false;
                TaskStatus::Aborted
            }
        }
    }

    fn end(&mut self, interrupted: bool, robot: &mut Robot) {
        if self.active {
            self.inner.end(interrupted, robot);
            self.active = false;
        }
    }

    /// Only a task which completed by itself hands over.
    fn handover(&mut self) -> Option<Box<dyn Task>> {
        match self.completed {
            true => self.inner.handover(),
            false => None,
        }
    }
}

impl RunOnce {
    pub fn new<F: FnMut(&mut Robot) + 'static>(name: &str, action: F) -> Self {
        Self {
            name: name.to_string(),
            action: Box::new(action),
        }
    }
}

impl Task for RunOnce {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, _tick: &Tick, robot: &mut Robot) -> TaskStatus {
        (self.action)(robot);
        TaskStatus::Done
    }
}

impl StartEnd {
    pub fn new<S, E>(name: &str, start: S, end: E) -> Self
    where
        S: FnMut(&mut Robot) + 'static,
        E: FnMut(&mut Robot) + 'static,
    {
        Self {
            name: name.to_string(),
            start: Box::new(start),
            end: Box::new(end),
        }
    }
}

impl Task for StartEnd {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, robot: &mut Robot) {
        (self.start)(robot);
    }

    fn advance(&mut self, _tick: &Tick, _robot: &mut Robot) -> TaskStatus {
        TaskStatus::Running
    }

    fn end(&mut self, _interrupted: bool, robot: &mut Robot) {
        (self.end)(robot);
    }
}

impl Wait {
    pub fn new(duration_s: f64) -> Self {
        Self {
            name: format!("Wait {:.1} s", duration_s),
            duration_s,
            elapsed_s: 0.0,
        }
    }
}

impl Task for Wait {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _robot: &mut Robot) {
        self.elapsed_s = 0.0;
    }

    fn advance(&mut self, tick: &Tick, _robot: &mut Robot) -> TaskStatus {
        self.elapsed_s += tick.dt_s;

        match self.elapsed_s >= self.duration_s {
            true => TaskStatus::Done,
            false => TaskStatus::Running,
        }
    }
}
