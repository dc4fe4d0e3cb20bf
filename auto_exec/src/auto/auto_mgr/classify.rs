//! # [`ClassifyLayout`] task
//!
//! Watches the field with the vision sensor until the layout has been decided, then hands over to
//! the routine for that layout.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{Task, TaskStatus, Tick};
use crate::{
    auto::layout::{ArbiterError, ArbiterState, Layout, LayoutParams, VoteArbiter},
    robot::Robot,
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

pub struct ClassifyLayout {
    arbiter: VoteArbiter,

    /// The routine to run for each layout
    routines: Vec<(Layout, Box<dyn Task>)>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ClassifyLayout {
    pub fn new(
        params: &LayoutParams,
        routines: Vec<(Layout, Box<dyn Task>)>,
    ) -> Result<Self, ArbiterError> {
        Ok(Self {
            arbiter: VoteArbiter::new(params)?,
            routines,
        })
    }

    pub fn decision(&self) -> Option<Layout> {
        self.arbiter.decision()
    }
}

impl Task for ClassifyLayout {
    fn name(&self) -> &str {
        "ClassifyLayout"
    }

    fn init(&mut self, robot: &mut Robot) {
        // Hold still while looking
        robot.safe_stop();
        self.arbiter.start();
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        let dets = robot.pixy.poll();
        let report = self.arbiter.process(&dets);

        debug!(
            "Cycle {}: {} detections, errors {:?}, vote {}",
            tick.cycle,
            dets.len(),
            report.errors,
            report.vote
        );

        match report.state {
            ArbiterState::Decided(layout) => {
                info!("Layout {} decided after {} cycles", layout, tick.cycle);
                TaskStatus::Done
            }
            ArbiterState::Accumulating => TaskStatus::Running,
            ArbiterState::Idle | ArbiterState::Aborted => TaskStatus::Aborted,
        }
    }

    fn end(&mut self, interrupted: bool, _robot: &mut Robot) {
        if interrupted {
            self.arbiter.abort();
        }
    }

    fn handover(&mut self) -> Option<Box<dyn Task>> {
        let layout = self.arbiter.decision()?;

        match self.routines.iter().position(|(l, _)| *l == layout) {
            Some(i) => Some(self.routines.swap_remove(i).1),
            None => {
                warn!("No routine for layout {}", layout);
                None
            }
        }
    }
}
