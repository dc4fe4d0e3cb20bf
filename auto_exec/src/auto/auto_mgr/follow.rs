//! # [`FollowPath`] task

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{error, info};

use super::{tasks::RunOnce, Task, TaskStatus, Tick};
use crate::{
    auto::{
        path::SampledPath,
        traj_ctrl::{Params, StatusReport, TrajCtrl, TrajCtrlMode},
    },
    robot::Robot,
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Drives along a single path using trajectory control.
pub struct FollowPath {
    name: String,
    traj_ctrl: TrajCtrl,

    /// Status report from the last cycle
    report: StatusReport,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl FollowPath {
    pub fn new(name: &str, params: Params, path: SampledPath) -> Self {
        Self {
            name: format!("Follow {}", name),
            traj_ctrl: TrajCtrl::new(params, path),
            report: StatusReport::default(),
        }
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }
}

impl Task for FollowPath {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _robot: &mut Robot) {
        self.report = StatusReport::default();
        self.traj_ctrl.begin();
    }

    fn advance(&mut self, tick: &Tick, robot: &mut Robot) -> TaskStatus {
        let pose = robot.drivetrain.get_pose();
        let (dems, report) = self.traj_ctrl.proc(&pose, tick.dt_s);
        self.report = report;

        match self.traj_ctrl.mode() {
            TrajCtrlMode::Finished => {
                info!("{} complete", self.name);
                TaskStatus::Done
            }
            TrajCtrlMode::Aborted | TrajCtrlMode::Off => {
                error!("TrajCtrl abandoned {}", self.name);
                TaskStatus::Aborted
            }
            TrajCtrlMode::FollowPath => {
                robot.drivetrain.apply(&dems);
                TaskStatus::Running
            }
        }
    }

    fn end(&mut self, interrupted: bool, robot: &mut Robot) {
        if interrupted {
            self.traj_ctrl.abort();
        }
        robot.safe_stop();
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Task resetting the odometry to the start of the path, facing along it.
pub fn reset_pose_to(path: &SampledPath) -> RunOnce {
    let start = path.start_point();
    let heading_rad = path.heading_rad(0);

    RunOnce::new("Reset pose", move |robot: &mut Robot| {
        info!(
            "Resetting pose to ({:.02}, {:.02}) heading {:.03} rad",
            start[0], start[1], heading_rad
        );
        robot.drivetrain.set_pose(start[0], start[1], heading_rad)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::{
            loc::Pose,
            path::{CubicBezier, ProfileParams},
        },
        robot::mock::{mock_robot, Cmd},
    };
    use nalgebra::Vector2;

    fn line_path() -> SampledPath {
        SampledPath::from_curves(
            vec![CubicBezier::line(Vector2::new(0.0, 0.0), Vector2::new(2.0, 0.0))],
            false,
            &ProfileParams::default(),
        )
        .unwrap()
    }

    fn is_safe_stop_tail(cmds: &[Cmd]) -> bool {
        cmds.ends_with(&[Cmd::Accel(0.0, 0.0), Cmd::AngVel(0.0), Cmd::Brake(true)])
    }

    #[test]
    fn test_interrupt_stops_robot() {
        for ticks in 0..5 {
            let (mut robot, handles) = mock_robot();
            let mut task = FollowPath::new("line", Params::default(), line_path());

            task.init(&mut robot);
            let mut tick = Tick::default();
            for _ in 0..ticks {
                tick = tick.next(0.02);
                assert_eq!(task.advance(&tick, &mut robot), TaskStatus::Running);
            }
            task.end(true, &mut robot);

            assert!(is_safe_stop_tail(&handles.take()));
        }
    }

    #[test]
    fn test_finish_at_end() {
        let (mut robot, handles) = mock_robot();
        let mut task = FollowPath::new("line", Params::default(), line_path());

        task.init(&mut robot);
        let tick = Tick::default().next(0.02);

        // Move along the path 0.1 m per cycle
        let mut status = TaskStatus::Running;
        let mut x = 0.0;
        while status == TaskStatus::Running && x < 2.5 {
            *handles.pose.borrow_mut() = Pose::new(x, 0.0, 0.0);
            status = task.advance(&tick, &mut robot);
            x += 0.1;
        }

        assert_eq!(status, TaskStatus::Done);
        assert!(x > 1.9);
        assert!(task.report().path_finished);

        task.end(false, &mut robot);
        assert!(is_safe_stop_tail(&handles.take()));
    }

    #[test]
    fn test_off_path_aborts() {
        let (mut robot, handles) = mock_robot();
        let mut task = FollowPath::new("line", Params::default(), line_path());

        *handles.pose.borrow_mut() = Pose::new(0.0, 2.0, 0.0);
        task.init(&mut robot);
        let tick = Tick::default().next(0.02);

        assert_eq!(task.advance(&tick, &mut robot), TaskStatus::Aborted);
        assert!(task.report().lat_error_limit_exceeded);
    }

    #[test]
    fn test_reset_pose() {
        let (mut robot, handles) = mock_robot();
        let mut reset = reset_pose_to(&line_path());

        assert_eq!(reset.advance(&Tick::default(), &mut robot), TaskStatus::Done);
        assert_eq!(handles.take(), vec![Cmd::SetPose(0.0, 0.0, 0.0)]);
    }
}
