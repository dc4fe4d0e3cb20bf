//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::*;
use crate::auto::{loc::Pose, path::SampledPath};
use comms_if::eqpt::drive::DriveDems;
use util::maths::approach;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a single sampled path.
pub struct TrajCtrl {
    params: Params,

    /// Executing mode
    mode: TrajCtrlMode,

    /// The path to follow
    path: SampledPath,

    /// Index of the current tracked sample. Never decreases while following.
    sample_index: usize,

    /// Speed along the path measured from the change in position over the last cycle.
    speed_ms: f64,

    /// Position at the previous cycle
    prev_position_m: Option<Vector2<f64>>,

    /// Current acceleration demand along the path.
    accel_mss: f64,

    /// Controller objects used to calculate angular velocity demands
    controllers: TrajControllers,
}

/// The status report containing various error flags and monitoring quantities.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the current tracked sample
    pub sample_index: usize,

    /// The lateral error to the path
    pub lat_error_m: f64,

    /// The heading error to the path
    pub head_error_rad: f64,

    /// Speed from the profile being targeted
    pub target_speed_ms: f64,

    /// Measured speed along the path
    pub speed_ms: f64,

    /// If true the limit on the lateral error has been exceeded
    pub lat_error_limit_exceeded: bool,

    /// If true the end of the path has been reached
    pub path_finished: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of TrajCtrl.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrajCtrlMode {
    /// Not started
    Off,

    /// Following the path
    FollowPath,

    /// The end of the path has been reached
    Finished,

    /// The path was abandoned, either by the caller or because the error limits were exceeded
    Aborted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    pub fn new(params: Params, path: SampledPath) -> Self {
        let controllers = TrajControllers::new(&params);

        Self {
            params,
            mode: TrajCtrlMode::Off,
            path,
            sample_index: 0,
            speed_ms: 0f64,
            prev_position_m: None,
            accel_mss: 0f64,
            controllers,
        }
    }

    pub fn path(&self) -> &SampledPath {
        &self.path
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    /// Begin following the path from its start.
    pub fn begin(&mut self) {
        self.sample_index = 0;
        self.speed_ms = 0f64;
        self.prev_position_m = None;
        self.accel_mss = 0f64;
        self.controllers.reset();
        self.mode = TrajCtrlMode::FollowPath;

        info!(
            "TrajCtrl following {:.02} m path ({} samples){}",
            self.path.length_m(),
            self.path.samples().len(),
            if self.path.is_backwards() { " backwards" } else { "" }
        );
    }

    /// Abandon the path. All further demands are a safe stop.
    pub fn abort(&mut self) {
        if self.mode == TrajCtrlMode::FollowPath {
            warn!("TrajCtrl path aborted at sample {}", self.sample_index);
        }
        self.mode = TrajCtrlMode::Aborted;
        self.accel_mss = 0f64;
    }

    /// Process trajectory control for one cycle lasting `dt_s` seconds.
    pub fn proc(&mut self, pose: &Pose, dt_s: f64) -> (DriveDems, StatusReport) {
        let mut report = StatusReport::default();

        let dems = match self.mode {
            TrajCtrlMode::FollowPath => self.mode_follow_path(pose, dt_s, &mut report),
            TrajCtrlMode::Finished => {
                report.path_finished = true;
                DriveDems::safe_stop()
            }
            TrajCtrlMode::Off | TrajCtrlMode::Aborted => DriveDems::safe_stop(),
        };

        report.sample_index = self.sample_index;
        report.speed_ms = self.speed_ms;

        (dems, report)
    }

    /// Mode following path
    fn mode_follow_path(&mut self, pose: &Pose, dt_s: f64, report: &mut StatusReport) -> DriveDems {
        let last = self.path.samples().len() - 1;

        // ---- TARGET MANAGEMENT ----

        self.sample_index = self.find_nearest_ahead(pose);
        self.measure_speed(pose, dt_s);

        if self.sample_index >= last || self.is_past_end(pose) {
            info!("TrajCtrl path finished");
            self.mode = TrajCtrlMode::Finished;
            self.accel_mss = 0f64;
            report.path_finished = true;
            return DriveDems::safe_stop();
        }

        // ---- COMMAND GENERATION ----

        let ang_vel_rads = self.controllers.get_ang_vel_dem(
            &self.path,
            self.sample_index,
            pose,
            self.speed_ms.max(0f64),
            dt_s,
            report,
            &self.params,
        );

        if report.lat_error_limit_exceeded {
            warn!(
                "TrajCtrl lateral error limit exceeded ({:.03} m)",
                report.lat_error_m
            );
            self.abort();
            return DriveDems::safe_stop();
        }

        let samples = self.path.samples();
        let curr = &samples[self.sample_index];
        let next = &samples[self.sample_index + 1];

        // Below the minimum speed the profile is only followed by the proportional term, so the
        // robot creeps onto the final sample rather than stopping short of it.
        let target_speed_ms = next.max_speed_ms.max(self.params.min_speed_ms);
        report.target_speed_ms = target_speed_ms;

        let ds_m = next.dist_m - curr.dist_m;
        let ff_accel_mss = match next.max_speed_ms >= self.params.min_speed_ms && ds_m > 0f64 {
            true => (next.max_speed_ms.powi(2) - curr.max_speed_ms.powi(2)) / (2f64 * ds_m),
            false => 0f64,
        };

        let profile = &self.params.profile;
        let accel_dem_mss = (ff_accel_mss
            + self.params.speed_k_p * (target_speed_ms - self.speed_ms))
            .clamp(-profile.max_reverse_accel_mss, profile.max_accel_mss);

        // Jerk limit only the build up of forward acceleration, deceleration eases off at once
        self.accel_mss = match profile.max_jerk_msss > 0f64
            && accel_dem_mss > 0f64
            && accel_dem_mss > self.accel_mss
        {
            true => approach(
                self.accel_mss.max(0f64),
                accel_dem_mss,
                profile.max_jerk_msss * dt_s,
            ),
            false => accel_dem_mss,
        };

        // Decelerate at most to rest over this cycle, the path is never driven in reverse
        if dt_s > 0f64 {
            self.accel_mss = self.accel_mss.max(-self.speed_ms.max(0f64) / dt_s);
        }

        debug!(
            "TrajCtrl sample {}: lat {:.03} m, head {:.03} rad, speed {:.02}/{:.02} m/s",
            self.sample_index,
            report.lat_error_m,
            report.head_error_rad,
            self.speed_ms,
            target_speed_ms
        );

        let direction = match self.path.is_backwards() {
            true => -1f64,
            false => 1f64,
        };

        DriveDems {
            accel_mss: [direction * self.accel_mss, 0f64],
            ang_vel_rads,
            brake: false,
        }
    }

    /// Find the nearest sample to the pose within the search window ahead of the current sample.
    fn find_nearest_ahead(&self, pose: &Pose) -> usize {
        let samples = self.path.samples();
        let end = (self.sample_index + self.params.search_window).min(samples.len() - 1);

        let mut best = self.sample_index;
        let mut best_dist = f64::INFINITY;

        for (i, s) in samples.iter().enumerate().take(end + 1).skip(self.sample_index) {
            let dist = (s.position_m - pose.position_m).norm_squared();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }

        best
    }

    /// Update the speed along the path from the change in position since the last cycle.
    fn measure_speed(&mut self, pose: &Pose, dt_s: f64) {
        if let (Some(prev), true) = (self.prev_position_m, dt_s > 0f64) {
            let tangent = self.path.tangent(self.sample_index);
            self.speed_ms = (pose.position_m - prev).dot(&tangent) / dt_s;
        }
        self.prev_position_m = Some(pose.position_m);
    }

    /// True if the robot is near the end of the path and has passed the end point along the
    /// final direction.
    fn is_past_end(&self, pose: &Pose) -> bool {
        let samples = self.path.samples();
        let last = samples.len() - 1;

        let remaining_m = self.path.length_m() - samples[self.sample_index].dist_m;
        if remaining_m > self.params.end_tolerance_m {
            return false;
        }

        let tangent = self.path.tangent(last);
        (pose.position_m - self.path.end_point()).dot(&tangent) >= 0f64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::path::{CubicBezier, ProfileParams};
    use nalgebra::Vector2;

    fn line_path(backwards: bool) -> SampledPath {
        SampledPath::from_curves(
            vec![
                CubicBezier::line(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)),
                CubicBezier::line(Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0)),
            ],
            backwards,
            &ProfileParams::default(),
        )
        .unwrap()
    }

    /// Anticlockwise circle of radius `r` starting and ending at the origin, heading along +X.
    fn circle_path(r: f64) -> SampledPath {
        let k = 0.5522847498 * r;
        let p = |x: f64, y: f64| Vector2::new(x, y);

        SampledPath::from_curves(
            vec![
                CubicBezier::new(p(0.0, 0.0), p(k, 0.0), p(r, r - k), p(r, r)),
                CubicBezier::new(p(r, r), p(r, r + k), p(k, 2.0 * r), p(0.0, 2.0 * r)),
                CubicBezier::new(p(0.0, 2.0 * r), p(-k, 2.0 * r), p(-r, r + k), p(-r, r)),
                CubicBezier::new(p(-r, r), p(-r, r - k), p(-k, 0.0), p(0.0, 0.0)),
            ],
            false,
            &ProfileParams::default(),
        )
        .unwrap()
    }

    /// Simple unicycle integration of the demands
    fn step(pose: &mut Pose, speed: &mut f64, dems: &DriveDems, dt: f64) {
        *speed += dems.accel_mss[0] * dt;
        pose.heading_rad += dems.ang_vel_rads * dt;
        pose.position_m += pose.forward2() * *speed * dt;
    }

    #[test]
    fn test_follow_to_end() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(false));
        traj_ctrl.begin();

        let mut pose = Pose::new(0.0, 0.05, 0.0);
        let mut speed = 0.0;
        let mut prev_index = 0;
        let mut finished = false;

        for _ in 0..2000 {
            let (dems, report) = traj_ctrl.proc(&pose, 0.02);

            assert!(report.sample_index >= prev_index);
            prev_index = report.sample_index;

            if report.path_finished {
                assert!(dems.is_safe_stop());
                finished = true;
                break;
            }

            assert!(!dems.brake);
            let prev_x = pose.position_m[0];
            step(&mut pose, &mut speed, &dems, 0.02);

            // Never driven backwards or past the end
            assert!(speed >= -1e-9, "speed {}", speed);
            assert!(pose.position_m[0] >= prev_x - 1e-9);
            assert!(pose.position_m[0] < 2.1);
        }

        assert!(finished);
        assert_eq!(traj_ctrl.mode(), TrajCtrlMode::Finished);
        assert!((pose.position_m - Vector2::new(2.0, 0.0)).norm() < 0.1);
    }

    #[test]
    fn test_follow_closed_loop() {
        let path = circle_path(1.5);
        assert!((path.start_point() - path.end_point()).norm() < 1e-12);

        let mut traj_ctrl = TrajCtrl::new(Params::default(), path);
        traj_ctrl.begin();

        let mut pose = Pose::new(0.0, 0.0, 0.0);
        let mut speed = 0.0;
        let mut cycles = 0;

        // Starting on the end point must not finish the path
        let (dems, report) = traj_ctrl.proc(&pose, 0.02);
        assert!(!report.path_finished);
        assert!(!dems.is_safe_stop());
        step(&mut pose, &mut speed, &dems, 0.02);

        while traj_ctrl.mode() == TrajCtrlMode::FollowPath && cycles < 2000 {
            let (dems, report) = traj_ctrl.proc(&pose, 0.02);
            assert!(!report.lat_error_limit_exceeded);
            step(&mut pose, &mut speed, &dems, 0.02);
            cycles += 1;
        }

        assert_eq!(traj_ctrl.mode(), TrajCtrlMode::Finished);

        // Roughly 9.4 m at no more than 3 m/s
        assert!(cycles as f64 * 0.02 > 9.4 / 3.0);
        assert!(pose.position_m.norm() < 0.1);
    }

    #[test]
    fn test_stalled_robot_not_reversed() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(false));
        traj_ctrl.begin();

        // Pose never changes, as if the robot were stuck
        let pose = Pose::new(0.5, 0.0, 0.0);
        for _ in 0..200 {
            let (dems, report) = traj_ctrl.proc(&pose, 0.02);
            assert!(dems.accel_mss[0] >= 0.0);
            assert_eq!(report.speed_ms, 0.0);
        }

        // Moving backwards along the path is never reinforced
        let (_, report) = traj_ctrl.proc(&Pose::new(0.4, 0.0, 0.0), 0.02);
        assert!(report.speed_ms < 0.0);
        let (dems, _) = traj_ctrl.proc(&Pose::new(0.3, 0.0, 0.0), 0.02);
        assert!(dems.accel_mss[0] >= 0.0);
    }

    #[test]
    fn test_backwards_commands_reverse() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(true));
        traj_ctrl.begin();

        // Facing away from the direction of travel
        let pose = Pose::new(0.0, 0.0, std::f64::consts::PI);
        let (dems, report) = traj_ctrl.proc(&pose, 0.02);

        assert!(!report.path_finished);
        assert!(dems.accel_mss[0] < 0.0);
        assert!(report.head_error_rad.abs() < 1e-9);
    }

    #[test]
    fn test_index_never_regresses() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(false));
        traj_ctrl.begin();

        let (_, report) = traj_ctrl.proc(&Pose::new(0.5, 0.0, 0.0), 0.02);
        let index = report.sample_index;
        assert!(index > 0);

        // Pose jumps back to the start
        let (_, report) = traj_ctrl.proc(&Pose::new(0.0, 0.0, 0.0), 0.02);
        assert_eq!(report.sample_index, index);
    }

    #[test]
    fn test_abort_is_safe_stop() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(false));
        traj_ctrl.begin();

        let (dems, _) = traj_ctrl.proc(&Pose::new(0.0, 0.0, 0.0), 0.02);
        assert!(!dems.is_safe_stop());

        traj_ctrl.abort();
        let (dems, _) = traj_ctrl.proc(&Pose::new(0.1, 0.0, 0.0), 0.02);
        assert!(dems.is_safe_stop());
    }

    #[test]
    fn test_lat_error_limit_aborts() {
        let mut traj_ctrl = TrajCtrl::new(Params::default(), line_path(false));
        traj_ctrl.begin();

        let (dems, report) = traj_ctrl.proc(&Pose::new(0.0, 2.0, 0.0), 0.02);

        assert!(report.lat_error_limit_exceeded);
        assert!(dems.is_safe_stop());
        assert_eq!(traj_ctrl.mode(), TrajCtrlMode::Aborted);
    }
}
