//! # Simulation Client
//!
//! Simulated equipment which lets the autonomy run without the robot. It is to be used for
//! testing and development of systems rather than actual driving. The simulation provides:
//!
//! - [`SimDrivetrain`] - integrates the drive demands into a pose,
//! - [`ReplaySource`] - replays recorded vision sensor frames from a JSON file,
//! - [`LayoutSource`] - generates detections on the reference points of a layout,
//! - [`EmptySource`] - never sees anything,
//! - [`SimIntake`] and [`SimShooter`] - log their commands.
//!
//! [`sim_robot`] assembles these from the exec parameters.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use comms_if::eqpt::pixy::Detection;
use log::{debug, info};
use serde::Deserialize;

use crate::{
    auto::{
        layout::{Layout, LayoutConfig, LayoutParams},
        loc::Pose,
    },
    params::{SimParams, SimPixySource},
    robot::{DetectionSource, Drivetrain, Intake, Robot, Shooter},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size of the boxes generated by the [`LayoutSource`]
const LAYOUT_SOURCE_BOX_SIZE: i32 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Kinematic drivetrain simulation.
#[derive(Debug, Default)]
pub struct SimDrivetrain {
    pose: Pose,

    /// Speed along the robot's forward axis
    speed_ms: f64,

    /// Acceleration demand along the robot's forward axis
    accel_mss: f64,

    ang_vel_rads: f64,

    brake: bool,
}

/// Replays recorded sensor frames, one per poll.
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<Vec<Detection>>,
    next: usize,
    repeat: bool,
}

/// Generates one detection on each reference point of a layout, aging every poll.
#[derive(Debug)]
pub struct LayoutSource {
    config: LayoutConfig,
    age: u8,
}

/// Source which never detects anything.
#[derive(Debug, Default)]
pub struct EmptySource;

#[derive(Debug, Default)]
pub struct SimIntake {
    pub extended: bool,
    pub running: bool,
}

#[derive(Debug, Default)]
pub struct SimShooter {
    pub speed_rpm: f64,
}

/// Recorded sensor frames.
#[derive(Debug, Deserialize)]
struct ReplayFile {
    frames: Vec<Vec<Detection>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Cannot read replay file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot parse replay file {0:?}: {1}")]
    DeserializeError(PathBuf, serde_json::Error),

    #[error("Layout {0} is not configured")]
    UnknownLayout(Layout),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimDrivetrain {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            ..Default::default()
        }
    }

    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }
}

impl Drivetrain for SimDrivetrain {
    fn set_acceleration(&mut self, x_mss: f64, _y_mss: f64) {
        self.accel_mss = x_mss;
    }

    fn set_angular_velocity(&mut self, ang_vel_rads: f64) {
        self.ang_vel_rads = ang_vel_rads;
    }

    fn set_brake(&mut self, engaged: bool) {
        self.brake = engaged;
    }

    fn set_pose(&mut self, x_m: f64, y_m: f64, heading_rad: f64) {
        self.pose = Pose::new(x_m, y_m, heading_rad);
        debug!("SimDrivetrain pose reset to {:?}", self.pose);
    }

    fn get_pose(&self) -> Pose {
        self.pose
    }

    fn periodic(&mut self, dt_s: f64) {
        if self.brake {
            self.speed_ms = 0.0;
            return;
        }

        self.speed_ms += self.accel_mss * dt_s;
        self.pose.heading_rad += self.ang_vel_rads * dt_s;
        self.pose.position_m += self.pose.forward2() * self.speed_ms * dt_s;
    }
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<Detection>>, repeat: bool) -> Self {
        Self {
            frames,
            next: 0,
            repeat,
        }
    }

    /// Load frames from a JSON replay file of the form `{"frames": [[detection, ...], ...]}`.
    pub fn load<P: AsRef<Path>>(path: P, repeat: bool) -> Result<Self, SimClientError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| SimClientError::FileLoadError(path.to_path_buf(), e))?;
        let file: ReplayFile = serde_json::from_str(&s)
            .map_err(|e| SimClientError::DeserializeError(path.to_path_buf(), e))?;

        info!("Loaded {} replay frames from {:?}", file.frames.len(), path);

        Ok(Self::new(file.frames, repeat))
    }
}

impl DetectionSource for ReplaySource {
    fn poll(&mut self) -> Vec<Detection> {
        if self.next >= self.frames.len() {
            if !self.repeat || self.frames.is_empty() {
                return Vec::new();
            }
            self.next = 0;
        }

        self.next += 1;
        self.frames[self.next - 1].clone()
    }
}

impl LayoutSource {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config, age: 0 }
    }
}

impl DetectionSource for LayoutSource {
    fn poll(&mut self) -> Vec<Detection> {
        self.age = self.age.saturating_add(1);

        self.config
            .reference_points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Detection::new(
                    i as u8,
                    self.age,
                    p.x,
                    p.y,
                    LAYOUT_SOURCE_BOX_SIZE,
                    LAYOUT_SOURCE_BOX_SIZE,
                )
            })
            .collect()
    }
}

impl DetectionSource for EmptySource {
    fn poll(&mut self) -> Vec<Detection> {
        Vec::new()
    }
}

impl Intake for SimIntake {
    fn extend(&mut self) {
        self.extended = true;
        info!("SimIntake extended");
    }

    fn retract(&mut self) {
        self.extended = false;
        info!("SimIntake retracted");
    }

    fn start(&mut self) {
        self.running = true;
        info!("SimIntake started");
    }

    fn stop(&mut self) {
        self.running = false;
        info!("SimIntake stopped");
    }
}

impl Shooter for SimShooter {
    fn set_speed(&mut self, speed_rpm: f64) {
        self.speed_rpm = speed_rpm;
        info!("SimShooter speed set to {:.0} rpm", speed_rpm);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a robot from simulated equipment.
///
/// Replay files are relative to `sw_root`.
pub fn sim_robot(
    params: &SimParams,
    layout_params: &LayoutParams,
    sw_root: &Path,
) -> Result<Robot, SimClientError> {
    let pixy: Box<dyn DetectionSource> = match params.pixy {
        SimPixySource::None => Box::new(EmptySource),
        SimPixySource::Replay { ref file, repeat } => {
            Box::new(ReplaySource::load(sw_root.join(file), repeat)?)
        }
        SimPixySource::Layout { layout } => {
            let config = layout_params
                .layouts
                .iter()
                .find(|c| c.layout == layout)
                .ok_or(SimClientError::UnknownLayout(layout))?;
            info!("Simulating detections for layout {}", layout);
            Box::new(LayoutSource::new(config.clone()))
        }
    };

    Ok(Robot {
        drivetrain: Box::new(SimDrivetrain::new(params.start_pose())),
        intake: Box::new(SimIntake::default()),
        shooter: Box::new(SimShooter::default()),
        pixy,
    })
}
