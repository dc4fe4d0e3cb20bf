//! # Routines
//!
//! Builds the task trees of the autonomous routines described in `routines.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use log::{info, warn};

use super::{
    classify::ClassifyLayout,
    follow::{reset_pose_to, FollowPath},
    params::{LayoutPaths, RoutineKind, RoutineParams, RoutineSpec},
    tasks::{Race, Sequence, StartEnd, TaskExt, Wait},
    Task,
};
use crate::{
    auto::{
        layout::{ArbiterError, Layout, LayoutParams},
        path::{PathError, SampledPath},
        traj_ctrl::Params,
    },
    robot::Robot,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Builds routines from their specifications.
pub struct RoutineBuilder {
    traj_params: Params,
    layout_params: LayoutParams,

    /// Directory the path files are loaded from
    paths_dir: PathBuf,
}

/// The routines available to the robot.
pub struct RoutineRegistry {
    builder: RoutineBuilder,
    specs: Vec<RoutineSpec>,

    /// Routines which could not be built, with the reason
    unavailable: Vec<(String, String)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    #[error("Cannot load path {0}: {1}")]
    PathError(String, PathError),

    #[error("Cannot create the layout arbiter: {0}")]
    ArbiterError(#[from] ArbiterError),

    #[error("Routine {0} has no paths")]
    NoPaths(String),

    #[error("No routine named {0}")]
    UnknownRoutine(String),

    #[error("Routine {0} is unavailable: {1}")]
    Unavailable(String, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoutineBuilder {
    pub fn new(traj_params: Params, layout_params: LayoutParams, paths_dir: PathBuf) -> Self {
        Self {
            traj_params,
            layout_params,
            paths_dir,
        }
    }

    /// Build the task tree of a routine, loading all of its paths.
    pub fn build(&self, spec: &RoutineSpec) -> Result<Box<dyn Task>, RoutineError> {
        match spec.kind {
            RoutineKind::Follow { ref paths } => self.follow_chain(&spec.name, paths),
            RoutineKind::GalacticSearch {
                ref paths,
                classify_timeout_s,
            } => self.galactic_search(paths, classify_timeout_s),
            RoutineKind::ShootAndDrive {
                shooter_speed_rpm,
                spin_up_s,
                shoot_s,
                ref path,
            } => self.shoot_and_drive(shooter_speed_rpm, spin_up_s, shoot_s, path),
        }
    }

    fn load_path(&self, file: &str) -> Result<SampledPath, RoutineError> {
        SampledPath::load(self.paths_dir.join(file), &self.traj_params.profile)
            .map_err(|e| RoutineError::PathError(file.to_string(), e))
    }

    fn follow(&self, file: &str, path: SampledPath) -> Box<dyn Task> {
        FollowPath::new(file, self.traj_params.clone(), path).boxed()
    }

    /// Follow each path in turn, starting from the start of the first.
    fn follow_chain(&self, name: &str, files: &[String]) -> Result<Box<dyn Task>, RoutineError> {
        if files.is_empty() {
            return Err(RoutineError::NoPaths(name.to_string()));
        }

        let mut tasks = Vec::with_capacity(files.len() + 1);
        for (i, file) in files.iter().enumerate() {
            let path = self.load_path(file)?;
            if i == 0 {
                tasks.push(reset_pose_to(&path).boxed());
            }
            tasks.push(self.follow(file, path));
        }

        Ok(Sequence::new(name, tasks).boxed())
    }

    /// Drive a path with the intake deployed and running.
    ///
    /// The intake is stopped and retracted however the path ends.
    fn pickup(&self, file: &str) -> Result<Box<dyn Task>, RoutineError> {
        let path = self.load_path(file)?;

        let intake = StartEnd::new(
            "Intake",
            |robot: &mut Robot| {
                robot.intake.extend();
                robot.intake.start();
            },
            |robot: &mut Robot| {
                robot.intake.stop();
                robot.intake.retract();
            },
        );
        let drive = Sequence::new(
            &format!("Pickup {}", file),
            vec![reset_pose_to(&path).boxed(), self.follow(file, path)],
        );

        Ok(Race::new("Pickup", vec![drive.boxed(), intake.boxed()]).boxed())
    }

    fn galactic_search(
        &self,
        paths: &LayoutPaths,
        classify_timeout_s: Option<f64>,
    ) -> Result<Box<dyn Task>, RoutineError> {
        let mut routines = Vec::with_capacity(Layout::ALL.len());
        for config in self.layout_params.layouts.iter() {
            routines.push((config.layout, self.pickup(paths.get(config.layout))?));
        }

        let classify = ClassifyLayout::new(&self.layout_params, routines)?;

        Ok(match classify_timeout_s {
            Some(t) => classify.with_timeout(t).boxed(),
            None => classify.boxed(),
        })
    }

    /// Shoot the preloaded power cells then drive a path.
    fn shoot_and_drive(
        &self,
        shooter_speed_rpm: f64,
        spin_up_s: f64,
        shoot_s: f64,
        file: &str,
    ) -> Result<Box<dyn Task>, RoutineError> {
        let path = self.load_path(file)?;

        let spin = StartEnd::new(
            "Shooter",
            move |robot: &mut Robot| robot.shooter.set_speed(shooter_speed_rpm),
            |robot: &mut Robot| robot.shooter.stop(),
        );
        let feed = StartEnd::new(
            "Feed",
            |robot: &mut Robot| robot.intake.start(),
            |robot: &mut Robot| robot.intake.stop(),
        );
        // The shooter spins until feeding has finished
        let shoot = Race::new(
            "Shoot",
            vec![
                spin.boxed(),
                Sequence::new(
                    "Spin up then feed",
                    vec![Wait::new(spin_up_s).boxed(), feed.with_timeout(shoot_s).boxed()],
                )
                .boxed(),
            ],
        );

        Ok(Sequence::new(
            "Shoot and drive",
            vec![
                shoot.boxed(),
                reset_pose_to(&path).boxed(),
                self.follow(file, path),
            ],
        )
        .boxed())
    }
}

impl RoutineRegistry {
    /// Build every routine once so that missing or broken paths are reported before the match.
    pub fn new(builder: RoutineBuilder, params: &RoutineParams) -> Self {
        let mut specs: Vec<RoutineSpec> = Vec::with_capacity(params.routines.len());
        let mut unavailable = Vec::new();

        for spec in params.routines.iter() {
            if specs.iter().any(|s| s.name == spec.name) {
                warn!("Duplicate routine {} ignored", spec.name);
                continue;
            }

            match builder.build(spec) {
                Ok(_) => info!("Routine {} available", spec.name),
                Err(e) => {
                    warn!("Routine {} unavailable: {}", spec.name, e);
                    unavailable.push((spec.name.clone(), e.to_string()));
                }
            }
            specs.push(spec.clone());
        }

        Self {
            builder,
            specs,
            unavailable,
        }
    }

    /// Names of all routines, with the reason the routine is unavailable if it is.
    pub fn routines(&self) -> Vec<(&str, Option<&str>)> {
        self.specs
            .iter()
            .map(|s| (s.name.as_str(), self.unavailable_reason(&s.name)))
            .collect()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name) && self.unavailable_reason(name).is_none()
    }

    /// Build a fresh task tree for the named routine.
    pub fn build(&self, name: &str) -> Result<Box<dyn Task>, RoutineError> {
        let spec = self
            .specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RoutineError::UnknownRoutine(name.to_string()))?;

        if let Some(reason) = self.unavailable_reason(name) {
            return Err(RoutineError::Unavailable(name.to_string(), reason.to_string()));
        }

        self.builder.build(spec)
    }

    fn unavailable_reason(&self, name: &str) -> Option<&str> {
        self.unavailable
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::auto_mgr::{AutoMgr, AutoMgrStatus, Tick},
        params::AutoExecParams,
        robot::mock::{mock_robot, Cmd},
        sim_client::{LayoutSource, SimDrivetrain, SimIntake, SimShooter},
    };
    use std::path::Path;

    fn builder() -> RoutineBuilder {
        RoutineBuilder::new(
            Params::default(),
            LayoutParams::default(),
            PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../paths")),
        )
    }

    fn spec(name: &str, kind: RoutineKind) -> RoutineSpec {
        RoutineSpec {
            name: name.to_string(),
            kind,
        }
    }

    fn params() -> RoutineParams {
        RoutineParams {
            paths_dir: "paths".into(),
            routines: vec![
                spec(
                    "drive",
                    RoutineKind::Follow {
                        paths: vec!["drive-off-line.json".into()],
                    },
                ),
                spec(
                    "missing",
                    RoutineKind::Follow {
                        paths: vec!["no-such-path.json".into()],
                    },
                ),
                spec("empty", RoutineKind::Follow { paths: vec![] }),
                spec(
                    "search",
                    RoutineKind::GalacticSearch {
                        paths: LayoutPaths {
                            a_red: "pickup-a-red.json".into(),
                            a_blue: "pickup-a-blue.json".into(),
                            b_red: "pickup-b-red.json".into(),
                            b_blue: "pickup-b-blue.json".into(),
                        },
                        classify_timeout_s: Some(1.0),
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_registry_availability() {
        let registry = RoutineRegistry::new(builder(), &params());

        assert!(registry.is_available("drive"));
        assert!(registry.is_available("search"));
        assert!(!registry.is_available("missing"));
        assert!(!registry.is_available("empty"));
        assert_eq!(registry.routines().len(), 4);

        assert!(matches!(
            registry.build("missing"),
            Err(RoutineError::Unavailable(..))
        ));
        assert!(matches!(
            registry.build("nothing"),
            Err(RoutineError::UnknownRoutine(_))
        ));
        assert!(registry.build("drive").is_ok());
    }

    #[test]
    fn test_builder_errors() {
        let b = builder();

        assert!(matches!(
            b.build(&spec("empty", RoutineKind::Follow { paths: vec![] })),
            Err(RoutineError::NoPaths(_))
        ));
        assert!(matches!(
            b.build(&spec(
                "missing",
                RoutineKind::Follow {
                    paths: vec!["no-such-path.json".into()]
                }
            )),
            Err(RoutineError::PathError(..))
        ));
    }

    #[test]
    fn test_search_timeout_stops_without_driving() {
        let registry = RoutineRegistry::new(builder(), &params());
        let (mut robot, handles) = mock_robot();

        let mut mgr = AutoMgr::new();
        mgr.start(registry.build("search").unwrap()).unwrap();

        // No detections, so the classification times out after 50 cycles
        let mut tick = Tick::default();
        let mut status = AutoMgrStatus::Running;
        for _ in 0..60 {
            tick = tick.next(0.02);
            status = mgr.step(&tick, &mut robot);
            if status != AutoMgrStatus::Running {
                break;
            }
        }

        assert_eq!(status, AutoMgrStatus::Done);
        assert!(!handles.take().contains(&Cmd::IntakeStart));
    }

    #[test]
    fn test_shoot_and_drive_sequence() {
        let (mut robot, handles) = mock_robot();
        let mut task = builder()
            .build(&spec(
                "shoot",
                RoutineKind::ShootAndDrive {
                    shooter_speed_rpm: 4000.0,
                    spin_up_s: 0.1,
                    shoot_s: 0.1,
                    path: "drive-off-line.json".into(),
                },
            ))
            .unwrap();

        task.init(&mut robot);
        let mut tick = Tick::default();
        for _ in 0..30 {
            tick = tick.next(0.02);
            task.advance(&tick, &mut robot);
        }
        task.end(true, &mut robot);

        let cmds = handles.take();
        let pos = |c: &Cmd| cmds.iter().position(|x| x == c).unwrap();

        assert!(pos(&Cmd::ShooterSpeed(4000.0)) < pos(&Cmd::IntakeStart));
        assert!(pos(&Cmd::IntakeStop) < pos(&Cmd::ShooterSpeed(0.0)));
        assert!(cmds.iter().any(|c| matches!(c, Cmd::SetPose(..))));
        assert_eq!(cmds.last(), Some(&Cmd::Brake(true)));
    }

    #[test]
    fn test_shipped_routines_complete() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
        let params_dir = root.join("params");

        let exec: AutoExecParams =
            util::params::load_from_path(&params_dir.join("auto_exec.toml")).unwrap();
        let traj_params: Params =
            util::params::load_from_path(&params_dir.join("traj_ctrl.toml")).unwrap();
        let layout_params: LayoutParams =
            util::params::load_from_path(&params_dir.join("layout.toml")).unwrap();
        let routine_params: RoutineParams =
            util::params::load_from_path(&params_dir.join("routines.toml")).unwrap();

        let paths_dir = root.join(&routine_params.paths_dir);
        let registry = RoutineRegistry::new(
            RoutineBuilder::new(
                traj_params.clone(),
                layout_params.clone(),
                paths_dir.clone(),
            ),
            &routine_params,
        );

        let layout = Layout::BRed;
        let config = layout_params
            .layouts
            .iter()
            .find(|c| c.layout == layout)
            .unwrap()
            .clone();

        for spec in routine_params.routines.iter() {
            let last_path = match spec.kind {
                RoutineKind::Follow { ref paths } => paths.last().unwrap().clone(),
                RoutineKind::GalacticSearch { ref paths, .. } => paths.get(layout).to_string(),
                RoutineKind::ShootAndDrive { ref path, .. } => path.clone(),
            };
            let end = SampledPath::load(paths_dir.join(&last_path), &traj_params.profile)
                .unwrap()
                .end_point();

            let mut robot = Robot {
                drivetrain: Box::new(SimDrivetrain::new(exec.sim.start_pose())),
                intake: Box::new(SimIntake::default()),
                shooter: Box::new(SimShooter::default()),
                pixy: Box::new(LayoutSource::new(config.clone())),
            };

            let mut mgr = AutoMgr::new();
            mgr.start(registry.build(&spec.name).unwrap()).unwrap();

            let mut tick = Tick::default();
            let mut status = AutoMgrStatus::Running;
            while status == AutoMgrStatus::Running && tick.elapsed_s < exec.autonomous_period_s {
                tick = tick.next(exec.cycle_period_s);
                robot.periodic(tick.dt_s);
                status = mgr.step(&tick, &mut robot);
            }

            let pose = robot.drivetrain.get_pose();
            assert_eq!(
                status,
                AutoMgrStatus::Done,
                "{} not done after {:.2} s at {:?}",
                spec.name,
                tick.elapsed_s,
                pose
            );
            assert!(
                (pose.position_m - end).norm() < 0.1,
                "{} ended at {:?}, path ends at {:?}",
                spec.name,
                pose.position_m,
                end
            );
        }
    }
}
