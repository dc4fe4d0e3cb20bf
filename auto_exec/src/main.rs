//! Main autonomy executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Build the selected routine
//!     - Main loop:
//!         - Equipment processing
//!         - Autonomy processing (AutoMgr step)
//!         - Autonomous period management
//!
//! # Usage
//!
//! ```text
//! auto_exec list
//! auto_exec run <routine>
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use auto_lib::{
    auto::{
        auto_mgr::{AutoMgrStatus, RoutineBuilder, RoutineParams, RoutineRegistry, Tick},
        layout::LayoutParams,
        traj_ctrl, AutoMgr,
    },
    params::AutoExecParams,
    sim_client,
};
use util::{
    host,
    logger::logger_init,
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "auto_exec", about = "Runs an autonomous routine on the simulated robot")]
enum Opt {
    /// List the available routines
    #[structopt(name = "list")]
    List,

    /// Run a routine
    #[structopt(name = "run")]
    Run {
        /// Name of the routine, as given in routines.toml
        routine: String,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("auto_exec", "sessions").wrap_err("Failed to create the session")?;

    // Exec params hold the log levels, so are loaded before the logger
    let exec_params: AutoExecParams =
        util::params::load("auto_exec.toml").wrap_err("Could not load exec params")?;

    // Initialise logger
    logger_init(&exec_params.log, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Autonomy Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let layout_params: LayoutParams =
        util::params::load("layout.toml").wrap_err("Could not load layout params")?;
    let traj_params: traj_ctrl::Params =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;
    let routine_params: RoutineParams =
        util::params::load("routines.toml").wrap_err("Could not load routine params")?;

    info!("Parameters loaded");

    if !(exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "Expected a positive cycle period, found {}",
            exec_params.cycle_period_s
        ));
    }

    // ---- BUILD ROUTINES ----

    let sw_root = host::get_sw_root().wrap_err("Failed to get the software root")?;
    let builder = RoutineBuilder::new(
        traj_params,
        layout_params.clone(),
        sw_root.join(&routine_params.paths_dir),
    );
    let registry = RoutineRegistry::new(builder, &routine_params);

    let routine = match opt {
        Opt::List => {
            for (name, unavailable) in registry.routines() {
                match unavailable {
                    None => info!("    {}", name),
                    Some(reason) => info!("    {} (unavailable: {})", name, reason),
                }
            }
            return Ok(());
        }
        Opt::Run { routine } => routine,
    };

    let task = registry
        .build(&routine)
        .wrap_err_with(|| format!("Failed to build routine {}", routine))?;

    // ---- MODULE INIT ----

    let mut robot = sim_client::sim_robot(&exec_params.sim, &layout_params, &sw_root)
        .wrap_err("Failed to initialise the simulated robot")?;
    info!("Simulated robot initialised");

    let mut auto_mgr = AutoMgr::new();
    auto_mgr
        .start(task)
        .wrap_err("Failed to start the routine")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut tick = Tick::default();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        tick = tick.next(exec_params.cycle_period_s);

        // ---- EQUIPMENT PROCESSING ----

        robot.periodic(tick.dt_s);

        // ---- AUTONOMY PROCESSING ----

        match auto_mgr.step(&tick, &mut robot) {
            AutoMgrStatus::Running => (),
            AutoMgrStatus::Done => {
                info!("Routine {} complete after {:.02} s", routine, tick.elapsed_s);
                break;
            }
            AutoMgrStatus::Aborted => {
                warn!("Routine {} aborted after {:.02} s", routine, tick.elapsed_s);
                break;
            }
            AutoMgrStatus::Off => break,
        }

        if tick.elapsed_s >= exec_params.autonomous_period_s {
            warn!("Autonomous period over, aborting {}", routine);
            auto_mgr.abort(&mut robot);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    let pose = robot.drivetrain.get_pose();
    info!(
        "Final pose: ({:.03}, {:.03}) m, {:.03} rad",
        pose.position_m[0], pose.position_m[1], pose.heading_rad
    );

    Ok(())
}
