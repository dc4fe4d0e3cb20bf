//! # Layout Test
//!
//! Runs the layout classification on the simulated sensor and prints the error of every layout
//! and the vote each cycle, until a layout is decided.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    thread,
    time::{Duration, Instant},
};

use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use structopt::StructOpt;

use auto_lib::{
    auto::layout::{ArbiterState, CycleReport, LayoutParams, VoteArbiter},
    params::AutoExecParams,
    sim_client,
};
use util::{
    host,
    logger::{logger_init, LevelFilter, LogParams},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Errors are capped to this value for display
const DISPLAY_ERROR_CAP: i64 = 999_999;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "layout_test", about = "Prints per-cycle layout errors and votes")]
struct Opt {
    /// Stop after this many cycles if no layout has been decided
    #[structopt(long, default_value = "500")]
    max_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("layout_test", "sessions").wrap_err("Failed to create the session")?;
    logger_init(&LogParams::new(LevelFilter::Info), &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Layout Test\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: AutoExecParams =
        util::params::load("auto_exec.toml").wrap_err("Could not load exec params")?;
    let layout_params: LayoutParams =
        util::params::load("layout.toml").wrap_err("Could not load layout params")?;

    // ---- MODULE INIT ----

    let sw_root = host::get_sw_root().wrap_err("Failed to get the software root")?;
    let mut robot = sim_client::sim_robot(&exec_params.sim, &layout_params, &sw_root)
        .wrap_err("Failed to initialise the simulated robot")?;

    let mut arbiter = VoteArbiter::new(&layout_params).wrap_err("Failed to create the arbiter")?;
    arbiter.start();

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    for cycle in 0..opt.max_cycles {
        let cycle_start_instant = Instant::now();

        let dets = robot.pixy.poll();
        let report = arbiter.process(&dets);
        info!("{:>5} | {}", cycle, format_report(&report));

        if let ArbiterState::Decided(layout) = report.state {
            info!("Decided: pickup path {}", layout);
            return Ok(());
        }

        if let Some(d) = cycle_period.checked_sub(Instant::now() - cycle_start_instant) {
            thread::sleep(d);
        }
    }

    arbiter.abort();
    warn!("No layout decided after {} cycles", opt.max_cycles);

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn format_report(report: &CycleReport) -> String {
    let mut s = String::new();

    for (layout, error) in report.errors.iter() {
        s.push_str(&format!(
            "{}: {:_>6} | ",
            layout,
            (*error).min(DISPLAY_ERROR_CAP)
        ));
    }
    s.push_str(&format!("best: {}", report.vote));

    s
}
