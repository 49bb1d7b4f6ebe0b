//! Path preview executable entry point.
//!
//! # Architecture
//!
//! The executable previews how the robot would drive a saved path:
//!
//!     - Initialise the session and logging
//!     - Load the graph and simulation parameters
//!     - Load the path record and rebuild the path graph from it
//!     - Generate drive commands from the graph and play them back through
//!       the simulator
//!     - Archive the simulated trajectory and the command reports into the
//!       session directory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use path_lib::{
    graph::{GraphParams, PathGraph, PathRecord, TurnDirection},
    sim::{CommandOutcome, Playback, SimParams},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Preview the drive of a saved path.
#[derive(Debug, StructOpt)]
#[structopt(name = "path_exec")]
struct Opt {
    /// Path record (JSON) to preview.
    #[structopt(parse(from_os_str))]
    path_file: PathBuf,

    /// Minimum level of log records to output.
    #[structopt(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Stop the playback after this many ticks.
    #[structopt(short, long)]
    max_ticks: Option<usize>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("path_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(opt.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Path Preview Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let graph_params: GraphParams = load_params_or_default("path_graph.toml");
    let sim_params: SimParams = load_params_or_default("sim.toml");

    info!("Parameters loaded");

    // ---- LOAD PATH ----

    let record_str = std::fs::read_to_string(&opt.path_file)
        .wrap_err_with(|| format!("Could not read the path file {:?}", opt.path_file))?;
    let record: PathRecord = serde_json::from_str(&record_str)
        .wrap_err("Could not parse the path record")?;

    let graph = PathGraph::load(&record, graph_params)
        .wrap_err("Could not build the path from the record")?;

    log_graph(&graph);

    // ---- PLAYBACK ----

    let mut playback = Playback::from_graph(&graph, sim_params);
    let mut states = vec![*playback.state()];

    match opt.max_ticks {
        Some(n) => {
            states.extend(playback.by_ref().take(n));
            if !playback.is_finished() {
                warn!("Playback stopped after the {} tick limit", n);
            }
        }
        None => states.extend(playback.by_ref()),
    }

    let reports = playback.reports();
    let num_failed = reports
        .iter()
        .filter(|r| r.outcome != CommandOutcome::Completed)
        .count();

    if let Some(last) = states.last() {
        info!(
            "Playback ended after {} ticks ({:.2} s) at ({:.2}, {:.2}) heading {:.3} rad",
            last.tick,
            last.time_s,
            last.x_in,
            last.y_in,
            last.heading_rad
        );
    }
    if num_failed > 0 {
        warn!("{} of {} commands did not complete", num_failed, reports.len());
    }

    // ---- ARCHIVE ----

    let mut arch = Archiver::from_path(&session, "sim/trajectory.csv")
        .wrap_err("Could not create the trajectory archive")?;
    arch.serialise_all(states.iter())
        .wrap_err("Could not archive the trajectory")?;

    session
        .save_json("sim/reports.json", &reports)
        .wrap_err("Could not save the command reports")?;
    session
        .save_json("path.json", &graph.to_record())
        .wrap_err("Could not save the path record")?;

    info!("Archived {} states to {:?}", arch.num_records(), session.arch_root);

    Ok(())
}

/// Load a parameter file, falling back to the defaults if it cannot be
/// loaded.
fn load_params_or_default<P>(file: &str) -> P
where
    P: DeserializeOwned + Default
{
    match util::params::load(file) {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not load {}, using default parameters: {}", file, e);
            P::default()
        }
    }
}

/// Summarise the derived path in the log.
fn log_graph(graph: &PathGraph) {
    info!(
        "Path has {} waypoints and {} segments",
        graph.num_waypoints(),
        graph.num_segments()
    );

    for (i, seg) in graph.segments().iter().enumerate() {
        match seg.radius_in() {
            Some(r) => info!(
                "    Segment {}: curve of radius {:.2} in, length {:.2} in{}",
                i,
                r,
                seg.arc_length_in(),
                if seg.reversed { " (reversed)" } else { "" }
            ),
            None => info!(
                "    Segment {}: straight, length {:.2} in{}",
                i,
                seg.arc_length_in(),
                if seg.reversed { " (reversed)" } else { "" }
            ),
        }

        let wp = &graph.waypoints()[i + 1];
        if wp.turn != TurnDirection::None {
            info!("    Waypoint {}: turn {:?}", i + 1, wp.turn);
        }
    }
}
