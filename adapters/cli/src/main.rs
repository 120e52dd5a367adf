#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs navigation scenarios headlessly.

mod config;
mod layout_transfer;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use waypath_core::{Event, MotionState};
use waypath_world::{self as world, query, World};

use crate::{
    config::{ScenarioConfig, ScenarioPlan},
    layout_transfer::FieldLayout,
};

const BUNDLED_SCENARIO: &str = include_str!("../scenarios/corridor.toml");

/// Runs a navigation scenario and prints a summary of what the agents did.
#[derive(Debug, Parser)]
#[command(name = "waypath", version, about)]
struct Args {
    /// Scenario file to run. Defaults to the bundled corridor scenario.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Overrides the number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u32>,

    /// Overrides the tick delta in milliseconds.
    #[arg(long)]
    dt_ms: Option<u64>,

    /// Enables debug logging unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,

    /// Prints the obstacle layout string for the scenario and exits.
    #[arg(long)]
    export_layout: bool,
}

/// Entry point for the Waypath command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let contents = match &args.scenario {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?,
        None => BUNDLED_SCENARIO.to_owned(),
    };
    let mut scenario =
        ScenarioConfig::from_toml_str(&contents).context("failed to load scenario")?;
    if let Some(ticks) = args.ticks {
        scenario.run.ticks = ticks;
    }
    if let Some(dt_ms) = args.dt_ms {
        scenario.run.dt_ms = dt_ms;
    }

    let field = scenario
        .build_field()
        .context("failed to build obstacle field")?;
    if args.export_layout {
        let layout = FieldLayout::from_field(&field)
            .encode()
            .context("failed to encode obstacle layout")?;
        println!("{layout}");
        return Ok(());
    }

    let plan = scenario.plan(&field).context("invalid scenario")?;
    info!(
        "running {} ticks of {:?} on a {}x{} field",
        plan.ticks,
        plan.dt,
        field.columns(),
        field.rows()
    );

    let mut world = World::new()
        .with_path_options(scenario.path)
        .with_motion_config(scenario.motion);
    let summary = run_scenario(&mut world, plan);
    print_summary(&world, &summary);
    Ok(())
}

/// Tallies of the events observed during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RunSummary {
    paths_assigned: usize,
    paths_not_found: usize,
    moves: usize,
    slides: usize,
    skips: usize,
    arrivals: usize,
    cancellations: usize,
    elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, event: &Event) {
        match event {
            Event::PathAssigned { .. } => self.paths_assigned += 1,
            Event::PathNotFound { agent, reason, .. } => {
                debug!("agent {} found no path: {reason:?}", agent.get());
                self.paths_not_found += 1;
            }
            Event::AgentMoved { kind, .. } => {
                self.moves += 1;
                if *kind == waypath_core::MoveKind::Slide {
                    self.slides += 1;
                }
            }
            Event::WaypointSkipped { .. } => self.skips += 1,
            Event::AgentArrived { .. } => self.arrivals += 1,
            Event::MoveCancelled { .. } => self.cancellations += 1,
            Event::TimeAdvanced { dt } => self.elapsed += *dt,
            Event::FieldConfigured { .. }
            | Event::WalkabilityChanged { .. }
            | Event::AgentSpawned { .. }
            | Event::AgentStateChanged { .. } => {}
        }
    }
}

fn run_scenario(world: &mut World, plan: ScenarioPlan) -> RunSummary {
    let ScenarioPlan {
        setup,
        mut edits,
        ticks,
        dt,
    } = plan;
    let mut summary = RunSummary::default();
    let mut events = Vec::new();

    for command in setup {
        world::apply(world, command, &mut events);
    }

    for tick in 0..ticks {
        for command in edits.remove(&tick).unwrap_or_default() {
            world::apply(world, command, &mut events);
        }
        world::apply(world, waypath_core::Command::Tick { dt }, &mut events);

        for event in events.drain(..) {
            summary.record(&event);
        }
    }
    for event in events.drain(..) {
        summary.record(&event);
    }

    summary
}

fn print_summary(world: &World, summary: &RunSummary) {
    println!(
        "simulated {:.2}s: {} paths assigned, {} requests without path",
        summary.elapsed.as_secs_f32(),
        summary.paths_assigned,
        summary.paths_not_found
    );
    println!(
        "{} moves ({} slides), {} waypoint skips, {} arrivals, {} cancellations",
        summary.moves, summary.slides, summary.skips, summary.arrivals, summary.cancellations
    );

    for agent in query::agents(world) {
        let position = agent.position();
        let status = match (agent.state(), agent.destination()) {
            (MotionState::Dead, _) => "dead".to_owned(),
            (_, Some(destination)) => format!(
                "{:?}, {:.1}px from ({:.1}, {:.1})",
                agent.state(),
                position.distance(destination),
                destination.x(),
                destination.y()
            ),
            (state, None) => format!("{state:?}"),
        };
        println!(
            "agent {:>3} at ({:>7.1}, {:>7.1}) {status}",
            agent.id().get(),
            position.x(),
            position.y()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenario_runs_to_completion() {
        let scenario = ScenarioConfig::from_toml_str(BUNDLED_SCENARIO).expect("scenario parses");
        let field = scenario.build_field().expect("field builds");
        let plan = scenario.plan(&field).expect("scenario plans");
        let ticks = plan.ticks;
        let dt = plan.dt;
        let mut world = World::new()
            .with_path_options(scenario.path)
            .with_motion_config(scenario.motion);

        let summary = run_scenario(&mut world, plan);

        assert_eq!(summary.elapsed, dt * ticks);
        assert!(summary.paths_assigned >= 3);
        assert!(summary.arrivals >= 1);
        assert!(summary.moves > 0);
        assert!(!query::field(&world).is_walkable(waypath_core::TileCoord::new(11, 3)));
    }
}
