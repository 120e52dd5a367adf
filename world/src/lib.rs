#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the Waypath navigation engine.
//!
//! The world owns the obstacle field and the agent roster. Every mutation
//! arrives as a [`Command`] through [`apply`], and every observable outcome
//! leaves as an [`Event`]. Path planning and per-agent motion are delegated to
//! the pathfinding and motion systems; the world only sequences them.

use std::time::Duration;

use log::debug;
use waypath_core::{AgentId, Command, Event, MotionState, ObstacleField, WorldPosition};
use waypath_system_motion::{Agent, MotionConfig, RouteEnd, StepReport};
use waypath_system_pathfinding::{plan_pixel_path, PathOptions};

const DEFAULT_FIELD_COLUMNS: u32 = 10;
const DEFAULT_FIELD_ROWS: u32 = 10;
const DEFAULT_TILE_LENGTH: f32 = 50.0;

/// Represents the authoritative navigation world.
#[derive(Debug)]
pub struct World {
    field: ObstacleField,
    agents: Vec<Agent>,
    path_options: PathOptions,
    motion: MotionConfig,
    next_agent_id: u32,
    tick_index: u64,
}

impl World {
    /// Creates a world with an all-walkable default field and no agents.
    #[must_use]
    pub fn new() -> Self {
        Self {
            field: ObstacleField::new(
                DEFAULT_FIELD_COLUMNS,
                DEFAULT_FIELD_ROWS,
                DEFAULT_TILE_LENGTH,
            ),
            agents: Vec::new(),
            path_options: PathOptions::default(),
            motion: MotionConfig::default(),
            next_agent_id: 0,
            tick_index: 0,
        }
    }

    /// Uses `options` for every subsequent move request.
    #[must_use]
    pub fn with_path_options(mut self, options: PathOptions) -> Self {
        self.path_options = options;
        self
    }

    /// Uses `config` for every subsequently spawned agent.
    #[must_use]
    pub fn with_motion_config(mut self, config: MotionConfig) -> Self {
        self.motion = config;
        self
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&agent, Agent::id).ok()
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        let index = self.agent_index(agent)?;
        self.agents.get_mut(index)
    }

    fn spawn(
        &mut self,
        position: WorldPosition,
        radius: Option<f32>,
        speed: Option<f32>,
    ) -> Option<AgentId> {
        if !position.is_finite() {
            return None;
        }

        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = self.next_agent_id.checked_add(1)?;

        let mut agent = Agent::new(id, position, self.motion);
        if let Some(radius) = radius {
            agent = agent.with_radius(radius);
        }
        if let Some(speed) = speed {
            agent = agent.with_speed(speed);
        }
        self.agents.push(agent);
        Some(id)
    }

    fn request_move(&mut self, agent: AgentId, goal: WorldPosition, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(agent) else {
            return;
        };
        let start = self.agents[index].position();
        if !self.agents[index].state().is_alive() {
            return;
        }

        match plan_pixel_path(&self.field, start, goal, &self.path_options) {
            Ok(path) => {
                let waypoints = path.len();
                let actor = &mut self.agents[index];
                let previous = actor.state();
                actor.set_path(path.into_waypoints());
                out_events.push(Event::PathAssigned { agent, waypoints });
                push_state_change(actor, previous, out_events);
            }
            Err(error) => {
                debug!("agent {} has no path: {error}", agent.get());
                out_events.push(Event::PathNotFound {
                    agent,
                    goal,
                    reason: error.failure(),
                });
            }
        }
    }

    fn kill(&mut self, agent: AgentId, out_events: &mut Vec<Event>) {
        let Some(victim) = self.agent_mut(agent) else {
            return;
        };
        if !victim.state().is_alive() {
            return;
        }
        victim.kill();
        out_events.push(Event::AgentStateChanged {
            agent,
            state: MotionState::Dead,
        });

        for attacker in &mut self.agents {
            if attacker.attack_target() == Some(agent) {
                attacker.clear_attack();
                out_events.push(Event::AgentStateChanged {
                    agent: attacker.id(),
                    state: attacker.state(),
                });
            }
        }
    }

    /// Advances agents in id order. The sibling view is captured once and
    /// refreshed with each agent's snapshot after it moves, so later agents
    /// see positions reached earlier in the same tick.
    fn advance_agents(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut siblings = query::agent_view(self);
        for agent in &mut self.agents {
            if agent.target().is_none() {
                continue;
            }

            let report = agent.advance(dt, &self.field, &siblings);
            siblings.update(agent.snapshot());
            record_step(agent.id(), &report, out_events);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureField {
            columns,
            rows,
            tile_length,
        } => {
            world.field = ObstacleField::new(columns, rows, tile_length);
            world.agents.clear();
            out_events.push(Event::FieldConfigured {
                columns,
                rows,
                tile_length,
            });
        }
        Command::SetWalkable { tile, walkable } => {
            if world.field.set_walkable(tile, walkable) {
                out_events.push(Event::WalkabilityChanged { tile, walkable });
            }
        }
        Command::SpawnAgent {
            position,
            radius,
            speed,
        } => {
            if let Some(agent) = world.spawn(position, radius, speed) {
                out_events.push(Event::AgentSpawned { agent, position });
            }
        }
        Command::RequestMove { agent, goal } => world.request_move(agent, goal, out_events),
        Command::SetTarget { agent, target } => {
            if let Some(actor) = world.agent_mut(agent) {
                let previous = actor.state();
                actor.set_target(target);
                push_state_change(actor, previous, out_events);
            }
        }
        Command::CancelMove { agent } => {
            if let Some(actor) = world.agent_mut(agent) {
                if actor.target().is_some() {
                    let previous = actor.state();
                    actor.cancel_move();
                    out_events.push(Event::MoveCancelled { agent });
                    push_state_change(actor, previous, out_events);
                }
            }
        }
        Command::AssignAttack { agent, target } => {
            let target_alive = world
                .agent_index(target)
                .is_some_and(|index| world.agents[index].state().is_alive());
            if !target_alive || target == agent {
                return;
            }
            if let Some(actor) = world.agent_mut(agent) {
                let previous = actor.state();
                actor.set_attack_target(target);
                push_state_change(actor, previous, out_events);
            }
        }
        Command::KillAgent { agent } => world.kill(agent, out_events),
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_agents(dt, out_events);
        }
    }
}

fn push_state_change(agent: &Agent, previous: MotionState, out_events: &mut Vec<Event>) {
    if agent.state() != previous {
        out_events.push(Event::AgentStateChanged {
            agent: agent.id(),
            state: agent.state(),
        });
    }
}

fn record_step(agent: AgentId, report: &StepReport, out_events: &mut Vec<Event>) {
    for &(index, cause) in &report.skipped {
        out_events.push(Event::WaypointSkipped {
            agent,
            index,
            cause,
        });
    }

    if let Some(kind) = report.movement {
        if report.from != report.to {
            out_events.push(Event::AgentMoved {
                agent,
                from: report.from,
                to: report.to,
                kind,
            });
        }
    }

    match report.finished {
        Some(RouteEnd::Arrived) => out_events.push(Event::AgentArrived {
            agent,
            position: report.to,
        }),
        Some(RouteEnd::Abandoned) => out_events.push(Event::MoveCancelled { agent }),
        None => {}
    }

    if report.state_changed() {
        out_events.push(Event::AgentStateChanged {
            agent,
            state: report.state,
        });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use waypath_core::{AgentId, AgentView, ObstacleField};
    use waypath_system_motion::{Agent, MotionConfig};
    use waypath_system_pathfinding::PathOptions;

    /// Provides read-only access to the obstacle field.
    #[must_use]
    pub fn field(world: &World) -> &ObstacleField {
        &world.field
    }

    /// Captures a read-only view of every agent, ordered by identifier.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(Agent::snapshot).collect())
    }

    /// Looks up a single agent.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<&Agent> {
        world
            .agent_index(agent)
            .and_then(|index| world.agents.get(index))
    }

    /// Every agent in ascending identifier order.
    #[must_use]
    pub fn agents(world: &World) -> &[Agent] {
        &world.agents
    }

    /// Options applied to move requests.
    #[must_use]
    pub fn path_options(world: &World) -> PathOptions {
        world.path_options
    }

    /// Configuration handed to newly spawned agents.
    #[must_use]
    pub fn motion_config(world: &World) -> MotionConfig {
        world.motion
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
