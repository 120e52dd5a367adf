#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-agent motion controller that drives pixel paths frame by frame.
//!
//! An [`Agent`] owns its route and recovery timers. Each call to
//! [`Agent::advance`] follows the route toward the current waypoint, mixes in
//! separation steering from nearby living agents, rejects steps that would
//! clip an obstacle or overlap a sibling, and falls back to slides when the
//! desired step is rejected. Standstill and stuck timers force waypoint skips
//! so that an agent never waits forever on a step it cannot take.

mod collision;
mod config;
mod steering;

use std::time::Duration;

use log::{debug, trace};
use waypath_core::{
    AgentId, AgentSnapshot, AgentView, MotionState, MoveKind, ObstacleField, SkipCause,
    WorldPosition,
};

use crate::collision::CollisionProbe;

pub use config::MotionConfig;

/// Distance at which a direct target counts as reached, in pixels.
const DIRECT_ARRIVAL: f32 = 1.0;

/// How a route stopped being followed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteEnd {
    /// The final waypoint or direct target was reached, or the agent stood
    /// still close enough to it.
    Arrived,
    /// The route was given up after its remaining waypoints were skipped.
    Abandoned,
}

/// Everything that happened to an agent during one [`Agent::advance`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Position before the step.
    pub from: WorldPosition,
    /// Position after the step.
    pub to: WorldPosition,
    /// How the position update was obtained, if one was committed.
    pub movement: Option<MoveKind>,
    /// Waypoints abandoned during the step, in the order they were skipped.
    pub skipped: Vec<(usize, SkipCause)>,
    /// Set when the route ended during the step.
    pub finished: Option<RouteEnd>,
    /// State before the step.
    pub previous_state: MotionState,
    /// State after the step.
    pub state: MotionState,
}

impl StepReport {
    fn begin(agent: &Agent) -> Self {
        Self {
            from: agent.position,
            to: agent.position,
            movement: None,
            skipped: Vec::new(),
            finished: None,
            previous_state: agent.state,
            state: agent.state,
        }
    }

    fn finish(mut self, agent: &Agent) -> Self {
        self.to = agent.position;
        self.state = agent.state;
        self
    }

    /// Reports whether the step changed the motion state.
    #[must_use]
    pub fn state_changed(&self) -> bool {
        self.previous_state != self.state
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Route {
    Stationary,
    Path {
        waypoints: Vec<WorldPosition>,
        next: usize,
    },
    Direct(WorldPosition),
}

/// A single agent driven by the motion controller.
#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    position: WorldPosition,
    config: MotionConfig,
    state: MotionState,
    route: Route,
    attack_target: Option<AgentId>,
    standstill_elapsed: Duration,
    standstill_anchor: WorldPosition,
    stuck_elapsed: Duration,
    best_distance: f32,
}

impl Agent {
    /// Creates an idle agent using the radius and speed from `config`.
    #[must_use]
    pub fn new(id: AgentId, position: WorldPosition, config: MotionConfig) -> Self {
        Self {
            id,
            position,
            config,
            state: MotionState::Idle,
            route: Route::Stationary,
            attack_target: None,
            standstill_elapsed: Duration::ZERO,
            standstill_anchor: position,
            stuck_elapsed: Duration::ZERO,
            best_distance: f32::INFINITY,
        }
    }

    /// Overrides the collision radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.config.radius = radius;
        self
    }

    /// Overrides the travel speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.config.speed = speed;
        self
    }

    /// Identifier of the agent.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Current pixel position.
    #[must_use]
    pub fn position(&self) -> WorldPosition {
        self.position
    }

    /// Collision radius in pixels.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.config.radius
    }

    /// Travel speed in pixels per second.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.config.speed
    }

    /// Current motion state.
    #[must_use]
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Waypoints of the active path, or an empty slice.
    #[must_use]
    pub fn path(&self) -> &[WorldPosition] {
        match &self.route {
            Route::Path { waypoints, .. } => waypoints,
            Route::Stationary | Route::Direct(_) => &[],
        }
    }

    /// Index of the waypoint currently steered toward.
    #[must_use]
    pub fn waypoint_index(&self) -> Option<usize> {
        match &self.route {
            Route::Path { next, .. } => Some(*next),
            Route::Stationary | Route::Direct(_) => None,
        }
    }

    /// Reports whether a path is being followed.
    #[must_use]
    pub fn has_path(&self) -> bool {
        matches!(self.route, Route::Path { .. })
    }

    /// Immediate movement target: the current waypoint or the direct target.
    #[must_use]
    pub fn target(&self) -> Option<WorldPosition> {
        match &self.route {
            Route::Stationary => None,
            Route::Path { waypoints, next } => waypoints.get(*next).copied(),
            Route::Direct(target) => Some(*target),
        }
    }

    /// Final point of the active route.
    #[must_use]
    pub fn destination(&self) -> Option<WorldPosition> {
        match &self.route {
            Route::Stationary => None,
            Route::Path { waypoints, .. } => waypoints.last().copied(),
            Route::Direct(target) => Some(*target),
        }
    }

    /// Agent being attacked, if any.
    #[must_use]
    pub fn attack_target(&self) -> Option<AgentId> {
        self.attack_target
    }

    /// Immutable view of the agent handed to siblings.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            radius: self.config.radius,
            state: self.state,
        }
    }

    /// Replaces any current route with `path` and starts walking it.
    ///
    /// An empty path cancels movement instead. Dead agents ignore the call.
    pub fn set_path(&mut self, path: Vec<WorldPosition>) {
        if !self.state.is_alive() {
            return;
        }
        if path.is_empty() {
            self.cancel_move();
            return;
        }

        self.route = Route::Path {
            waypoints: path,
            next: 0,
        };
        self.begin_walking();
    }

    /// Steers straight toward `target` without path search.
    pub fn set_target(&mut self, target: WorldPosition) {
        if !self.state.is_alive() {
            return;
        }

        self.route = Route::Direct(target);
        self.begin_walking();
    }

    /// Discards any path or direct target.
    pub fn cancel_move(&mut self) {
        self.route = Route::Stationary;
        self.reset_timers();
        if self.state == MotionState::Walking {
            self.state = MotionState::Idle;
        }
    }

    /// Switches to combat against `target`, discarding any route.
    pub fn set_attack_target(&mut self, target: AgentId) {
        if !self.state.is_alive() {
            return;
        }

        self.route = Route::Stationary;
        self.reset_timers();
        self.attack_target = Some(target);
        self.state = MotionState::Attacking;
    }

    /// Leaves combat and returns to idle.
    pub fn clear_attack(&mut self) {
        if self.state != MotionState::Attacking {
            return;
        }

        self.attack_target = None;
        self.state = MotionState::Idle;
    }

    /// Removes the agent from play. Dead is terminal.
    pub fn kill(&mut self) {
        self.route = Route::Stationary;
        self.attack_target = None;
        self.reset_timers();
        self.state = MotionState::Dead;
    }

    /// Runs one simulation step of `dt` against the field and sibling view.
    pub fn advance(
        &mut self,
        dt: Duration,
        field: &ObstacleField,
        siblings: &AgentView,
    ) -> StepReport {
        let mut report = StepReport::begin(self);
        let suspended = matches!(self.state, MotionState::Dead | MotionState::Attacking);
        if suspended || self.route == Route::Stationary {
            return report.finish(self);
        }

        if self.check_standstill(dt, &mut report) || self.follow_waypoints(&mut report) {
            return report.finish(self);
        }

        let Some(target) = self.target() else {
            return report.finish(self);
        };
        let origin = self.position.to_vec2();
        let heading = target.to_vec2() - origin;
        let distance = heading.length();

        if matches!(self.route, Route::Direct(_)) && distance <= DIRECT_ARRIVAL {
            self.end_route(RouteEnd::Arrived, &mut report);
            return report.finish(self);
        }

        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 || distance <= f32::EPSILON {
            return report.finish(self);
        }

        let travel = (self.config.speed * seconds).min(distance);
        let desired = heading / distance * travel
            + steering::separation(
                self.id,
                origin,
                siblings,
                self.config.separation_radius(),
                self.config.separation_strength * self.config.speed * seconds,
            );

        let probe = CollisionProbe {
            agent: self.id,
            origin,
            radius: self.config.radius,
            ring_radius: self.config.collision_ring_radius(),
            field,
            siblings,
        };

        let candidate = origin + desired;
        if probe.is_clear(candidate) {
            self.commit(candidate.into(), MoveKind::Direct, &mut report);
            self.stuck_elapsed = Duration::ZERO;
            self.best_distance = candidate.distance(target.to_vec2());
        } else if let Some(slide) = probe.recover(desired) {
            self.commit(slide.into(), MoveKind::Slide, &mut report);
            self.track_progress(slide.distance(target.to_vec2()), dt);
        } else {
            trace!("agent {} blocked at {:?}", self.id.get(), self.position);
            self.state = MotionState::Idle;
            self.stuck_elapsed += dt;
        }

        if self.stuck_elapsed >= self.config.stuck_threshold {
            self.escape_stuck(&mut report);
        }

        report.finish(self)
    }

    fn begin_walking(&mut self) {
        self.attack_target = None;
        self.reset_timers();
        self.state = MotionState::Walking;
    }

    fn reset_timers(&mut self) {
        self.standstill_elapsed = Duration::ZERO;
        self.standstill_anchor = self.position;
        self.stuck_elapsed = Duration::ZERO;
        self.best_distance = f32::INFINITY;
    }

    fn commit(&mut self, position: WorldPosition, kind: MoveKind, report: &mut StepReport) {
        trace!(
            "agent {} {:?} {:?} -> {:?}",
            self.id.get(),
            kind,
            self.position,
            position
        );
        self.position = position;
        self.state = MotionState::Walking;
        report.movement = Some(kind);
    }

    fn track_progress(&mut self, distance: f32, dt: Duration) {
        if distance < self.best_distance - self.config.stuck_epsilon {
            self.best_distance = distance;
            self.stuck_elapsed = Duration::ZERO;
        } else {
            self.stuck_elapsed += dt;
        }
    }

    /// Returns `true` when the route ended.
    fn check_standstill(&mut self, dt: Duration, report: &mut StepReport) -> bool {
        let Route::Path { waypoints, .. } = &self.route else {
            return false;
        };
        let destination = waypoints.last().copied();

        if self.position.distance(self.standstill_anchor) < self.config.standstill_epsilon {
            self.standstill_elapsed += dt;
        } else {
            self.standstill_elapsed = Duration::ZERO;
            self.standstill_anchor = self.position;
        }

        if self.standstill_elapsed < self.config.standstill_threshold {
            return false;
        }
        self.standstill_elapsed = Duration::ZERO;
        self.standstill_anchor = self.position;

        let close_enough = destination.is_some_and(|destination| {
            self.position.distance(destination) <= self.config.arrival_tolerance
        });
        if close_enough {
            debug!(
                "agent {} stood still near its destination; treating as arrived",
                self.id.get()
            );
            self.end_route(RouteEnd::Arrived, report);
            return true;
        }

        self.skip_waypoint(SkipCause::Standstill, report)
    }

    /// Moves past every waypoint already within reach. Returns `true` when
    /// the path was completed.
    fn follow_waypoints(&mut self, report: &mut StepReport) -> bool {
        let Route::Path { waypoints, next } = &mut self.route else {
            return false;
        };

        let mut advanced = false;
        while let Some(waypoint) = waypoints.get(*next) {
            let reach = if *next + 1 == waypoints.len() {
                self.config.arrival_reach
            } else {
                self.config.waypoint_reach
            };
            if self.position.distance(*waypoint) > reach.max(DIRECT_ARRIVAL) {
                break;
            }
            *next += 1;
            advanced = true;
        }
        let completed = *next >= waypoints.len();

        if completed {
            self.end_route(RouteEnd::Arrived, report);
        } else if advanced {
            self.stuck_elapsed = Duration::ZERO;
            self.best_distance = f32::INFINITY;
        }
        completed
    }

    /// Skips the current waypoint. Returns `true` when that ended the path.
    fn skip_waypoint(&mut self, cause: SkipCause, report: &mut StepReport) -> bool {
        let Route::Path { waypoints, next } = &mut self.route else {
            return false;
        };

        debug!(
            "agent {} skipping waypoint {} ({:?})",
            self.id.get(),
            *next,
            cause
        );
        report.skipped.push((*next, cause));
        *next += 1;
        let exhausted = *next >= waypoints.len();

        self.stuck_elapsed = Duration::ZERO;
        self.best_distance = f32::INFINITY;
        if exhausted {
            self.end_route(RouteEnd::Abandoned, report);
        }
        exhausted
    }

    fn escape_stuck(&mut self, report: &mut StepReport) {
        if self.has_path() {
            let _ = self.skip_waypoint(SkipCause::Stuck, report);
        } else if matches!(self.route, Route::Direct(_)) {
            debug!("agent {} gave up on its direct target", self.id.get());
            self.end_route(RouteEnd::Abandoned, report);
        }
    }

    fn end_route(&mut self, end: RouteEnd, report: &mut StepReport) {
        self.route = Route::Stationary;
        self.reset_timers();
        self.state = MotionState::Idle;
        report.finished = Some(end);
    }
}
