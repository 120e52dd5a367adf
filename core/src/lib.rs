#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Waypath navigation engine.
//!
//! This crate defines the value types and message surface that connect
//! adapters, the authoritative world, and the pure pathfinding and motion
//! systems. Adapters submit [`Command`] values describing desired mutations,
//! the world executes those commands via its `apply` entry point, and then
//! broadcasts [`Event`] values describing what happened. Tile coordinates and
//! pixel positions are distinct types; the only conversions between them go
//! through [`ObstacleField::world_to_tile`] and [`ObstacleField::tile_to_world`].

mod field;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use field::{Neighbors, ObstacleField};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the obstacle field with an all-walkable grid and drops every agent.
    ConfigureField {
        /// Number of tile columns laid out in the grid.
        columns: u32,
        /// Number of tile rows laid out in the grid.
        rows: u32,
        /// Length of each square tile measured in pixels.
        tile_length: f32,
    },
    /// Marks a single tile as walkable or blocked.
    SetWalkable {
        /// Tile being edited.
        tile: TileCoord,
        /// New walkability flag.
        walkable: bool,
    },
    /// Registers a new agent at the provided position.
    SpawnAgent {
        /// Pixel position of the agent's center.
        position: WorldPosition,
        /// Collision radius in pixels. Falls back to the configured default when absent.
        radius: Option<f32>,
        /// Travel speed in pixels per second. Falls back to the configured default when absent.
        speed: Option<f32>,
    },
    /// Plans a path from the agent's position to the goal and assigns it.
    RequestMove {
        /// Agent that should travel.
        agent: AgentId,
        /// Requested destination in pixels.
        goal: WorldPosition,
    },
    /// Steers the agent straight toward a point without path search.
    SetTarget {
        /// Agent that should travel.
        agent: AgentId,
        /// Destination in pixels.
        target: WorldPosition,
    },
    /// Discards any path or direct target held by the agent.
    CancelMove {
        /// Agent whose movement is cancelled.
        agent: AgentId,
    },
    /// Switches the agent into combat against another agent.
    AssignAttack {
        /// Agent that attacks.
        agent: AgentId,
        /// Agent being attacked.
        target: AgentId,
    },
    /// Removes the agent from play permanently.
    KillAgent {
        /// Agent that dies.
        agent: AgentId,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the obstacle field was replaced.
    FieldConfigured {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
        /// Tile edge length in pixels.
        tile_length: f32,
    },
    /// Confirms that a tile changed walkability.
    WalkabilityChanged {
        /// Tile that changed.
        tile: TileCoord,
        /// Walkability after the change.
        walkable: bool,
    },
    /// Confirms that an agent joined the simulation.
    AgentSpawned {
        /// Identifier allocated to the agent.
        agent: AgentId,
        /// Pixel position the agent occupies.
        position: WorldPosition,
    },
    /// Reports that a planned path was handed to an agent.
    PathAssigned {
        /// Agent that received the path.
        agent: AgentId,
        /// Number of pixel waypoints in the path.
        waypoints: usize,
    },
    /// Reports that no path could be planned; the agent was left untouched.
    PathNotFound {
        /// Agent that requested the path.
        agent: AgentId,
        /// Destination that could not be reached.
        goal: WorldPosition,
        /// Why planning failed.
        reason: PathFailure,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent changed position during a tick.
    AgentMoved {
        /// Agent that moved.
        agent: AgentId,
        /// Position before the tick.
        from: WorldPosition,
        /// Position after the tick.
        to: WorldPosition,
        /// Whether the desired step or a recovery slide was committed.
        kind: MoveKind,
    },
    /// Reports that an agent abandoned its current waypoint for the next one.
    WaypointSkipped {
        /// Agent that skipped.
        agent: AgentId,
        /// Index of the waypoint that was abandoned.
        index: usize,
        /// Heuristic that forced the skip.
        cause: SkipCause,
    },
    /// Reports that an agent finished its path or direct target.
    AgentArrived {
        /// Agent that arrived.
        agent: AgentId,
        /// Final resting position.
        position: WorldPosition,
    },
    /// Reports that an agent's movement was cancelled.
    MoveCancelled {
        /// Agent whose movement stopped.
        agent: AgentId,
    },
    /// Reports a transition of an agent's motion state.
    AgentStateChanged {
        /// Agent that transitioned.
        agent: AgentId,
        /// State after the transition.
        state: MotionState,
    },
}

/// Reasons a path request produced no path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathFailure {
    /// The start tile is blocked or outside the field.
    StartBlocked,
    /// The goal tile is blocked or outside the field.
    GoalBlocked,
    /// Search exhausted every reachable tile without finding the goal.
    Unreachable,
    /// Search hit its iteration cap.
    SearchExhausted,
}

/// How an agent's position update was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// The desired step was accepted unchanged.
    Direct,
    /// The desired step was rejected and a recovery slide was taken instead.
    Slide,
}

/// Heuristic that forced a waypoint skip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipCause {
    /// Distance to the waypoint stopped decreasing.
    Stuck,
    /// The agent barely moved while far from its destination.
    Standstill,
}

/// Per-agent motion state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionState {
    /// Not moving.
    #[default]
    Idle,
    /// Following a path or direct target.
    Walking,
    /// Engaged in combat; movement is suspended.
    Attacking,
    /// Removed from play. Terminal.
    Dead,
}

impl MotionState {
    /// Reports whether the agent still takes part in collisions and separation.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, Self::Dead)
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single tile expressed as column and row indices.
///
/// Indices are signed so that positions left of or above the field map to
/// coordinates that bounds checks reject instead of wrapping around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: i32,
    row: i32,
}

impl TileCoord {
    /// Coordinate that lies outside every field.
    pub const OUTSIDE: TileCoord = TileCoord::new(i32::MIN, i32::MIN);

    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Coordinate displaced by the provided column and row offsets.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }

    /// Computes the Manhattan distance between two tile coordinates.
    ///
    /// Saturates at `u32::MAX` for coordinates at opposite ends of the range.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .saturating_add(self.row.abs_diff(other.row))
    }

    /// Computes the Chebyshev distance between two tile coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// Floating-point position measured in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    x: f32,
    y: f32,
}

impl WorldPosition {
    /// Creates a new pixel position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal pixel coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical pixel coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance(self, other: WorldPosition) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }

    /// Reports whether both components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Position as a `glam` vector for arithmetic.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for WorldPosition {
    fn from(value: Vec2) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<WorldPosition> for Vec2 {
    fn from(value: WorldPosition) -> Self {
        value.to_vec2()
    }
}

/// Immutable representation of a single agent used by sibling queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Identifier assigned to the agent.
    pub id: AgentId,
    /// Pixel position of the agent's center.
    pub position: WorldPosition,
    /// Collision radius in pixels.
    pub radius: f32,
    /// Motion state at capture time.
    pub state: MotionState,
}

impl AgentSnapshot {
    /// Reports whether the agent still occupies space.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.state.is_alive()
    }
}

/// Read-only snapshot describing every agent in the simulation.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over living agents other than `exclude`.
    pub fn living_except(&self, exclude: AgentId) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots
            .iter()
            .filter(move |snapshot| snapshot.id != exclude && snapshot.is_alive())
    }

    /// Snapshot of a specific agent, if present.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Replaces the snapshot for `snapshot.id`, inserting it in id order when
    /// the agent is not yet part of the view.
    pub fn update(&mut self, snapshot: AgentSnapshot) {
        match self
            .snapshots
            .binary_search_by_key(&snapshot.id, |existing| existing.id)
        {
            Ok(index) => self.snapshots[index] = snapshot,
            Err(index) => self.snapshots.insert(index, snapshot),
        }
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn tile_distances_match_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.chebyshev_distance(origin), 3);
    }

    #[test]
    fn manhattan_distance_saturates_at_range_extremes() {
        let far = TileCoord::new(i32::MAX, i32::MAX);
        assert_eq!(TileCoord::OUTSIDE.manhattan_distance(far), u32::MAX);
        assert_eq!(
            TileCoord::new(i32::MIN, 0).manhattan_distance(TileCoord::new(i32::MAX, 0)),
            u32::MAX
        );
    }

    #[test]
    fn offset_saturates_instead_of_wrapping() {
        let edge = TileCoord::new(i32::MAX, 0);
        assert_eq!(edge.offset(1, -1), TileCoord::new(i32::MAX, -1));
    }

    #[test]
    fn agent_view_sorts_and_filters_living() {
        let view = AgentView::from_snapshots(vec![
            snapshot(3, MotionState::Idle),
            snapshot(1, MotionState::Dead),
            snapshot(2, MotionState::Walking),
        ]);

        let ids: Vec<_> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let living: Vec<_> = view
            .living_except(AgentId::new(2))
            .map(|snapshot| snapshot.id.get())
            .collect();
        assert_eq!(living, vec![3]);
        assert_eq!(
            view.get(AgentId::new(2)).map(|snapshot| snapshot.state),
            Some(MotionState::Walking)
        );
        assert!(view.get(AgentId::new(9)).is_none());
    }

    #[test]
    fn agent_view_update_replaces_in_place() {
        let mut view = AgentView::from_snapshots(vec![
            snapshot(1, MotionState::Walking),
            snapshot(4, MotionState::Idle),
        ]);

        let mut moved = snapshot(1, MotionState::Idle);
        moved.position = WorldPosition::new(30.0, 12.0);
        view.update(moved);
        view.update(snapshot(2, MotionState::Walking));

        let ids: Vec<_> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(view.get(AgentId::new(1)), Some(&moved));
    }

    fn snapshot(id: u32, state: MotionState) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            position: WorldPosition::new(id as f32, 0.0),
            radius: 4.0,
            state,
        }
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn path_failure_round_trips_through_bincode() {
        assert_round_trip(&PathFailure::SearchExhausted);
    }

    #[test]
    fn world_position_round_trips_through_bincode() {
        assert_round_trip(&WorldPosition::new(12.5, -3.25));
    }
}
