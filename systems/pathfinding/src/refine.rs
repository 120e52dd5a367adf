//! Conversion of tile routes into pixel waypoints anchored at the exact request.

use log::debug;
use waypath_core::{ObstacleField, WorldPosition};

use crate::{search::search, smoothing, PathOptions, PlanError, Refinement};

/// World-space waypoint list, start first and destination last.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelPath {
    waypoints: Vec<WorldPosition>,
}

impl PixelPath {
    /// Waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[WorldPosition] {
        &self.waypoints
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path holds no waypoints. Planned paths never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Final waypoint.
    #[must_use]
    pub fn destination(&self) -> Option<WorldPosition> {
        self.waypoints.last().copied()
    }

    /// Total polyline length in pixels.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|segment| segment[0].distance(segment[1]))
            .sum()
    }

    /// Consumes the path, yielding the waypoints.
    #[must_use]
    pub fn into_waypoints(self) -> Vec<WorldPosition> {
        self.waypoints
    }
}

impl From<PixelPath> for Vec<WorldPosition> {
    fn from(path: PixelPath) -> Self {
        path.into_waypoints()
    }
}

/// Plans a pixel path using diagonal search and tile-space smoothing.
///
/// Returns `None` when the goal tile is blocked or no route exists.
#[must_use]
pub fn build_pixel_path(
    field: &ObstacleField,
    start: WorldPosition,
    goal: WorldPosition,
) -> Option<PixelPath> {
    plan_pixel_path(field, start, goal, &PathOptions::default()).ok()
}

/// Plans a pixel path with explicit options and reports why planning failed.
pub fn plan_pixel_path(
    field: &ObstacleField,
    start: WorldPosition,
    goal: WorldPosition,
    options: &PathOptions,
) -> Result<PixelPath, PlanError> {
    let goal_tile = field.world_to_tile(goal);
    if !field.is_walkable(goal_tile) {
        return Err(PlanError::GoalBlocked { tile: goal_tile });
    }

    let start_tile = field.world_to_tile(start);
    if start_tile == goal_tile {
        return Ok(PixelPath {
            waypoints: vec![start, goal],
        });
    }

    let tiles = search(field, start_tile, goal_tile, options.allow_diagonal)
        .into_result()?
        .into_tiles();

    let route = match options.refinement {
        Refinement::TileSmoothing => smoothing::smooth(field, &tiles),
        Refinement::PixelOptimize { .. } => tiles,
    };
    let mut waypoints: Vec<WorldPosition> = route
        .into_iter()
        .map(|tile| field.tile_to_world(tile))
        .collect();

    anchor(&mut waypoints, start, goal);

    if let Refinement::PixelOptimize { max_segment_tiles } = options.refinement {
        waypoints = smoothing::optimize(field, &waypoints, max_segment_tiles);
    }

    debug!(
        "pixel path {:?} -> {:?}: {} waypoints",
        start,
        goal,
        waypoints.len()
    );
    Ok(PixelPath { waypoints })
}

/// Replaces the tile-center endpoints with the exact requested pixels.
fn anchor(waypoints: &mut [WorldPosition], start: WorldPosition, goal: WorldPosition) {
    if let Some(last) = waypoints.last_mut() {
        *last = goal;
    }
    if waypoints.len() > 1 {
        if let Some(first) = waypoints.first_mut() {
            *first = start;
        }
    }
}
