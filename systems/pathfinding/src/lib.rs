#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure path planning over the obstacle field.
//!
//! Planning runs in three stages. A* finds a shortest tile route, greedy
//! line-of-sight reduction drops waypoints that a straight walk can bypass,
//! and the refiner converts the surviving tiles into pixel waypoints whose
//! endpoints are the caller's exact start and goal. Every stage is a pure
//! function of the field and its inputs; no state survives between calls.

mod refine;
mod search;
mod smoothing;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use waypath_core::{PathFailure, TileCoord};

pub use refine::{build_pixel_path, plan_pixel_path, PixelPath};
pub use search::{find_path, search, SearchOutcome, TilePath};
pub use smoothing::{has_pixel_line_of_sight, has_tile_line_of_sight, optimize, smooth};

/// Reasons a path request produced no path.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum PlanError {
    /// The start tile is blocked or outside the field.
    #[error("start tile ({}, {}) is not walkable", .tile.column(), .tile.row())]
    StartBlocked {
        /// Tile containing the start position.
        tile: TileCoord,
    },
    /// The goal tile is blocked or outside the field.
    #[error("goal tile ({}, {}) is not walkable", .tile.column(), .tile.row())]
    GoalBlocked {
        /// Tile containing the goal position.
        tile: TileCoord,
    },
    /// Every reachable tile was expanded without finding the goal.
    #[error("goal tile ({}, {}) is unreachable after {expanded} expansions", .goal.column(), .goal.row())]
    Unreachable {
        /// Tile the search was looking for.
        goal: TileCoord,
        /// Number of tiles moved into the closed set.
        expanded: usize,
    },
    /// The search exceeded its iteration cap.
    #[error("search abandoned after {iterations} iterations")]
    SearchExhausted {
        /// Iterations performed before giving up.
        iterations: usize,
    },
}

impl PlanError {
    /// Coarse failure category broadcast in world events.
    #[must_use]
    pub const fn failure(&self) -> PathFailure {
        match self {
            Self::StartBlocked { .. } => PathFailure::StartBlocked,
            Self::GoalBlocked { .. } => PathFailure::GoalBlocked,
            Self::Unreachable { .. } => PathFailure::Unreachable,
            Self::SearchExhausted { .. } => PathFailure::SearchExhausted,
        }
    }
}

/// Post-processing applied to the tile route before it is handed to an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Refinement {
    /// Tile-space line-of-sight smoothing, then conversion to tile centers.
    #[default]
    TileSmoothing,
    /// Conversion to tile centers, then pixel-space smoothing with a segment cap.
    PixelOptimize {
        /// Longest allowed segment, in tile lengths.
        max_segment_tiles: f32,
    },
}

/// Options controlling a pixel path request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Whether search may step diagonally.
    pub allow_diagonal: bool,
    /// Post-processing applied to the tile route.
    pub refinement: Refinement,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            allow_diagonal: true,
            refinement: Refinement::TileSmoothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_errors_map_to_failures() {
        let tile = TileCoord::new(1, 2);
        assert_eq!(
            PlanError::GoalBlocked { tile }.failure(),
            PathFailure::GoalBlocked
        );
        assert_eq!(
            PlanError::SearchExhausted { iterations: 4 }.failure(),
            PathFailure::SearchExhausted
        );
    }

    #[test]
    fn plan_error_messages_name_the_tile() {
        let error = PlanError::GoalBlocked {
            tile: TileCoord::new(3, 7),
        };
        assert_eq!(error.to_string(), "goal tile (3, 7) is not walkable");
    }
}
