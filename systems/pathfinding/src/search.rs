//! A* search over the obstacle field.

use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    f32::consts::SQRT_2,
};

use log::{debug, warn};
use ordered_float::OrderedFloat;
use waypath_core::{ObstacleField, TileCoord};

use crate::PlanError;

const ORTHOGONAL_STEP_COST: f32 = 1.0;
const DIAGONAL_STEP_COST: f32 = SQRT_2;

/// Multiplier applied to the tile count to derive the search iteration cap.
const ITERATION_CAP_FACTOR: usize = 2;

/// Ordered tile sequence from start to goal together with its movement cost.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePath {
    tiles: Vec<TileCoord>,
    cost: f32,
}

impl TilePath {
    /// Tiles visited by the path, start first and goal last.
    #[must_use]
    pub fn tiles(&self) -> &[TileCoord] {
        &self.tiles
    }

    /// Accumulated movement cost (1 per orthogonal step, sqrt(2) per diagonal step).
    #[must_use]
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Number of tiles in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the path holds no tiles. Paths produced by search never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Consumes the path, yielding the tile sequence.
    #[must_use]
    pub fn into_tiles(self) -> Vec<TileCoord> {
        self.tiles
    }
}

/// Result of a single search invocation together with its expansion trace.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    result: Result<TilePath, PlanError>,
    expanded: Vec<TileCoord>,
}

impl SearchOutcome {
    /// Path found by the search, if any.
    #[must_use]
    pub fn path(&self) -> Option<&TilePath> {
        self.result.as_ref().ok()
    }

    /// Tiles moved into the closed set, in expansion order.
    #[must_use]
    pub fn expanded(&self) -> &[TileCoord] {
        &self.expanded
    }

    /// Consumes the outcome, yielding the path or the reason none exists.
    pub fn into_result(self) -> Result<TilePath, PlanError> {
        self.result
    }
}

/// Finds a shortest tile path between `start` and `goal`.
///
/// Returns `None` when either endpoint is blocked, when the goal cannot be
/// reached, or when the search exceeds its iteration cap. Any optimal path is
/// acceptable; ties between equal f-costs go to the node discovered first.
#[must_use]
pub fn find_path(
    field: &ObstacleField,
    start: TileCoord,
    goal: TileCoord,
    allow_diagonal: bool,
) -> Option<TilePath> {
    search(field, start, goal, allow_diagonal).into_result().ok()
}

/// Runs A* and reports the full outcome, including the expansion trace.
#[must_use]
pub fn search(
    field: &ObstacleField,
    start: TileCoord,
    goal: TileCoord,
    allow_diagonal: bool,
) -> SearchOutcome {
    let cap = field.tile_count().saturating_mul(ITERATION_CAP_FACTOR);
    search_with_cap(field, start, goal, allow_diagonal, cap)
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    coord: TileCoord,
    g: f32,
    h: f32,
    parent: Option<usize>,
    discovered: u64,
}

impl SearchNode {
    fn f(&self) -> f32 {
        self.g + self.h
    }
}

type OpenEntry = Reverse<(OrderedFloat<f32>, u64, usize)>;

fn search_with_cap(
    field: &ObstacleField,
    start: TileCoord,
    goal: TileCoord,
    allow_diagonal: bool,
    cap: usize,
) -> SearchOutcome {
    if start == goal {
        return SearchOutcome {
            result: Ok(TilePath {
                tiles: vec![start],
                cost: 0.0,
            }),
            expanded: Vec::new(),
        };
    }

    let failure = |error| SearchOutcome {
        result: Err(error),
        expanded: Vec::new(),
    };
    if !field.is_walkable(start) {
        return failure(PlanError::StartBlocked { tile: start });
    }
    if !field.is_walkable(goal) {
        return failure(PlanError::GoalBlocked { tile: goal });
    }
    let (Some(start_index), Some(_)) = (field.index(start), field.index(goal)) else {
        return failure(PlanError::Unreachable {
            goal,
            expanded: 0,
        });
    };

    let heuristic = |tile: TileCoord| estimate(tile, goal, allow_diagonal);
    let tile_count = field.tile_count();
    let mut nodes: Vec<SearchNode> = Vec::new();
    let mut open_slots: Vec<Option<usize>> = vec![None; tile_count];
    let mut closed = vec![false; tile_count];
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut expanded = Vec::new();
    let mut discovered = 0_u64;
    let mut iterations = 0_usize;

    let start_h = heuristic(start);
    nodes.push(SearchNode {
        coord: start,
        g: 0.0,
        h: start_h,
        parent: None,
        discovered,
    });
    open_slots[start_index] = Some(0);
    open.push(Reverse((OrderedFloat(start_h), discovered, 0)));

    while let Some(Reverse((f, _, node_index))) = open.pop() {
        let node = nodes[node_index];
        let Some(tile_index) = field.index(node.coord) else {
            continue;
        };
        if closed[tile_index] || f.0 != node.f() {
            continue;
        }

        if iterations >= cap {
            warn!(
                "search {:?} -> {:?} abandoned after {iterations} iterations",
                start, goal
            );
            return SearchOutcome {
                result: Err(PlanError::SearchExhausted { iterations }),
                expanded,
            };
        }
        iterations += 1;

        if node.coord == goal {
            let path = reconstruct(&nodes, node_index);
            debug!(
                "search {:?} -> {:?}: {} tiles, cost {:.3}, {} expansions",
                start,
                goal,
                path.len(),
                path.cost(),
                expanded.len()
            );
            return SearchOutcome {
                result: Ok(path),
                expanded,
            };
        }

        closed[tile_index] = true;
        expanded.push(node.coord);

        for neighbor in field.neighbors(node.coord, allow_diagonal) {
            let Some(neighbor_index) = field.index(neighbor) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }

            let tentative = node.g + step_cost(node.coord, neighbor);
            match open_slots[neighbor_index] {
                None => {
                    discovered += 1;
                    let h = heuristic(neighbor);
                    let candidate = SearchNode {
                        coord: neighbor,
                        g: tentative,
                        h,
                        parent: Some(node_index),
                        discovered,
                    };
                    let candidate_index = nodes.len();
                    nodes.push(candidate);
                    open_slots[neighbor_index] = Some(candidate_index);
                    open.push(Reverse((
                        OrderedFloat(candidate.f()),
                        discovered,
                        candidate_index,
                    )));
                }
                Some(existing_index) => {
                    let existing = &mut nodes[existing_index];
                    if tentative < existing.g {
                        existing.g = tentative;
                        existing.parent = Some(node_index);
                        open.push(Reverse((
                            OrderedFloat(existing.f()),
                            existing.discovered,
                            existing_index,
                        )));
                    }
                }
            }
        }
    }

    debug!(
        "search {:?} -> {:?}: goal unreachable after {} expansions",
        start,
        goal,
        expanded.len()
    );
    SearchOutcome {
        result: Err(PlanError::Unreachable {
            goal,
            expanded: expanded.len(),
        }),
        expanded,
    }
}

fn reconstruct(nodes: &[SearchNode], goal_index: usize) -> TilePath {
    let cost = nodes[goal_index].g;
    let mut tiles = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        let node = &nodes[index];
        tiles.push(node.coord);
        cursor = node.parent;
    }
    tiles.reverse();
    TilePath { tiles, cost }
}

fn step_cost(from: TileCoord, to: TileCoord) -> f32 {
    if from.column() != to.column() && from.row() != to.row() {
        DIAGONAL_STEP_COST
    } else {
        ORTHOGONAL_STEP_COST
    }
}

/// Euclidean distance when diagonals are allowed, Manhattan otherwise.
fn estimate(tile: TileCoord, goal: TileCoord, allow_diagonal: bool) -> f32 {
    let columns = tile.column().abs_diff(goal.column()) as f32;
    let rows = tile.row().abs_diff(goal.row()) as f32;
    if allow_diagonal {
        columns.hypot(rows)
    } else {
        columns + rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_equal_to_goal_returns_single_tile() {
        let field = ObstacleField::new(4, 4, 10.0);
        let tile = TileCoord::new(2, 2);

        let path = find_path(&field, tile, tile, true).expect("trivial path");

        assert_eq!(path.tiles(), &[tile]);
        assert_eq!(path.cost(), 0.0);
    }

    #[test]
    fn blocked_endpoints_yield_typed_errors() {
        let field = ObstacleField::with_blocked(4, 4, 10.0, [TileCoord::new(3, 3)]);

        let goal_blocked = search(&field, TileCoord::new(0, 0), TileCoord::new(3, 3), true);
        assert_eq!(
            goal_blocked.into_result().err(),
            Some(PlanError::GoalBlocked {
                tile: TileCoord::new(3, 3)
            })
        );

        let start_blocked = search(&field, TileCoord::new(-1, 0), TileCoord::new(1, 1), true);
        assert_eq!(
            start_blocked.into_result().err(),
            Some(PlanError::StartBlocked {
                tile: TileCoord::new(-1, 0)
            })
        );
    }

    #[test]
    fn iteration_cap_reports_exhaustion() {
        let field = ObstacleField::new(6, 6, 10.0);

        let outcome = search_with_cap(&field, TileCoord::new(0, 0), TileCoord::new(5, 5), true, 3);

        assert_eq!(
            outcome.into_result().err(),
            Some(PlanError::SearchExhausted { iterations: 3 })
        );
    }

    #[test]
    fn heuristic_matches_movement_model() {
        let tile = TileCoord::new(0, 0);
        let goal = TileCoord::new(3, 4);

        assert!((estimate(tile, goal, true) - 5.0).abs() < 1e-6);
        assert!((estimate(tile, goal, false) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn detours_around_wall() {
        // . # .
        // . # .
        // . . .
        let field = ObstacleField::with_blocked(
            3,
            3,
            10.0,
            [TileCoord::new(1, 0), TileCoord::new(1, 1)],
        );

        let path = find_path(&field, TileCoord::new(0, 0), TileCoord::new(2, 0), false)
            .expect("path around wall");

        assert_eq!(path.len(), 7);
        assert!((path.cost() - 6.0).abs() < 1e-5);
        assert!(path.tiles().iter().all(|tile| field.is_walkable(*tile)));
    }
}
