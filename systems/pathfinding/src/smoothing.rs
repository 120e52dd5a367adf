//! Greedy line-of-sight waypoint reduction.

use glam::Vec2;
use waypath_core::{ObstacleField, TileCoord, WorldPosition};

/// Pixel line-of-sight samples taken per tile length of travel.
const PIXEL_SAMPLES_PER_TILE: f32 = 4.0;

/// Fraction of a tile length the start pixel may sit from its tile center
/// before the corner-preserving rule applies.
const START_OFFSET_TILE_FRACTION: f32 = 0.3;

/// Heading change between the first two segments, in radians, above which
/// the first intermediate waypoint is kept.
const START_TURN_THRESHOLD: f32 = std::f32::consts::PI / 6.0;

/// Reports whether every tile on the straight line between two tiles is walkable.
///
/// Samples `max(|dx|, |dy|) + 1` evenly spaced points and rounds each to the
/// nearest tile.
#[must_use]
pub fn has_tile_line_of_sight(field: &ObstacleField, from: TileCoord, to: TileCoord) -> bool {
    let dx = to.column() as f32 - from.column() as f32;
    let dy = to.row() as f32 - from.row() as f32;
    let steps = from.chebyshev_distance(to);
    if steps == 0 {
        return true;
    }

    (0..=steps).all(|step| {
        let t = step as f32 / steps as f32;
        let column = (from.column() as f32 + dx * t).round() as i32;
        let row = (from.row() as f32 + dy * t).round() as i32;
        field.is_walkable(TileCoord::new(column, row))
    })
}

/// Reports whether every sampled pixel on the segment lies on a walkable tile.
///
/// Sampling density is at least four samples per tile length travelled,
/// which catches diagonal cuts across a blocked corner that tile-space
/// sampling would miss.
#[must_use]
pub fn has_pixel_line_of_sight(
    field: &ObstacleField,
    from: WorldPosition,
    to: WorldPosition,
) -> bool {
    let tile_length = field.tile_length();
    if !(tile_length.is_finite() && tile_length > 0.0) || !from.is_finite() || !to.is_finite() {
        return false;
    }

    let start = from.to_vec2();
    let end = to.to_vec2();
    let distance = start.distance(end);
    let samples = ((distance / tile_length) * PIXEL_SAMPLES_PER_TILE).ceil().max(1.0) as u32;

    (0..=samples).all(|sample| {
        let t = sample as f32 / samples as f32;
        field.is_walkable_at(WorldPosition::from(start.lerp(end, t)))
    })
}

/// Drops tile waypoints that can be bypassed by a straight unobstructed line.
///
/// A single greedy scan stops at the first blocked sight line, which can keep
/// a waypoint that the reduced path no longer needs. Scans repeat until a pass
/// removes nothing, so the result is a fixed point: smoothing it again returns
/// it unchanged.
#[must_use]
pub fn smooth(field: &ObstacleField, path: &[TileCoord]) -> Vec<TileCoord> {
    let mut current = path.to_vec();
    loop {
        let next = reduce(&current, None, |from, to| {
            has_tile_line_of_sight(field, current[from], current[to])
        });
        // Equal length means every scan step advanced by one, so nothing changed.
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Pixel-space counterpart of [`smooth`] with a cap on segment length.
///
/// A waypoint is skipped only when the resulting segment keeps pixel line of
/// sight and is no longer than `max_segment_tiles` tile lengths. When the
/// path's first point sits well away from its tile center and the path turns
/// sharply after the first segment, the first intermediate waypoint is kept
/// so the route does not clip the corner near the true start.
#[must_use]
pub fn optimize(
    field: &ObstacleField,
    path: &[WorldPosition],
    max_segment_tiles: f32,
) -> Vec<WorldPosition> {
    let max_length = max_segment_tiles * field.tile_length();
    let forced = preserves_start_corner(field, path).then_some(1);

    reduce(path, forced, |from, to| {
        path[from].distance(path[to]) <= max_length
            && has_pixel_line_of_sight(field, path[from], path[to])
    })
}

/// Greedy forward scan: from each kept point extend to the furthest point
/// accepted by `visible`, stopping at the first rejection.
fn reduce<T, F>(path: &[T], forced: Option<usize>, mut visible: F) -> Vec<T>
where
    T: Copy,
    F: FnMut(usize, usize) -> bool,
{
    if path.len() <= 2 {
        return path.to_vec();
    }

    let last = path.len() - 1;
    let mut kept = vec![path[0]];
    let mut current = 0;

    while current < last {
        let mut furthest = current + 1;
        for candidate in current + 2..=last {
            if forced.is_some_and(|index| current < index && candidate > index) {
                break;
            }
            if !visible(current, candidate) {
                break;
            }
            furthest = candidate;
        }
        kept.push(path[furthest]);
        current = furthest;
    }

    kept
}

fn preserves_start_corner(field: &ObstacleField, path: &[WorldPosition]) -> bool {
    let [start, first, second, ..] = path else {
        return false;
    };

    let center = field.tile_to_world(field.world_to_tile(*start));
    if start.distance(center) <= field.tile_length() * START_OFFSET_TILE_FRACTION {
        return false;
    }

    let leading = first.to_vec2() - start.to_vec2();
    let trailing = second.to_vec2() - first.to_vec2();
    if leading == Vec2::ZERO || trailing == Vec2::ZERO {
        return false;
    }

    leading.angle_between(trailing).abs() > START_TURN_THRESHOLD
}
