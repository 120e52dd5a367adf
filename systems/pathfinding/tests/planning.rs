use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use waypath_core::{ObstacleField, TileCoord, WorldPosition};
use waypath_system_pathfinding::{
    build_pixel_path, find_path, has_tile_line_of_sight, plan_pixel_path, search, smooth,
    PathOptions, PlanError,
};

#[test]
fn open_field_paths_match_chebyshev_and_manhattan_distances() {
    let field = ObstacleField::new(7, 5, 10.0);
    let tiles: Vec<TileCoord> = (0..7)
        .flat_map(|column| (0..5).map(move |row| TileCoord::new(column, row)))
        .collect();

    for &start in &tiles {
        for &goal in &tiles {
            let diagonal = find_path(&field, start, goal, true).expect("diagonal path");
            let orthogonal = find_path(&field, start, goal, false).expect("orthogonal path");

            assert_eq!(
                diagonal.len() as u32 - 1,
                start.chebyshev_distance(goal),
                "{start:?} -> {goal:?}"
            );
            assert_eq!(
                orthogonal.len() as u32 - 1,
                start.manhattan_distance(goal),
                "{start:?} -> {goal:?}"
            );
            assert!((orthogonal.cost() - start.manhattan_distance(goal) as f32).abs() < 1e-4);

            let columns = start.column().abs_diff(goal.column()) as f32;
            let rows = start.row().abs_diff(goal.row()) as f32;
            let octile = columns.max(rows) + (2.0_f32.sqrt() - 1.0) * columns.min(rows);
            assert!((diagonal.cost() - octile).abs() < 1e-4, "{start:?} -> {goal:?}");
        }
    }
}

#[test]
fn search_never_expands_a_tile_twice() {
    let blocked = [
        TileCoord::new(3, 0),
        TileCoord::new(3, 1),
        TileCoord::new(3, 2),
        TileCoord::new(3, 3),
        TileCoord::new(6, 5),
        TileCoord::new(6, 6),
        TileCoord::new(6, 7),
        TileCoord::new(1, 6),
        TileCoord::new(2, 6),
    ];
    let field = ObstacleField::with_blocked(9, 8, 16.0, blocked);

    for allow_diagonal in [true, false] {
        let outcome = search(&field, TileCoord::new(0, 0), TileCoord::new(8, 7), allow_diagonal);
        assert!(outcome.path().is_some());

        let mut seen = HashSet::new();
        for tile in outcome.expanded() {
            assert!(seen.insert(*tile), "tile {tile:?} expanded twice");
            assert!(field.is_walkable(*tile));
        }
    }
}

#[test]
fn unreachable_goal_exhausts_open_set() {
    // Goal enclosed by a ring of walls.
    let mut field = ObstacleField::new(7, 7, 10.0);
    for column in 2..=4 {
        for row in 2..=4 {
            if (column, row) != (3, 3) {
                let _ = field.set_walkable(TileCoord::new(column, row), false);
            }
        }
    }

    let outcome = search(&field, TileCoord::new(0, 0), TileCoord::new(3, 3), true);

    assert_eq!(outcome.expanded().len(), 49 - 9);
    assert!(matches!(
        outcome.into_result(),
        Err(PlanError::Unreachable { expanded: 40, .. })
    ));
}

#[test]
fn paths_avoid_squeezing_between_blocked_corners() {
    // . # .
    // # . .
    // . . .
    let field = ObstacleField::with_blocked(3, 3, 10.0, [TileCoord::new(1, 0), TileCoord::new(0, 1)]);

    assert!(find_path(&field, TileCoord::new(0, 0), TileCoord::new(1, 1), true).is_none());
}

#[test]
fn reference_grid_scenario() {
    let field = ObstacleField::new(10, 10, 50.0);

    let path = find_path(&field, TileCoord::new(0, 0), TileCoord::new(9, 9), true)
        .expect("diagonal path");
    assert!((path.cost() - 9.0 * 2.0_f32.sqrt()).abs() < 1e-3);
    assert!((path.cost() - 12.73).abs() < 0.01);

    let smoothed = smooth(&field, path.tiles());
    assert_eq!(smoothed, vec![TileCoord::new(0, 0), TileCoord::new(9, 9)]);

    let centers: Vec<WorldPosition> = smoothed
        .iter()
        .map(|tile| field.tile_to_world(*tile))
        .collect();
    assert_eq!(
        centers,
        vec![WorldPosition::new(25.0, 25.0), WorldPosition::new(475.0, 475.0)]
    );

    let pixel_path = build_pixel_path(
        &field,
        WorldPosition::new(25.0, 25.0),
        WorldPosition::new(475.0, 475.0),
    )
    .expect("pixel path");
    assert_eq!(pixel_path.waypoints(), centers.as_slice());
}

#[test]
fn blocked_goal_yields_no_path() {
    let mut field = ObstacleField::new(10, 10, 50.0);
    let _ = field.set_walkable(TileCoord::new(9, 9), false);

    assert!(find_path(&field, TileCoord::new(0, 0), TileCoord::new(9, 9), true).is_none());
    assert!(build_pixel_path(
        &field,
        WorldPosition::new(25.0, 25.0),
        WorldPosition::new(470.0, 480.0)
    )
    .is_none());
}

#[test]
fn same_tile_request_returns_start_and_goal() {
    let field = ObstacleField::new(4, 4, 50.0);
    let start = WorldPosition::new(60.0, 61.0);
    let goal = WorldPosition::new(95.5, 52.0);

    let path = build_pixel_path(&field, start, goal).expect("direct path");

    assert_eq!(path.waypoints(), &[start, goal]);
}

#[test]
fn pixel_path_is_anchored_to_requested_pixels() {
    // . . . . .
    // . # # # .
    // . . . . .
    let field = ObstacleField::with_blocked(
        5,
        3,
        20.0,
        [TileCoord::new(1, 1), TileCoord::new(2, 1), TileCoord::new(3, 1)],
    );
    let start = WorldPosition::new(3.0, 17.0);
    let goal = WorldPosition::new(97.0, 44.0);

    let path = build_pixel_path(&field, start, goal).expect("path around wall");

    assert_eq!(path.waypoints().first(), Some(&start));
    assert_eq!(path.waypoints().last(), Some(&goal));
    assert!(path.len() >= 3);
    for waypoint in &path.waypoints()[1..path.len() - 1] {
        let tile = field.world_to_tile(*waypoint);
        assert!(field.is_walkable(tile));
        assert_eq!(field.tile_to_world(tile), *waypoint);
    }
}

#[test]
fn smoothing_is_idempotent_on_random_fields() {
    const FIELDS: u64 = 400;
    const PAIRS_PER_FIELD: usize = 6;

    let mut searched = 0;
    for seed in 0..FIELDS {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let blocked: Vec<TileCoord> = (0..10)
            .flat_map(|column| (0..10).map(move |row| TileCoord::new(column, row)))
            .filter(|_| rng.gen_bool(0.25))
            .collect();
        let field = ObstacleField::with_blocked(10, 10, 10.0, blocked);

        for _ in 0..PAIRS_PER_FIELD {
            let start = TileCoord::new(rng.gen_range(0..10), rng.gen_range(0..10));
            let goal = TileCoord::new(rng.gen_range(0..10), rng.gen_range(0..10));

            for allow_diagonal in [true, false] {
                let Some(path) = find_path(&field, start, goal, allow_diagonal) else {
                    continue;
                };
                searched += 1;

                let once = smooth(&field, path.tiles());
                let twice = smooth(&field, &once);

                assert!(once.len() <= path.len(), "seed {seed}: {start:?} -> {goal:?}");
                assert_eq!(once.first(), path.tiles().first(), "seed {seed}");
                assert_eq!(once.last(), path.tiles().last(), "seed {seed}");
                assert!(
                    once.windows(2)
                        .all(|segment| has_tile_line_of_sight(&field, segment[0], segment[1])),
                    "seed {seed}: smoothed segment crosses a blocked tile"
                );
                assert_eq!(twice, once, "seed {seed}: {start:?} -> {goal:?}");
            }
        }
    }

    assert!(searched > 1000, "only {searched} searches produced a path");
}

#[test]
fn orthogonal_option_is_honoured_by_pixel_planning() {
    let field = ObstacleField::new(4, 4, 10.0);
    let options = PathOptions {
        allow_diagonal: false,
        ..PathOptions::default()
    };

    let path = plan_pixel_path(
        &field,
        WorldPosition::new(5.0, 5.0),
        WorldPosition::new(35.0, 35.0),
        &options,
    )
    .expect("path");

    // Smoothing straightens the staircase produced by orthogonal search.
    assert_eq!(
        path.waypoints(),
        &[WorldPosition::new(5.0, 5.0), WorldPosition::new(35.0, 35.0)]
    );
}
