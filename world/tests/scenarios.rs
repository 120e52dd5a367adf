use std::time::Duration;

use waypath_core::{AgentId, Command, Event, MotionState, PathFailure, TileCoord, WorldPosition};
use waypath_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(16);

fn run(world: &mut World, commands: impl IntoIterator<Item = Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

fn spawn(position: WorldPosition) -> Command {
    Command::SpawnAgent {
        position,
        radius: None,
        speed: None,
    }
}

fn ticks(count: usize) -> impl Iterator<Item = Command> {
    std::iter::repeat(Command::Tick { dt: FRAME }).take(count)
}

#[test]
fn unwalkable_goal_never_reaches_the_agent() {
    let mut world = World::new();
    let goal = WorldPosition::new(470.0, 480.0);
    let events = run(
        &mut world,
        [
            spawn(WorldPosition::new(25.0, 25.0)),
            Command::SetWalkable {
                tile: TileCoord::new(9, 9),
                walkable: false,
            },
            Command::RequestMove {
                agent: AgentId::new(0),
                goal,
            },
        ]
        .into_iter()
        .chain(ticks(10)),
    );

    assert!(events.contains(&Event::PathNotFound {
        agent: AgentId::new(0),
        goal,
        reason: PathFailure::GoalBlocked,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::PathAssigned { .. } | Event::AgentMoved { .. })));
    let agent = query::agent(&world, AgentId::new(0)).expect("agent");
    assert_eq!(agent.position(), WorldPosition::new(25.0, 25.0));
}

#[test]
fn agent_crosses_reference_grid_along_the_diagonal() {
    let mut world = World::new();
    let goal = WorldPosition::new(475.0, 475.0);
    let events = run(
        &mut world,
        [
            spawn(WorldPosition::new(25.0, 25.0)),
            Command::RequestMove {
                agent: AgentId::new(0),
                goal,
            },
        ]
        .into_iter()
        .chain(ticks(400)),
    );

    assert!(events.contains(&Event::PathAssigned {
        agent: AgentId::new(0),
        waypoints: 2,
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AgentArrived { .. })));
    for event in &events {
        if let Event::AgentMoved { to, .. } = event {
            assert!((to.x() - to.y()).abs() < 1e-2, "left the diagonal at {to:?}");
        }
    }
    let agent = query::agent(&world, AgentId::new(0)).expect("agent");
    assert!(agent.position().distance(goal) <= 2.0);
    assert_eq!(agent.state(), MotionState::Idle);
}

#[test]
fn agents_sharing_a_corridor_settle_apart() {
    let mut world = World::new();
    let mut setup = vec![Command::ConfigureField {
        columns: 14,
        rows: 5,
        tile_length: 20.0,
    }];
    for column in 0..14 {
        setup.push(Command::SetWalkable {
            tile: TileCoord::new(column, 0),
            walkable: false,
        });
        setup.push(Command::SetWalkable {
            tile: TileCoord::new(column, 4),
            walkable: false,
        });
    }
    let starts = [
        WorldPosition::new(30.0, 50.0),
        WorldPosition::new(30.0, 30.0),
        WorldPosition::new(250.0, 50.0),
    ];
    setup.extend(starts.into_iter().map(spawn));
    let goal = WorldPosition::new(140.0, 50.0);
    setup.extend((0..3).map(|id| Command::RequestMove {
        agent: AgentId::new(id),
        goal,
    }));
    let _ = run(&mut world, setup);

    let config = query::motion_config(&world);
    for _ in 0..800 {
        let _ = run(&mut world, ticks(1));
        let agents = query::agents(&world);
        for (index, first) in agents.iter().enumerate() {
            for second in &agents[index + 1..] {
                let gap = first.position().distance(second.position());
                assert!(gap >= first.radius() + second.radius() - 1e-3, "overlap {gap}");
            }
        }
    }

    for agent in query::agents(&world) {
        assert!(!agent.has_path(), "agent {:?} still walking", agent.id());
        assert!(agent.position().distance(goal) <= config.arrival_tolerance);
    }
}

#[test]
fn wall_dropped_mid_route_ends_the_move() {
    let mut world = World::new();
    let agent = AgentId::new(0);
    let mut events = run(
        &mut world,
        [
            Command::ConfigureField {
                columns: 10,
                rows: 3,
                tile_length: 20.0,
            },
            spawn(WorldPosition::new(10.0, 30.0)),
            Command::RequestMove {
                agent,
                goal: WorldPosition::new(190.0, 30.0),
            },
        ]
        .into_iter()
        .chain(ticks(5)),
    );
    events.extend(run(
        &mut world,
        (0..3)
            .map(|row| Command::SetWalkable {
                tile: TileCoord::new(5, row),
                walkable: false,
            })
            .chain(ticks(400)),
    ));

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::WaypointSkipped { .. })));
    assert!(events.contains(&Event::MoveCancelled { agent }));
    let tail = &events[events.len() - 100..];
    assert!(tail
        .iter()
        .all(|event| matches!(event, Event::TimeAdvanced { .. })));
    assert!(!query::agent(&world, agent).expect("agent").has_path());
}
