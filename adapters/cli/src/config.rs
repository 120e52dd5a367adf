//! Scenario files describing a headless navigation run.

use std::{collections::BTreeMap, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;
use waypath_core::{AgentId, Command, ObstacleField, TileCoord, WorldPosition};
use waypath_system_motion::MotionConfig;
use waypath_system_pathfinding::PathOptions;

use crate::layout_transfer::{FieldLayout, LayoutTransferError};

/// Tile placement attempts per requested random agent.
const PLACEMENT_ATTEMPTS: usize = 64;

/// Failures raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The TOML document could not be parsed.
    #[error("failed to parse scenario toml: {0}")]
    Toml(#[from] toml::de::Error),
    /// The embedded obstacle layout string was malformed.
    #[error("invalid obstacle layout: {0}")]
    Layout(#[from] LayoutTransferError),
    /// Neither grid dimensions nor a layout string were provided.
    #[error("field needs either columns, rows and tile_length or a layout string")]
    MissingField,
    /// The declared tile length is not a positive number.
    #[error("tile length {0} must be a positive number")]
    InvalidTileLength(f32),
    /// A blocked tile or edit lies outside the grid.
    #[error("tile ({column}, {row}) lies outside the {columns}x{rows} grid")]
    TileOutOfBounds {
        /// Column of the offending tile.
        column: i32,
        /// Row of the offending tile.
        row: i32,
        /// Grid width in tiles.
        columns: u32,
        /// Grid height in tiles.
        rows: u32,
    },
    /// An explicit agent was placed outside the field.
    #[error("agent {index} starts outside the field at ({x}, {y})")]
    AgentOutsideField {
        /// Position of the agent in the scenario list.
        index: usize,
        /// Horizontal pixel coordinate.
        x: f32,
        /// Vertical pixel coordinate.
        y: f32,
    },
    /// The field has no walkable tile to place random agents on.
    #[error("no walkable tile available for random agents")]
    NoWalkableTile,
    /// The tick delta must be positive.
    #[error("tick delta must be at least one millisecond")]
    ZeroDelta,
}

/// Root of a scenario document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScenarioConfig {
    pub(crate) field: FieldConfig,
    pub(crate) path: PathOptions,
    pub(crate) motion: MotionConfig,
    pub(crate) run: RunConfig,
    pub(crate) agents: Vec<AgentConfig>,
    pub(crate) random_agents: Option<RandomAgents>,
    pub(crate) edits: Vec<EditConfig>,
}

/// Obstacle field section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FieldConfig {
    pub(crate) columns: Option<u32>,
    pub(crate) rows: Option<u32>,
    pub(crate) tile_length: Option<f32>,
    pub(crate) blocked: Vec<[i32; 2]>,
    /// Layout transfer string; replaces the dimensions and blocked list.
    pub(crate) layout: Option<String>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            columns: Some(10),
            rows: Some(10),
            tile_length: Some(50.0),
            blocked: Vec::new(),
            layout: None,
        }
    }
}

/// Timing of the run.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunConfig {
    pub(crate) ticks: u32,
    pub(crate) dt_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            dt_ms: 16,
        }
    }
}

/// Explicitly placed agent.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AgentConfig {
    pub(crate) position: [f32; 2],
    pub(crate) goal: Option<[f32; 2]>,
    #[serde(default)]
    pub(crate) direct: bool,
    pub(crate) radius: Option<f32>,
    pub(crate) speed: Option<f32>,
}

/// Agents scattered over walkable tile centers by a seeded generator.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RandomAgents {
    pub(crate) count: usize,
    #[serde(default)]
    pub(crate) seed: u64,
    pub(crate) goal: Option<[f32; 2]>,
}

/// Walkability change applied just before the given tick.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EditConfig {
    pub(crate) tick: u32,
    pub(crate) tile: [i32; 2],
    pub(crate) walkable: bool,
}

/// Commands derived from a scenario, split by when they are applied.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScenarioPlan {
    pub(crate) setup: Vec<Command>,
    pub(crate) edits: BTreeMap<u32, Vec<Command>>,
    pub(crate) ticks: u32,
    pub(crate) dt: Duration,
}

impl ScenarioConfig {
    /// Parses a scenario document.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(contents)?)
    }

    /// Builds the obstacle field described by the `field` section.
    pub(crate) fn build_field(&self) -> Result<ObstacleField, ScenarioError> {
        if let Some(layout) = &self.field.layout {
            return Ok(FieldLayout::decode(layout)?.to_field());
        }

        let (Some(columns), Some(rows), Some(tile_length)) = (
            self.field.columns,
            self.field.rows,
            self.field.tile_length,
        ) else {
            return Err(ScenarioError::MissingField);
        };
        if !tile_length.is_finite() || tile_length <= 0.0 {
            return Err(ScenarioError::InvalidTileLength(tile_length));
        }

        let field = ObstacleField::new(columns, rows, tile_length);
        let blocked = self
            .field
            .blocked
            .iter()
            .map(|&tile| checked_tile(&field, tile))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObstacleField::with_blocked(columns, rows, tile_length, blocked))
    }

    /// Validates the scenario against `field` and lowers it to world commands.
    pub(crate) fn plan(&self, field: &ObstacleField) -> Result<ScenarioPlan, ScenarioError> {
        if self.run.dt_ms == 0 {
            return Err(ScenarioError::ZeroDelta);
        }

        let mut setup = vec![Command::ConfigureField {
            columns: field.columns(),
            rows: field.rows(),
            tile_length: field.tile_length(),
        }];
        setup.extend(field.blocked_tiles().map(|tile| Command::SetWalkable {
            tile,
            walkable: false,
        }));

        let mut spawned = 0_u32;
        let mut orders = Vec::new();
        for (index, agent) in self.agents.iter().enumerate() {
            let position = WorldPosition::new(agent.position[0], agent.position[1]);
            let inside = field.contains(field.world_to_tile(position));
            if !inside {
                return Err(ScenarioError::AgentOutsideField {
                    index,
                    x: position.x(),
                    y: position.y(),
                });
            }
            setup.push(Command::SpawnAgent {
                position,
                radius: agent.radius,
                speed: agent.speed,
            });
            let id = AgentId::new(spawned);
            spawned += 1;

            if let Some([x, y]) = agent.goal {
                let goal = WorldPosition::new(x, y);
                orders.push(if agent.direct {
                    Command::SetTarget {
                        agent: id,
                        target: goal,
                    }
                } else {
                    Command::RequestMove { agent: id, goal }
                });
            }
        }

        if let Some(random) = &self.random_agents {
            for position in random_positions(field, random)? {
                setup.push(Command::SpawnAgent {
                    position,
                    radius: None,
                    speed: None,
                });
                let id = AgentId::new(spawned);
                spawned += 1;
                if let Some([x, y]) = random.goal {
                    orders.push(Command::RequestMove {
                        agent: id,
                        goal: WorldPosition::new(x, y),
                    });
                }
            }
        }
        setup.extend(orders);

        let mut edits: BTreeMap<u32, Vec<Command>> = BTreeMap::new();
        for edit in &self.edits {
            let tile = checked_tile(field, edit.tile)?;
            edits.entry(edit.tick).or_default().push(Command::SetWalkable {
                tile,
                walkable: edit.walkable,
            });
        }

        Ok(ScenarioPlan {
            setup,
            edits,
            ticks: self.run.ticks,
            dt: Duration::from_millis(self.run.dt_ms),
        })
    }
}

fn checked_tile(field: &ObstacleField, [column, row]: [i32; 2]) -> Result<TileCoord, ScenarioError> {
    let tile = TileCoord::new(column, row);
    if field.contains(tile) {
        Ok(tile)
    } else {
        Err(ScenarioError::TileOutOfBounds {
            column,
            row,
            columns: field.columns(),
            rows: field.rows(),
        })
    }
}

/// Picks distinct walkable tile centers using a seeded generator.
fn random_positions(
    field: &ObstacleField,
    random: &RandomAgents,
) -> Result<Vec<WorldPosition>, ScenarioError> {
    if random.count == 0 {
        return Ok(Vec::new());
    }
    if field.blocked_tiles().count() >= field.tile_count() {
        return Err(ScenarioError::NoWalkableTile);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(random.seed);
    let mut taken = Vec::with_capacity(random.count);
    let columns = i32::try_from(field.columns()).unwrap_or(i32::MAX);
    let rows = i32::try_from(field.rows()).unwrap_or(i32::MAX);

    for _ in 0..random.count.saturating_mul(PLACEMENT_ATTEMPTS) {
        if taken.len() == random.count {
            break;
        }
        let tile = TileCoord::new(rng.gen_range(0..columns), rng.gen_range(0..rows));
        if field.is_walkable(tile) && !taken.contains(&tile) {
            taken.push(tile);
        }
    }

    Ok(taken
        .into_iter()
        .map(|tile| field.tile_to_world(tile))
        .collect())
}
