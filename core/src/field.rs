//! Tile walkability grid shared by path search and motion.

use crate::{TileCoord, WorldPosition};

/// Tile offsets visited by orthogonal neighbor queries, clockwise from north.
const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Tile offsets visited by diagonal neighbor queries, clockwise from north-east.
const DIAGONAL_OFFSETS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Rectangular grid of walkable flags measured in whole tiles.
///
/// Coordinates outside `[0, columns) x [0, rows)` are always blocked, which
/// also covers degenerate configurations such as a zero-sized grid or a
/// non-positive tile length.
#[derive(Clone, Debug, PartialEq)]
pub struct ObstacleField {
    columns: u32,
    rows: u32,
    tile_length: f32,
    walkable: Vec<bool>,
}

impl ObstacleField {
    /// Creates a field of the provided dimensions where every tile is walkable.
    #[must_use]
    pub fn new(columns: u32, rows: u32, tile_length: f32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            tile_length,
            walkable: vec![true; capacity],
        }
    }

    /// Creates a field whose blocked tiles are listed explicitly.
    ///
    /// Coordinates outside the grid are ignored.
    #[must_use]
    pub fn with_blocked<I>(columns: u32, rows: u32, tile_length: f32, blocked: I) -> Self
    where
        I: IntoIterator<Item = TileCoord>,
    {
        let mut field = Self::new(columns, rows, tile_length);
        for tile in blocked {
            let _ = field.set_walkable(tile, false);
        }
        field
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Edge length of a single square tile in pixels.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Total width of the field in pixels.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_length
    }

    /// Total height of the field in pixels.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_length
    }

    /// Number of tiles stored by the field.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.walkable.len()
    }

    /// Reports whether the tile lies inside the grid.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some()
    }

    /// Reports whether an agent may occupy the tile.
    ///
    /// Out-of-bounds tiles are never walkable.
    #[must_use]
    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.index(tile)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the tile containing the pixel position is walkable.
    #[must_use]
    pub fn is_walkable_at(&self, position: WorldPosition) -> bool {
        self.is_walkable(self.world_to_tile(position))
    }

    /// Marks the tile as walkable or blocked.
    ///
    /// Returns `true` when the stored flag changed. Out-of-bounds tiles are
    /// left untouched and report `false`.
    pub fn set_walkable(&mut self, tile: TileCoord, walkable: bool) -> bool {
        let Some(slot) = self.index(tile).and_then(|index| self.walkable.get_mut(index)) else {
            return false;
        };
        let changed = *slot != walkable;
        *slot = walkable;
        changed
    }

    /// Converts a pixel position into the tile containing it.
    ///
    /// A field without a usable tile length maps every position to a tile
    /// outside the grid.
    #[must_use]
    pub fn world_to_tile(&self, position: WorldPosition) -> TileCoord {
        if !self.has_usable_tile_length() || !position.is_finite() {
            return TileCoord::OUTSIDE;
        }
        let column = (position.x() / self.tile_length).floor();
        let row = (position.y() / self.tile_length).floor();
        TileCoord::new(column as i32, row as i32)
    }

    /// Pixel position of the tile center.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> WorldPosition {
        let half = self.tile_length * 0.5;
        WorldPosition::new(
            tile.column() as f32 * self.tile_length + half,
            tile.row() as f32 * self.tile_length + half,
        )
    }

    /// Walkable tiles adjacent to `tile`.
    ///
    /// Diagonal neighbors additionally require both orthogonal tiles flanking
    /// the diagonal to be walkable so paths never squeeze between two blocked
    /// corners.
    #[must_use]
    pub fn neighbors(&self, tile: TileCoord, allow_diagonal: bool) -> Neighbors {
        let mut neighbors = Neighbors::default();

        for (column_offset, row_offset) in ORTHOGONAL_OFFSETS {
            let candidate = tile.offset(column_offset, row_offset);
            if self.is_walkable(candidate) {
                neighbors.push(candidate);
            }
        }

        if allow_diagonal {
            for (column_offset, row_offset) in DIAGONAL_OFFSETS {
                let candidate = tile.offset(column_offset, row_offset);
                if !self.is_walkable(candidate) {
                    continue;
                }
                let horizontal = tile.offset(column_offset, 0);
                let vertical = tile.offset(0, row_offset);
                if self.is_walkable(horizontal) && self.is_walkable(vertical) {
                    neighbors.push(candidate);
                }
            }
        }

        neighbors
    }

    /// Iterator over every blocked tile in row-major order.
    pub fn blocked_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let columns = self.columns;
        self.walkable
            .iter()
            .enumerate()
            .filter(|(_, walkable)| !**walkable)
            .filter_map(move |(index, _)| {
                let columns = usize::try_from(columns).ok()?;
                let column = i32::try_from(index % columns).ok()?;
                let row = i32::try_from(index / columns).ok()?;
                Some(TileCoord::new(column, row))
            })
    }

    /// Dense row-major index of the tile, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, tile: TileCoord) -> Option<usize> {
        let column = u32::try_from(tile.column()).ok()?;
        let row = u32::try_from(tile.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn has_usable_tile_length(&self) -> bool {
        self.tile_length.is_finite() && self.tile_length > 0.0
    }
}

/// Fixed-capacity iterator over up to eight neighboring tiles.
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<TileCoord>; 8],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    fn push(&mut self, tile: TileCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(tile);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}
