use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use waypath_core::{ObstacleField, TileCoord};

const LAYOUT_DOMAIN: &str = "field";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "field:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Portable description of an obstacle field's blocked tiles.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FieldLayout {
    /// Number of tile columns contained in the grid.
    pub(crate) columns: u32,
    /// Number of tile rows contained in the grid.
    pub(crate) rows: u32,
    /// Length of a single tile edge in pixels.
    pub(crate) tile_length: f32,
    /// Tiles that are not walkable, in row-major order.
    pub(crate) blocked: Vec<TileCoord>,
}

impl FieldLayout {
    /// Captures the blocked tiles of `field`.
    #[must_use]
    pub(crate) fn from_field(field: &ObstacleField) -> Self {
        Self {
            columns: field.columns(),
            rows: field.rows(),
            tile_length: field.tile_length(),
            blocked: field.blocked_tiles().collect(),
        }
    }

    /// Materialises the layout as an obstacle field.
    #[must_use]
    pub(crate) fn to_field(&self) -> ObstacleField {
        ObstacleField::with_blocked(
            self.columns,
            self.rows,
            self.tile_length,
            self.blocked.iter().copied(),
        )
    }

    /// Encodes the layout into a single-line string suitable for copying around.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableLayout {
            tile_length: self.tile_length,
            blocked: self
                .blocked
                .iter()
                .map(|tile| [tile.column(), tile.row()])
                .collect(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{LAYOUT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a layout from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts
            .next()
            .ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableLayout =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        if !decoded.tile_length.is_finite() || decoded.tile_length <= 0.0 {
            return Err(LayoutTransferError::InvalidTileLength(decoded.tile_length));
        }

        let mut blocked = Vec::with_capacity(decoded.blocked.len());
        for [column, row] in decoded.blocked {
            let tile = TileCoord::new(column, row);
            let inside = u32::try_from(column).is_ok_and(|column| column < columns)
                && u32::try_from(row).is_ok_and(|row| row < rows);
            if !inside {
                return Err(LayoutTransferError::TileOutOfBounds(tile));
            }
            blocked.push(tile);
        }

        Ok(Self {
            columns,
            rows,
            tile_length: decoded.tile_length,
            blocked,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    tile_length: f32,
    blocked: Vec<[i32; 2]>,
}

/// Errors that can occur while decoding layout transfer strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded layout.
    MissingPrefix,
    /// The encoded layout did not contain a version segment.
    MissingVersion,
    /// The encoded layout did not include grid dimensions.
    MissingDimensions,
    /// The encoded layout did not include the payload segment.
    MissingPayload,
    /// The encoded layout used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded layout used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded layout.
    InvalidDimensions(String),
    /// The payload declared a tile length that is not a positive number.
    InvalidTileLength(f32),
    /// The payload listed a blocked tile outside the grid.
    TileOutOfBounds(TileCoord),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingDimensions => write!(f, "layout string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidTileLength(length) => {
                write!(f, "tile length {length} must be a positive number")
            }
            Self::TileOutOfBounds(tile) => write!(
                f,
                "blocked tile ({}, {}) lies outside the grid",
                tile.column(),
                tile.row()
            ),
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process layout payload: {error}")
            }
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(LayoutTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_survives_transfer() {
        let field = ObstacleField::with_blocked(
            12,
            8,
            32.0,
            [TileCoord::new(5, 7), TileCoord::new(11, 0), TileCoord::new(0, 3)],
        );

        let encoded = FieldLayout::from_field(&field).encode().expect("encodes");
        assert!(encoded.starts_with(&format!("{LAYOUT_HEADER}:12x8:")));

        let decoded = FieldLayout::decode(&encoded).expect("layout decodes");
        assert_eq!(decoded.to_field(), field);
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        let error = FieldLayout::decode("grid:v1:4x4:e30").expect_err("prefix rejected");
        assert!(matches!(error, LayoutTransferError::InvalidPrefix(prefix) if prefix == "grid"));
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        let error = FieldLayout::decode("field:v1:0x4:e30").expect_err("dimensions rejected");
        assert!(matches!(error, LayoutTransferError::InvalidDimensions(_)));
    }

    #[test]
    fn blocked_tiles_must_lie_inside_grid() {
        let layout = FieldLayout {
            columns: 2,
            rows: 2,
            tile_length: 10.0,
            blocked: vec![TileCoord::new(2, 0)],
        };
        let encoded = layout.encode().expect("encodes");

        let error = FieldLayout::decode(&encoded).expect_err("tile rejected");
        assert!(matches!(
            error,
            LayoutTransferError::TileOutOfBounds(tile) if tile == TileCoord::new(2, 0)
        ));
    }

    #[test]
    fn non_positive_tile_length_is_rejected() {
        let layout = FieldLayout {
            columns: 2,
            rows: 2,
            tile_length: 0.0,
            blocked: Vec::new(),
        };
        let encoded = layout.encode().expect("encodes");

        assert!(matches!(
            FieldLayout::decode(&encoded),
            Err(LayoutTransferError::InvalidTileLength(_))
        ));
    }
}
