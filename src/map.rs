pub mod footstep;

pub use footstep::{FootstepMap, ObstacleDistance};

use crate::error::{MapError, PlanningError};

use std::fs;
use tracing::{debug, error};

/// Largest accepted width or height of a loaded map, in cells.
pub const MAX_DIMENSION: usize = 1000;

/// Occupancy grid, row-major, `true` = occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    pub width: usize,
    pub height: usize,
    occupied: Vec<bool>,
}

impl GridMap {
    pub fn new(width: usize, height: usize, occupied: Vec<bool>) -> Result<Self, MapError> {
        if occupied.len() != width * height {
            return Err(MapError::DataLength {
                expected: width * height,
                found: occupied.len(),
            });
        }
        Ok(GridMap {
            width,
            height,
            occupied,
        })
    }

    /// Builds a map from text rows where `#` marks an occupied cell.
    pub fn from_ascii(rows: &[&str]) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        let mut occupied = Vec::with_capacity(width * height);
        for row in rows {
            if row.chars().count() != width {
                return Err(MapError::BadHeader(format!(
                    "row {row:?} does not have {width} cells"
                )));
            }
            occupied.extend(row.chars().map(|ch| ch == '#'));
        }
        Self::new(width, height, occupied)
    }

    /// Loads a plain (P1) PBM file.
    pub fn from_file(path: &str) -> Result<Self, MapError> {
        let bytes = fs::read(path).map_err(|source| {
            error!("could not open map file {path}");
            MapError::Io {
                path: path.to_string(),
                source,
            }
        })?;
        Self::from_pbm(&bytes).map_err(|err| {
            error!("could not parse map file {path}: {err}");
            err
        })
    }

    /// Parses a plain PBM: `P1`, width, height, then one `0`/`1` per cell.
    /// Any other character in the data section is ignored.
    pub fn from_pbm(bytes: &[u8]) -> Result<Self, MapError> {
        let (tokens, offset) = read_header(bytes, 3)?;
        expect_magic(&tokens[0], "P1")?;
        let (width, height) = parse_dimensions(&tokens[1], &tokens[2])?;

        let occupied: Vec<bool> = bytes[offset..]
            .iter()
            .filter_map(|b| match b {
                b'0' => Some(false),
                b'1' => Some(true),
                _ => None,
            })
            .collect();

        debug!("loaded {width}x{height} occupancy map");
        Self::new(width, height, occupied)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tests if a cell is occupied. Cells outside the map are an error.
    pub fn is_occupied(&self, x: i32, y: i32) -> Result<bool, PlanningError> {
        if !self.in_bounds(x, y) {
            return Err(PlanningError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.occupied[y as usize * self.width + x as usize])
    }
}

/// Splits off the first `count` whitespace separated header tokens, skipping
/// `#` comments. Returns the tokens and the offset right after the last one.
pub(crate) fn read_header(bytes: &[u8], count: usize) -> Result<(Vec<String>, usize), MapError> {
    let mut tokens = Vec::with_capacity(count);
    let mut pos = 0;
    while tokens.len() < count {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos < bytes.len() && bytes[pos] == b'#' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if pos >= bytes.len() {
            return Err(MapError::BadHeader(format!(
                "expected {count} header fields, found {}",
                tokens.len()
            )));
        }
        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        tokens.push(String::from_utf8_lossy(&bytes[start..pos]).into_owned());
    }
    Ok((tokens, pos))
}

pub(crate) fn expect_magic(found: &str, expected: &'static str) -> Result<(), MapError> {
    if found != expected {
        return Err(MapError::BadMagic {
            expected,
            found: found.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn parse_dimensions(width: &str, height: &str) -> Result<(usize, usize), MapError> {
    let parse = |field: &str| {
        field
            .parse::<usize>()
            .map_err(|_| MapError::BadHeader(format!("invalid dimension {field:?}")))
    };
    let (width, height) = (parse(width)?, parse(height)?);
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(MapError::TooLarge {
            width,
            height,
            limit: MAX_DIMENSION,
        });
    }
    Ok((width, height))
}
