use super::{expect_magic, parse_dimensions, read_header, GridMap};
use crate::error::MapError;

use std::fs;
use std::path::Path;
use tracing::{debug, error};

/// Width of one orientation bin of the distance field, in degrees.
pub const ANGLE_STEP_DEG: usize = 15;

/// Number of orientation bins covering the half circle.
pub const ANGLE_BINS: usize = 180 / ANGLE_STEP_DEG;

/// Clearance lookup used for footstep collision checks.
pub trait ObstacleDistance {
    /// Approximate distance in meters from a foot at `(x, y, theta)` to the
    /// nearest obstacle.
    fn distance_to_nearest_obstacle(&self, x: f64, y: f64, theta: f64) -> f64;
}

/// Grid map with one precomputed distance field per foot orientation bin.
#[derive(Debug, Clone)]
pub struct FootstepMap {
    grid: GridMap,
    distance_maps: Vec<Vec<u8>>,
    resolution: f64,
    scale: f64,
}

impl FootstepMap {
    pub fn new(
        grid: GridMap,
        distance_maps: Vec<Vec<u8>>,
        resolution: f64,
        scale: f64,
    ) -> Result<Self, MapError> {
        let cells = grid.width * grid.height;
        if let Some(bad) = distance_maps.iter().find(|m| m.len() != cells) {
            return Err(MapError::DataLength {
                expected: cells,
                found: bad.len(),
            });
        }
        Ok(FootstepMap {
            grid,
            distance_maps,
            resolution,
            scale,
        })
    }

    /// Loads `map.pbm` and `distance_<deg>.pgm` for every orientation bin
    /// from `dir`.
    pub fn load(dir: impl AsRef<Path>, resolution: f64, scale: f64) -> Result<Self, MapError> {
        let dir = dir.as_ref();
        let map_path = dir.join("map.pbm");
        let grid = GridMap::from_file(&map_path.to_string_lossy())?;

        let mut distance_maps = Vec::with_capacity(ANGLE_BINS);
        for bin in 0..ANGLE_BINS {
            let path = dir.join(format!("distance_{}.pgm", bin * ANGLE_STEP_DEG));
            let path = path.to_string_lossy();
            let bytes = fs::read(path.as_ref()).map_err(|source| {
                error!("could not load {path} for reading distance map");
                MapError::Io {
                    path: path.to_string(),
                    source,
                }
            })?;
            let distances = Self::parse_distance_map(&bytes, grid.width, grid.height)
                .map_err(|err| {
                    error!("could not parse distance map {path}: {err}");
                    err
                })?;
            distance_maps.push(distances);
        }

        debug!(
            "loaded footstep map {}x{} with {} distance maps",
            grid.width,
            grid.height,
            distance_maps.len()
        );
        Self::new(grid, distance_maps, resolution, scale)
    }

    /// Parses a binary (P5) PGM with depth 255 whose size must match the
    /// occupancy map. The depth field must be followed by exactly one
    /// whitespace byte; a `\r\n` line ending is rejected as a bad header.
    pub fn parse_distance_map(bytes: &[u8], width: usize, height: usize) -> Result<Vec<u8>, MapError> {
        let (tokens, offset) = read_header(bytes, 4)?;
        expect_magic(&tokens[0], "P5")?;
        let (found_width, found_height) = parse_dimensions(&tokens[1], &tokens[2])?;
        if found_width != width || found_height != height {
            return Err(MapError::DimensionMismatch {
                width,
                height,
                found_width,
                found_height,
            });
        }
        let depth = tokens[3]
            .parse::<usize>()
            .map_err(|_| MapError::BadHeader(format!("invalid depth {:?}", tokens[3])))?;
        if depth != 255 {
            return Err(MapError::BadDepth(depth));
        }

        // Exactly one whitespace byte separates the header from the pixels.
        let data = bytes.get(offset + 1..).unwrap_or(&[]);
        if data.len() == width * height + 1 && bytes.get(offset..offset + 2) == Some(&b"\r\n"[..]) {
            return Err(MapError::BadHeader(
                "header must end with a single whitespace byte, found \\r\\n".to_string(),
            ));
        }
        if data.len() != width * height {
            return Err(MapError::DataLength {
                expected: width * height,
                found: data.len(),
            });
        }
        Ok(data.to_vec())
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

impl ObstacleDistance for FootstepMap {
    fn distance_to_nearest_obstacle(&self, x: f64, y: f64, theta: f64) -> f64 {
        if self.distance_maps.is_empty() {
            return 0.0;
        }
        // A foot turned by 180 degrees covers the same cells.
        let mut t = theta.to_degrees().rem_euclid(360.0);
        if t >= 180.0 {
            t -= 180.0;
        }
        let bin = (t / ANGLE_STEP_DEG as f64 + 0.5).floor() as usize % self.distance_maps.len();

        let col = (x / self.resolution + 0.5).floor();
        let row = self.grid.height as f64 - (y / self.resolution + 0.5).floor();
        if col < 0.0 || row < 0.0 || col >= self.grid.width as f64 || row >= self.grid.height as f64 {
            return 0.0;
        }

        let value = self.distance_maps[bin][row as usize * self.grid.width + col as usize];
        value as f64 / self.scale * self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pgm(width: usize, height: usize, data: &[u8]) -> Vec<u8> {
        let mut bytes = format!("P5\n{width} {height}\n255\n").into_bytes();
        bytes.extend_from_slice(data);
        bytes
    }

    // 4x4 map where every bin stores its own index + 10 at each cell, except
    // cell (col 1, row 2) which stores 50.
    fn binned_map() -> FootstepMap {
        let grid = GridMap::new(4, 4, vec![false; 16]).unwrap();
        let distance_maps = (0..ANGLE_BINS)
            .map(|bin| {
                let mut cells = vec![bin as u8 + 10; 16];
                cells[2 * 4 + 1] = 50;
                cells
            })
            .collect();
        FootstepMap::new(grid, distance_maps, 0.01, 5.0).unwrap()
    }

    #[test]
    fn test_distance_lookup() {
        let map = binned_map();

        // x = 0.01 -> col 1, y = 0.02 -> row 4 - 2 = 2.
        let d = map.distance_to_nearest_obstacle(0.01, 0.02, 0.0);
        assert!((d - 50.0 / 5.0 * 0.01).abs() < 1e-12);

        // 30 degrees -> bin 2 at col 0, row 4 - 1 = 3.
        let d = map.distance_to_nearest_obstacle(0.0, 0.01, 30f64.to_radians());
        assert!((d - 12.0 / 5.0 * 0.01).abs() < 1e-12);

        // 210 degrees folds onto 30 degrees, -150 degrees as well.
        let folded = map.distance_to_nearest_obstacle(0.0, 0.01, 210f64.to_radians());
        let negative = map.distance_to_nearest_obstacle(0.0, 0.01, (-150f64).to_radians());
        assert!((folded - d).abs() < 1e-12);
        assert!((negative - d).abs() < 1e-12);

        // 179 degrees rounds up to 180, which is bin 0 again.
        let wrapped = map.distance_to_nearest_obstacle(0.0, 0.01, 179f64.to_radians());
        assert!((wrapped - 10.0 / 5.0 * 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_outside_map_has_no_clearance() {
        let map = binned_map();
        assert_eq!(map.distance_to_nearest_obstacle(-0.02, 0.02, 0.0), 0.0);
        assert_eq!(map.distance_to_nearest_obstacle(0.04, 0.02, 0.0), 0.0);
        // y = 0 maps to row 4, one past the last row.
        assert_eq!(map.distance_to_nearest_obstacle(0.01, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_parse_distance_map() {
        let cells = FootstepMap::parse_distance_map(&pgm(2, 2, &[1, 2, 3, 4]), 2, 2).unwrap();
        assert_eq!(cells, vec![1, 2, 3, 4]);

        assert!(matches!(
            FootstepMap::parse_distance_map(&pgm(2, 2, &[1, 2, 3, 4]), 3, 2),
            Err(MapError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            FootstepMap::parse_distance_map(&pgm(2, 2, &[1, 2, 3]), 2, 2),
            Err(MapError::DataLength { .. })
        ));
        assert!(matches!(
            FootstepMap::parse_distance_map(b"P5\r\n2 2\r\n255\r\n\x01\x02\x03\x04", 2, 2),
            Err(MapError::BadHeader(message)) if message.contains("\\r\\n")
        ));
        assert!(matches!(
            FootstepMap::parse_distance_map(b"P5\n2 2\n127\n\x01\x02\x03\x04", 2, 2),
            Err(MapError::BadDepth(127))
        ));
        assert!(matches!(
            FootstepMap::parse_distance_map(b"P1\n2 2\n255\n\x01\x02\x03\x04", 2, 2),
            Err(MapError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("footstep_map_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("map.pbm"), "P1\n2 2\n0 0\n1 0\n").unwrap();
        for bin in 0..ANGLE_BINS {
            let deg = bin * ANGLE_STEP_DEG;
            fs::write(
                dir.join(format!("distance_{deg}.pgm")),
                pgm(2, 2, &[bin as u8, 0, 0, 0]),
            )
            .unwrap();
        }

        let map = FootstepMap::load(&dir, 0.01, 5.0).unwrap();
        assert_eq!(map.grid().width, 2);
        assert!(map.grid().is_occupied(0, 1).unwrap());
        // Cell (col 0, row 0) is y = 0.02 with two rows; bin 3 = 45 degrees.
        let d = map.distance_to_nearest_obstacle(0.0, 0.02, 45f64.to_radians());
        assert!((d - 3.0 / 5.0 * 0.01).abs() < 1e-12);

        fs::remove_file(dir.join("distance_90.pgm")).unwrap();
        assert!(matches!(
            FootstepMap::load(&dir, 0.01, 5.0),
            Err(MapError::Io { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
