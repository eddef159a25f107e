use crate::coords::{Bounds, Point};

/// Half the circumference of the web mercator world, in meters.
const MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Address of one tile in a quadtree pyramid.
///
/// `x` grows east, `y` grows south (image rows), `z` is the zoom level.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TileCoords {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoords {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

/// A square world region tiled as a quadtree.
///
/// `origin` is the north-west corner of the single zoom-0 tile and `extent`
/// its side length, both in world units. Tile rows count downwards from the
/// origin while world y grows upwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileGrid {
    pub origin: Point,
    pub extent: f64,
}

impl TileGrid {
    /// The usual `z/x/y` web mercator tile scheme.
    pub const fn web_mercator() -> Self {
        Self {
            origin: Point::new(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT),
            extent: 2.0 * MERCATOR_HALF_EXTENT,
        }
    }

    /// Side length of a tile at zoom `z`.
    #[inline]
    pub fn tile_size(&self, z: u8) -> f64 {
        self.extent / f64::from(z).exp2()
    }

    /// World bounds covered by `coords`.
    pub fn tile_bounds(&self, coords: TileCoords) -> Bounds {
        let size = self.tile_size(coords.z);
        let min_x = self.origin.x + f64::from(coords.x) * size;
        let max_y = self.origin.y - f64::from(coords.y) * size;
        Bounds::new(Point::new(min_x, max_y - size), Point::new(min_x + size, max_y))
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::web_mercator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_zero_covers_the_whole_grid() {
        let grid = TileGrid { origin: Point::new(0.0, 256.0), extent: 256.0 };
        let b = grid.tile_bounds(TileCoords::new(0, 0, 0));
        assert_eq!(b, Bounds::new(Point::new(0.0, 0.0), Point::new(256.0, 256.0)));
    }

    #[test]
    fn rows_count_downwards() {
        let grid = TileGrid { origin: Point::new(0.0, 256.0), extent: 256.0 };
        let top = grid.tile_bounds(TileCoords::new(1, 0, 1));
        let bottom = grid.tile_bounds(TileCoords::new(1, 1, 1));
        assert_eq!(top, Bounds::new(Point::new(128.0, 128.0), Point::new(256.0, 256.0)));
        assert_eq!(bottom, Bounds::new(Point::new(128.0, 0.0), Point::new(256.0, 128.0)));
    }

    #[test]
    fn mercator_tiles_meet_at_the_origin() {
        let grid = TileGrid::web_mercator();
        let b = grid.tile_bounds(TileCoords::new(1, 1, 1));
        assert!(b.min.x.abs() < 1e-6);
        assert!(b.max.y.abs() < 1e-6);
        assert!((grid.tile_size(1) - MERCATOR_HALF_EXTENT).abs() < 1e-6);
    }
}
