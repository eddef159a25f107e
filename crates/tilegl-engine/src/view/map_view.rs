use crate::coords::{Bounds, Point, Viewport};

/// Visible world region: a center and a half extent, both in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapView {
    pub center: Point,
    pub half_size: Point,
}

impl Default for MapView {
    fn default() -> Self {
        Self { center: Point::zero(), half_size: Point::new(1.0, 1.0) }
    }
}

impl MapView {
    #[inline]
    pub const fn new(center: Point, half_size: Point) -> Self {
        Self { center, half_size }
    }

    /// View of `viewport` pixels centered on `center` at `units_per_pixel`.
    pub fn from_viewport(center: Point, viewport: Viewport, units_per_pixel: f64) -> Self {
        Self { center, half_size: viewport.half_extent() * units_per_pixel }
    }

    /// A degenerate half size would divide by zero in the shader.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.half_size.is_finite()
            && self.half_size.x != 0.0
            && self.half_size.y != 0.0
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(self.center - self.half_size, self.center + self.half_size)
    }

    /// World units covered by one pixel on each axis.
    pub fn units_per_pixel(&self, viewport: Viewport) -> Point {
        self.half_size.unscale_by(viewport.half_extent())
    }

    /// World → clip space (`[-1, 1]` across the view). Mirrors the vertex shader.
    #[inline]
    pub fn to_clip(&self, world: Point) -> Point {
        (world - self.center).unscale_by(self.half_size)
    }

    /// World position under pixel `px`.
    pub fn world_at(&self, viewport: Viewport, px: Point) -> Point {
        self.center + self.half_size.scale_by(viewport.to_relative(px))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> MapView {
        MapView::from_viewport(Point::new(100.0, 50.0), Viewport::new(200.0, 100.0), 2.0)
    }

    #[test]
    fn from_viewport_scales_half_extent() {
        assert_eq!(view().half_size, Point::new(200.0, 100.0));
        assert_eq!(view().units_per_pixel(Viewport::new(200.0, 100.0)), Point::new(2.0, 2.0));
    }

    #[test]
    fn clip_space_spans_the_view() {
        let v = view();
        assert_eq!(v.to_clip(v.center), Point::zero());
        assert_eq!(v.to_clip(v.center + v.half_size), Point::new(1.0, 1.0));
    }

    #[test]
    fn top_left_pixel_is_north_west() {
        let v = view();
        let nw = v.world_at(Viewport::new(200.0, 100.0), Point::new(0.0, 0.0));
        assert_eq!(nw, Point::new(-100.0, 150.0));
    }

    #[test]
    fn zero_half_size_is_invalid() {
        assert!(!MapView::new(Point::zero(), Point::new(0.0, 1.0)).is_valid());
        assert!(view().is_valid());
    }
}
