use super::Point;

/// Size of the drawing surface in pixels (top-left origin, +Y down).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Half the surface size, in pixels.
    #[inline]
    pub fn half_extent(self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Maps a pixel position to `[-1, 1]` on both axes, +Y up.
    ///
    /// The surface center maps to the origin.
    pub fn to_relative(self, px: Point) -> Point {
        let half = self.half_extent();
        Point::new((px.x - half.x) / half.x, (half.y - px.y) / half.y)
    }
}
