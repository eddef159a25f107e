use std::time::Instant;

use tilegl_batch::{BatchError, MaterialTag, QuadId, TextureId};

use super::{set_quad_alpha, QuadFill};
use crate::coords::{Bounds, Point};
use crate::map::GlMap;

/// Sprite configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteOptions {
    pub material: MaterialTag,
    pub depth: f32,
    pub opacity: f32,
    /// Pixel of the image (from its top-left corner) that sits on the
    /// sprite's position. `None` centers the image.
    pub anchor: Option<Point>,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        Self { material: MaterialTag(0), depth: 0.0, opacity: 1.0, anchor: None }
    }
}

/// An image pinned to a world point, drawn at a fixed pixel size.
///
/// The pixel size is turned into world units with the view's scale whenever
/// the sprite is placed; call [`refit`](Self::refit) after a zoom to restore
/// its on-screen size.
#[derive(Debug)]
pub struct Sprite {
    options: SpriteOptions,
    position: Point,
    /// Image size in pixels.
    size: Point,
    texture: TextureId,
    quad: Option<QuadId>,
    age: u32,
}

impl Sprite {
    pub fn new(position: Point, size: Point, texture: TextureId, options: SpriteOptions) -> Self {
        Self { options, position, size, texture, quad: None, age: 0 }
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn quad(&self) -> Option<QuadId> {
        self.quad
    }

    /// World bounds of the sprite image at `units_per_pixel`.
    pub fn footprint(&self, units_per_pixel: Point) -> Bounds {
        let anchor = self.options.anchor.unwrap_or(self.size / 2.0);
        let min_x = self.position.x - anchor.x * units_per_pixel.x;
        let max_y = self.position.y + anchor.y * units_per_pixel.y;
        let world = self.size.scale_by(units_per_pixel);
        Bounds::new(Point::new(min_x, max_y - world.y), Point::new(min_x + world.x, max_y))
    }

    fn fill(&self, map: &GlMap) -> QuadFill {
        QuadFill {
            bounds: self.footprint(map.units_per_pixel()),
            depth: self.options.depth,
            texture: self.texture,
            alpha: self.options.opacity,
            age: self.age,
            z_fighting: 0,
        }
    }

    /// Places the sprite on `map`, fading it in from `now`.
    ///
    /// A sprite already on the map gets a new quad; if that allocation fails
    /// the old one stays.
    pub fn add_to(&mut self, map: &mut GlMap, now: Instant) -> Result<QuadId, BatchError> {
        let age = map.time_ms(now);
        let fill = QuadFill { age, ..self.fill(map) };
        let quad = fill.allocate(map.batch_mut(), self.options.material)?;

        if let Some(old) = self.quad.replace(quad) {
            map.batch_mut().purge_quad(old);
        }
        self.age = age;
        map.render_fade(now);
        Ok(quad)
    }

    /// Takes the sprite off the map. Returns false if it was not on it.
    pub fn remove(&mut self, map: &mut GlMap) -> bool {
        let Some(quad) = self.quad.take() else { return false };
        let purged = map.batch_mut().purge_quad(quad);
        map.render_once();
        purged
    }

    pub fn set_position(&mut self, map: &mut GlMap, position: Point) -> Result<(), BatchError> {
        self.position = position;
        self.refit(map)
    }

    /// Re-derives the world footprint from the map's current scale.
    pub fn refit(&mut self, map: &mut GlMap) -> Result<(), BatchError> {
        let Some(quad) = self.quad else { return Ok(()) };
        let fill = self.fill(map);
        if fill.refill(map.batch_mut(), quad)? {
            map.render_once();
        } else {
            self.drop_stale(map, quad);
        }
        Ok(())
    }

    pub fn set_opacity(&mut self, map: &mut GlMap, opacity: f32) {
        self.options.opacity = opacity;
        let Some(quad) = self.quad else { return };
        if set_quad_alpha(map.batch_mut(), quad, opacity) {
            map.render_once();
        } else {
            self.drop_stale(map, quad);
        }
    }

    fn drop_stale(&mut self, map: &mut GlMap, quad: QuadId) {
        log::debug!("sprite at {:?} lost its quad; dropping it", self.position);
        map.batch_mut().purge_quad(quad);
        self.quad = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::map::MapConfig;
    use crate::view::MapView;

    /// 200x100 px viewport showing 400x200 world units: 2 units per pixel.
    fn setup() -> (GlMap, Instant) {
        let t0 = Instant::now();
        let mut map = GlMap::new(MapConfig::default(), t0).unwrap();
        map.on_resize(
            Viewport::new(200.0, 100.0),
            MapView::new(Point::zero(), Point::new(200.0, 100.0)),
        );
        (map, t0)
    }

    fn sprite(anchor: Option<Point>) -> Sprite {
        let options = SpriteOptions { anchor, ..SpriteOptions::default() };
        Sprite::new(Point::new(100.0, 50.0), Point::new(16.0, 8.0), TextureId(5), options)
    }

    // ── footprint ─────────────────────────────────────────────────────────

    #[test]
    fn centered_by_default() {
        let b = sprite(None).footprint(Point::new(2.0, 2.0));
        assert_eq!(b, Bounds::new(Point::new(84.0, 42.0), Point::new(116.0, 58.0)));
        assert_eq!(b.center(), Point::new(100.0, 50.0));
    }

    #[test]
    fn anchor_measures_from_top_left() {
        // Anchored at the bottom-center pixel, like a pin.
        let b = sprite(Some(Point::new(8.0, 8.0))).footprint(Point::new(1.0, 1.0));
        assert_eq!(b, Bounds::new(Point::new(92.0, 50.0), Point::new(108.0, 58.0)));
    }

    // ── placement ─────────────────────────────────────────────────────────

    #[test]
    fn add_uses_current_scale() {
        let (mut map, t0) = setup();
        let mut s = sprite(None);
        let quad = s.add_to(&mut map, t0).unwrap();
        let q = map.batch_mut().quad_mut(quad).unwrap();
        assert_eq!(q.vertex(0).unwrap().position, [84.0, 42.0, 0.0]);
        assert_eq!(q.vertex(3).unwrap().position, [116.0, 58.0, 0.0]);
    }

    #[test]
    fn failed_re_add_keeps_the_sprite_drawn() {
        let t0 = Instant::now();
        let mut map = super::super::cramped_map(t0);
        let mut s = sprite(None);
        let quad = s.add_to(&mut map, t0).unwrap();

        let err = s.add_to(&mut map, t0).unwrap_err();
        assert!(matches!(err, BatchError::AllocationFailed { .. }));
        assert_eq!(s.quad(), Some(quad));
        assert!(s.remove(&mut map));
    }

    #[test]
    fn refit_after_zoom_keeps_pixel_size() {
        let (mut map, t0) = setup();
        let mut s = sprite(None);
        let quad = s.add_to(&mut map, t0).unwrap();

        map.on_move(MapView::new(Point::zero(), Point::new(100.0, 50.0)));
        s.refit(&mut map).unwrap();
        let q = map.batch_mut().quad_mut(quad).unwrap();
        assert_eq!(q.vertex(0).unwrap().position, [92.0, 46.0, 0.0]);
    }

    #[test]
    fn set_position_moves_the_quad() {
        let (mut map, t0) = setup();
        let mut s = sprite(None);
        let quad = s.add_to(&mut map, t0).unwrap();
        s.set_position(&mut map, Point::new(0.0, 0.0)).unwrap();
        let q = map.batch_mut().quad_mut(quad).unwrap();
        assert_eq!(q.vertex(0).unwrap().position, [-16.0, -8.0, 0.0]);
    }

    #[test]
    fn stale_sprite_forgets_its_quad() {
        let (mut map, t0) = setup();
        let mut s = sprite(None);
        let quad = s.add_to(&mut map, t0).unwrap();
        map.batch_mut().purge_quad(quad);
        s.set_position(&mut map, Point::zero()).unwrap();
        assert!(s.quad().is_none());
        assert!(!s.remove(&mut map));
    }
}
