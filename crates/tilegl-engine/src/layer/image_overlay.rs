use std::time::Instant;

use tilegl_batch::{BatchError, MaterialTag, QuadId, TextureId};

use super::{set_quad_alpha, QuadFill};
use crate::coords::Bounds;
use crate::map::GlMap;

/// Image overlay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOverlayOptions {
    pub material: MaterialTag,
    pub depth: f32,
    pub opacity: f32,
}

impl Default for ImageOverlayOptions {
    fn default() -> Self {
        Self { material: MaterialTag(0), depth: 0.0, opacity: 1.0 }
    }
}

/// A single image stretched over fixed world bounds.
#[derive(Debug)]
pub struct ImageOverlay {
    options: ImageOverlayOptions,
    bounds: Bounds,
    texture: TextureId,
    quad: Option<QuadId>,
    age: u32,
}

impl ImageOverlay {
    pub fn new(bounds: Bounds, texture: TextureId, options: ImageOverlayOptions) -> Self {
        Self { options, bounds, texture, quad: None, age: 0 }
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.options.opacity
    }

    #[inline]
    pub fn quad(&self) -> Option<QuadId> {
        self.quad
    }

    fn fill(&self) -> QuadFill {
        QuadFill {
            bounds: self.bounds,
            depth: self.options.depth,
            texture: self.texture,
            alpha: self.options.opacity,
            age: self.age,
            z_fighting: 0,
        }
    }

    /// Places the overlay on `map`, fading it in from `now`.
    ///
    /// Adding an overlay that is already on the map re-creates its quad. On
    /// failure the overlay keeps its current quad.
    pub fn add_to(&mut self, map: &mut GlMap, now: Instant) -> Result<QuadId, BatchError> {
        let age = map.time_ms(now);
        let fill = QuadFill { age, ..self.fill() };
        let quad = fill.allocate(map.batch_mut(), self.options.material)?;

        if let Some(old) = self.quad.replace(quad) {
            map.batch_mut().purge_quad(old);
        }
        self.age = age;
        map.render_fade(now);
        Ok(quad)
    }

    /// Takes the overlay off the map. Returns false if it was not on it.
    pub fn remove(&mut self, map: &mut GlMap) -> bool {
        let Some(quad) = self.quad.take() else { return false };
        let purged = map.batch_mut().purge_quad(quad);
        map.render_once();
        purged
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

    /// Moves the overlay to new world bounds without restarting its fade.
    pub fn set_bounds(&mut self, map: &mut GlMap, bounds: Bounds) -> Result<(), BatchError> {
        self.bounds = bounds;
        let Some(quad) = self.quad else { return Ok(()) };
        if self.fill().refill(map.batch_mut(), quad)? {
            map.render_once();
        } else {
            self.drop_stale(map, quad);
        }
        Ok(())
    }

    fn drop_stale(&mut self, map: &mut GlMap, quad: QuadId) {
        log::debug!("image overlay lost its quad; dropping it");
        map.batch_mut().purge_quad(quad);
        self.quad = None;
    }
}
