//! Layers that place textured quads into a map's batch buffer.
//!
//! Layers keep only [`QuadId`]s between frames. Every mutation looks the
//! quad up again through `&mut GlMap`; a quad that can no longer be found has
//! been purged behind the layer's back and is dropped from its bookkeeping.

mod grid;
mod image_overlay;
mod sprite;
mod tile;

pub use grid::{TileCoords, TileGrid};
pub use image_overlay::{ImageOverlay, ImageOverlayOptions};
pub use sprite::{Sprite, SpriteOptions};
pub use tile::{TileLayer, TileLayerOptions};

use tilegl_batch::{BatchBuffer, BatchError, MaterialTag, Quad, QuadId, TextureId};

use crate::coords::Bounds;

/// Everything written into a layer quad.
#[derive(Debug, Copy, Clone, PartialEq)]
struct QuadFill {
    bounds: Bounds,
    depth: f32,
    texture: TextureId,
    alpha: f32,
    age: u32,
    z_fighting: i32,
}

impl QuadFill {
    fn write(&self, quad: &mut Quad<'_>) -> Result<(), BatchError> {
        let (min, max) = (self.bounds.min.to_f32(), self.bounds.max.to_f32());
        quad.fill_rect(min, max, self.depth, self.texture, self.alpha, self.age)?;
        quad.set_clip_depth(self.depth);
        quad.set_z_fighting(self.z_fighting);
        Ok(())
    }

    /// Allocates a new quad holding this fill.
    fn allocate(&self, batch: &mut BatchBuffer, material: MaterialTag) -> Result<QuadId, BatchError> {
        let mut quad = batch.allocate_quad(material)?;
        if let Err(err) = self.write(&mut quad) {
            quad.purge();
            return Err(err);
        }
        quad.id().ok_or(BatchError::PurgedTriangle)
    }

    /// Rewrites an existing quad. `Ok(false)` if the quad is gone.
    fn refill(&self, batch: &mut BatchBuffer, id: QuadId) -> Result<bool, BatchError> {
        match batch.quad_mut(id) {
            Some(mut quad) => self.write(&mut quad).map(|()| true),
            None => Ok(false),
        }
    }
}

/// Sets the alpha of every vertex of `id`. `false` if the quad is gone.
fn set_quad_alpha(batch: &mut BatchBuffer, id: QuadId, alpha: f32) -> bool {
    match batch.quad_mut(id) {
        Some(mut quad) => {
            quad.set_alpha_all(alpha);
            true
        }
        None => false,
    }
}

/// A map whose batch holds exactly one quad and cannot grow.
#[cfg(test)]
fn cramped_map(epoch: std::time::Instant) -> crate::map::GlMap {
    use tilegl_batch::{BatchConfig, RECORD_SIZE};

    let config = crate::map::MapConfig {
        batch: BatchConfig { initial_capacity: 2 * RECORD_SIZE, grow_increment: isize::MAX as usize },
        ..Default::default()
    };
    crate::map::GlMap::new(config, epoch).unwrap()
}
