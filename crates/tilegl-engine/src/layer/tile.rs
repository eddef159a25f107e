use std::collections::HashMap;
use std::time::Instant;

use tilegl_batch::{BatchError, MaterialTag, QuadId, TextureId};

use super::{QuadFill, TileCoords, TileGrid};
use crate::map::GlMap;

/// Tile layer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerOptions {
    pub material: MaterialTag,
    /// Clip-space depth of every tile; larger values are drawn first.
    pub depth: f32,
    pub tile_grid: TileGrid,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self { material: MaterialTag(0), depth: 0.0, tile_grid: TileGrid::default() }
    }
}

#[derive(Debug, Copy, Clone)]
struct LoadedTile {
    quad: QuadId,
    texture: TextureId,
}

/// Tiles of one tile source, each drawn as one quad.
///
/// Tiles of several zoom levels coexist while the host loads and unloads
/// them. Their z-fighting index is their distance from the current zoom, so
/// the tiles closest to the map's zoom level end up on top.
#[derive(Debug)]
pub struct TileLayer {
    options: TileLayerOptions,
    tiles: HashMap<TileCoords, LoadedTile>,
}

/// Stacking index of a tile at zoom `z` seen at `zoom`.
fn z_fighting(z: u8, zoom: f64) -> i32 {
    (f64::from(z) - zoom).abs().round() as i32
}

impl TileLayer {
    pub fn new(options: TileLayerOptions) -> Self {
        Self { options, tiles: HashMap::new() }
    }

    #[inline]
    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, coords: TileCoords) -> bool {
        self.tiles.contains_key(&coords)
    }

    pub fn quad(&self, coords: TileCoords) -> Option<QuadId> {
        self.tiles.get(&coords).map(|t| t.quad)
    }

    /// Places a loaded tile image.
    ///
    /// A tile already present at `coords` is replaced; its texture is
    /// returned so the caller can release it. If the new quad cannot be
    /// allocated the old tile stays in place.
    pub fn tile_ready(
        &mut self,
        map: &mut GlMap,
        coords: TileCoords,
        texture: TextureId,
        now: Instant,
    ) -> Result<Option<TextureId>, BatchError> {
        let fill = QuadFill {
            bounds: self.options.tile_grid.tile_bounds(coords),
            depth: self.options.depth,
            texture,
            alpha: 1.0,
            age: map.time_ms(now),
            z_fighting: z_fighting(coords.z, map.zoom()),
        };
        let quad = fill.allocate(map.batch_mut(), self.options.material)?;

        let replaced = self.tiles.insert(coords, LoadedTile { quad, texture }).map(|old| {
            map.batch_mut().purge_quad(old.quad);
            old.texture
        });
        map.render_fade(now);
        Ok(replaced)
    }

    /// Removes the tile at `coords`, returning its texture.
    pub fn remove_tile(&mut self, map: &mut GlMap, coords: TileCoords) -> Option<TextureId> {
        let tile = self.tiles.remove(&coords)?;
        if map.batch_mut().purge_quad(tile.quad) {
            map.render_once();
        }
        Some(tile.texture)
    }

    /// Restacks every tile against the map's current zoom level.
    pub fn sync_zoom(&mut self, map: &mut GlMap) {
        let zoom = map.zoom();
        let batch = map.batch_mut();
        self.tiles.retain(|coords, tile| match batch.quad_mut(tile.quad) {
            Some(mut quad) => {
                quad.set_z_fighting(z_fighting(coords.z, zoom));
                true
            }
            None => {
                log::debug!("tile {coords:?} lost its quad; dropping it");
                batch.purge_quad(tile.quad);
                false
            }
        });
        map.render_once();
    }

    /// Removes every tile, returning their textures.
    pub fn clear(&mut self, map: &mut GlMap) -> Vec<TextureId> {
        let batch = map.batch_mut();
        let textures = self
            .tiles
            .drain()
            .map(|(_, tile)| {
                batch.purge_quad(tile.quad);
                tile.texture
            })
            .collect();
        map.render_once();
        textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point;
    use crate::map::MapConfig;

    fn setup() -> (GlMap, TileLayer, Instant) {
        let t0 = Instant::now();
        let map = GlMap::new(MapConfig::default(), t0).unwrap();
        let grid = TileGrid { origin: Point::new(0.0, 256.0), extent: 256.0 };
        let layer = TileLayer::new(TileLayerOptions {
            depth: 2.0,
            tile_grid: grid,
            ..Default::default()
        });
        (map, layer, t0)
    }

    fn z_of(map: &GlMap, quad: QuadId) -> i32 {
        map.batch().lookup(quad.first).unwrap().z_fighting()
    }

    // ── tile_ready ────────────────────────────────────────────────────────

    #[test]
    fn tile_becomes_a_textured_quad() {
        let (mut map, mut layer, t0) = setup();
        let coords = TileCoords::new(1, 0, 1);
        layer.tile_ready(&mut map, coords, TextureId(9), t0).unwrap();

        let quad = layer.quad(coords).unwrap();
        let first = map.batch().lookup(quad.first).unwrap();
        assert_eq!(first.texture(), TextureId(9));
        assert_eq!(first.clip_depth(), 2.0);
        assert_eq!(first.vertex(0).unwrap().position, [128.0, 128.0, 2.0]);
        assert_eq!(map.batch().len(), 2);
    }

    #[test]
    fn replacing_a_tile_returns_old_texture() {
        let (mut map, mut layer, t0) = setup();
        let coords = TileCoords::new(0, 0, 0);
        assert_eq!(layer.tile_ready(&mut map, coords, TextureId(1), t0).unwrap(), None);
        let replaced = layer.tile_ready(&mut map, coords, TextureId(2), t0).unwrap();
        assert_eq!(replaced, Some(TextureId(1)));
        assert_eq!(layer.len(), 1);

        map.batch_mut().sort();
        assert_eq!(map.batch().len(), 2);
    }

    #[test]
    fn failed_replace_keeps_the_old_tile() {
        let t0 = Instant::now();
        let mut map = super::super::cramped_map(t0);
        let mut layer = TileLayer::new(TileLayerOptions::default());
        let coords = TileCoords::new(0, 0, 0);
        layer.tile_ready(&mut map, coords, TextureId(1), t0).unwrap();

        let err = layer.tile_ready(&mut map, coords, TextureId(2), t0).unwrap_err();
        assert!(matches!(err, BatchError::AllocationFailed { .. }));
        assert!(layer.contains(coords));
        let quad = layer.quad(coords).unwrap();
        assert_eq!(map.batch().lookup(quad.first).unwrap().texture(), TextureId(1));
        assert_eq!(layer.remove_tile(&mut map, coords), Some(TextureId(1)));
    }

    #[test]
    fn new_tiles_start_a_fade() {
        let (mut map, mut layer, t0) = setup();
        layer.tile_ready(&mut map, TileCoords::new(0, 0, 0), TextureId(1), t0).unwrap();
        assert!(map.scheduler().is_looping());
    }

    // ── zoom stacking ─────────────────────────────────────────────────────

    #[test]
    fn tiles_nearest_the_zoom_stack_last() {
        let (mut map, mut layer, t0) = setup();
        map.set_zoom(2.0);
        let coarse = TileCoords::new(0, 0, 0);
        let fine = TileCoords::new(0, 0, 2);
        layer.tile_ready(&mut map, coarse, TextureId(1), t0).unwrap();
        layer.tile_ready(&mut map, fine, TextureId(2), t0).unwrap();

        assert_eq!(z_of(&map, layer.quad(coarse).unwrap()), 2);
        assert_eq!(z_of(&map, layer.quad(fine).unwrap()), 0);

        map.batch_mut().sort();
        let order: Vec<TextureId> = map.batch().iter().map(|t| t.texture()).collect();
        assert_eq!(order, vec![TextureId(1), TextureId(1), TextureId(2), TextureId(2)]);
    }

    #[test]
    fn sync_zoom_restacks_tiles() {
        let (mut map, mut layer, t0) = setup();
        let coords = TileCoords::new(0, 0, 0);
        layer.tile_ready(&mut map, coords, TextureId(1), t0).unwrap();
        map.batch_mut().sort();

        map.set_zoom(3.0);
        layer.sync_zoom(&mut map);
        let quad = layer.quad(coords).unwrap();
        assert_eq!(z_of(&map, quad), 3);
        assert_eq!(map.batch().lookup(quad.second).unwrap().z_fighting(), 3);
    }

    #[test]
    fn stale_tiles_are_dropped() {
        let (mut map, mut layer, t0) = setup();
        let coords = TileCoords::new(0, 0, 0);
        layer.tile_ready(&mut map, coords, TextureId(1), t0).unwrap();
        let quad = layer.quad(coords).unwrap();
        map.batch_mut().purge(quad.first);

        layer.sync_zoom(&mut map);
        assert!(layer.is_empty());
        map.batch_mut().sort();
        assert!(map.batch().is_empty());
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_and_clear_release_textures() {
        let (mut map, mut layer, t0) = setup();
        for x in 0..3 {
            layer.tile_ready(&mut map, TileCoords::new(x, 0, 2), TextureId(x), t0).unwrap();
        }
        assert_eq!(layer.remove_tile(&mut map, TileCoords::new(1, 0, 2)), Some(TextureId(1)));
        assert_eq!(layer.remove_tile(&mut map, TileCoords::new(1, 0, 2)), None);

        let mut rest = layer.clear(&mut map);
        rest.sort();
        assert_eq!(rest, vec![TextureId(0), TextureId(2)]);

        map.batch_mut().sort();
        assert!(map.batch().is_empty());
    }
}
