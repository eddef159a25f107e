//! Byte layout of one primitive record.
//!
//! A record is one triangle: three 64-byte vertex slots. The first 60 bytes of
//! each slot are vertex attributes; the last 4 bytes hold one word of
//! per-primitive bookkeeping, so the GPU can walk the region with a fixed
//! 64-byte stride and simply ignore the interleaved words.
//!
//! ```text
//! vertex slot (64 bytes)
//!   0   material tag  u8   (1..4 reserved)
//!   4   position      f32 x3
//!  16   tex coord     f32 x2
//!  24   texture id    u32
//!  28   alpha         f32
//!  32   reserved      (24 bytes)
//!  56   age           u32  (ms since the map epoch)
//!  60   interleaved   slot 0: clip depth f32
//!                     slot 1: identifier u32 (0 = deleted)
//!                     slot 2: z-fighting index i32
//! ```
//!
//! Fields are written in native byte order so the live prefix of the batch can
//! be uploaded to the GPU as-is.

use bytemuck::Pod;

/// Size of one primitive record in bytes.
pub const RECORD_SIZE: usize = 192;
/// Distance between two vertices, in bytes.
pub const VERTEX_STRIDE: usize = 64;
/// Vertices per record.
pub const VERTICES_PER_RECORD: usize = 3;

pub const MATERIAL_OFFSET: usize = 0;
pub const POSITION_OFFSET: usize = 4;
pub const TEX_COORD_OFFSET: usize = 16;
pub const TEXTURE_OFFSET: usize = 24;
pub const ALPHA_OFFSET: usize = 28;
pub const AGE_OFFSET: usize = 56;
/// Offset of the interleaved word inside each vertex slot.
pub const INTERLEAVED_OFFSET: usize = 60;

/// Absolute offset of the cached clip-space depth (f32).
pub const CLIP_DEPTH_OFFSET: usize = INTERLEAVED_OFFSET;
/// Absolute offset of the primitive identifier (u32).
pub const ID_OFFSET: usize = VERTEX_STRIDE + INTERLEAVED_OFFSET;
/// Absolute offset of the z-fighting index (i32).
pub const Z_FIGHTING_OFFSET: usize = 2 * VERTEX_STRIDE + INTERLEAVED_OFFSET;

/// Shader/material selector stored in the first byte of every vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct MaterialTag(pub u8);

/// Packed texture identifier. `TextureId(0)` is a valid id like any other.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct TextureId(pub u32);

/// Attribute values for one vertex.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vertex {
    /// World (CRS) coordinates.
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub texture: TextureId,
    pub alpha: f32,
    /// Creation time in milliseconds, used by the shader for fade-in.
    pub age: u32,
}

impl Vertex {
    #[inline]
    pub const fn new(
        position: [f32; 3],
        tex_coord: [f32; 2],
        texture: TextureId,
        alpha: f32,
        age: u32,
    ) -> Self {
        Self { position, tex_coord, texture, alpha, age }
    }
}

/// Typed field accessors over one record's bytes.
///
/// `T` is any byte container of exactly [`RECORD_SIZE`] bytes: `&[u8]` for
/// reads, `&mut [u8]` for writes. Vertex indices are not validated here; the
/// triangle handle does that before reaching this layer.
#[derive(Debug)]
pub struct Record<T> {
    bytes: T,
}

impl<T: AsRef<[u8]>> Record<T> {
    #[inline]
    pub fn new(bytes: T) -> Self {
        debug_assert_eq!(bytes.as_ref().len(), RECORD_SIZE);
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    #[inline]
    fn read<P: Pod>(&self, offset: usize) -> P {
        let size = std::mem::size_of::<P>();
        bytemuck::pod_read_unaligned(&self.bytes.as_ref()[offset..offset + size])
    }

    #[inline]
    fn vertex_base(vertex: usize) -> usize {
        debug_assert!(vertex < VERTICES_PER_RECORD);
        vertex * VERTEX_STRIDE
    }

    #[inline]
    pub fn material(&self, vertex: usize) -> MaterialTag {
        MaterialTag(self.bytes.as_ref()[Self::vertex_base(vertex) + MATERIAL_OFFSET])
    }

    #[inline]
    pub fn position(&self, vertex: usize) -> [f32; 3] {
        self.read(Self::vertex_base(vertex) + POSITION_OFFSET)
    }

    #[inline]
    pub fn tex_coord(&self, vertex: usize) -> [f32; 2] {
        self.read(Self::vertex_base(vertex) + TEX_COORD_OFFSET)
    }

    #[inline]
    pub fn texture(&self, vertex: usize) -> TextureId {
        TextureId(self.read(Self::vertex_base(vertex) + TEXTURE_OFFSET))
    }

    #[inline]
    pub fn alpha(&self, vertex: usize) -> f32 {
        self.read(Self::vertex_base(vertex) + ALPHA_OFFSET)
    }

    #[inline]
    pub fn age(&self, vertex: usize) -> u32 {
        self.read(Self::vertex_base(vertex) + AGE_OFFSET)
    }

    pub fn vertex(&self, vertex: usize) -> Vertex {
        Vertex {
            position: self.position(vertex),
            tex_coord: self.tex_coord(vertex),
            texture: self.texture(vertex),
            alpha: self.alpha(vertex),
            age: self.age(vertex),
        }
    }

    #[inline]
    pub fn clip_depth(&self) -> f32 {
        self.read(CLIP_DEPTH_OFFSET)
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.read(ID_OFFSET)
    }

    #[inline]
    pub fn z_fighting(&self) -> i32 {
        self.read(Z_FIGHTING_OFFSET)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Record<T> {
    #[inline]
    fn write<P: Pod>(&mut self, offset: usize, value: P) {
        let src = bytemuck::bytes_of(&value);
        self.bytes.as_mut()[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Zeroes every byte of the record.
    #[inline]
    pub fn clear(&mut self) {
        self.bytes.as_mut().fill(0);
    }

    #[inline]
    pub fn set_material(&mut self, vertex: usize, tag: MaterialTag) {
        self.bytes.as_mut()[Self::vertex_base(vertex) + MATERIAL_OFFSET] = tag.0;
    }

    #[inline]
    pub fn set_position(&mut self, vertex: usize, position: [f32; 3]) {
        self.write(Self::vertex_base(vertex) + POSITION_OFFSET, position);
    }

    #[inline]
    pub fn set_tex_coord(&mut self, vertex: usize, tex_coord: [f32; 2]) {
        self.write(Self::vertex_base(vertex) + TEX_COORD_OFFSET, tex_coord);
    }

    #[inline]
    pub fn set_texture(&mut self, vertex: usize, texture: TextureId) {
        self.write(Self::vertex_base(vertex) + TEXTURE_OFFSET, texture.0);
    }

    #[inline]
    pub fn set_alpha(&mut self, vertex: usize, alpha: f32) {
        self.write(Self::vertex_base(vertex) + ALPHA_OFFSET, alpha);
    }

    #[inline]
    pub fn set_age(&mut self, vertex: usize, age: u32) {
        self.write(Self::vertex_base(vertex) + AGE_OFFSET, age);
    }

    pub fn set_vertex(&mut self, vertex: usize, v: &Vertex) {
        self.set_position(vertex, v.position);
        self.set_tex_coord(vertex, v.tex_coord);
        self.set_texture(vertex, v.texture);
        self.set_alpha(vertex, v.alpha);
        self.set_age(vertex, v.age);
    }

    #[inline]
    pub fn set_clip_depth(&mut self, z: f32) {
        self.write(CLIP_DEPTH_OFFSET, z);
    }

    #[inline]
    pub fn set_id(&mut self, id: u32) {
        self.write(ID_OFFSET, id);
    }

    #[inline]
    pub fn set_z_fighting(&mut self, n: i32) {
        self.write(Z_FIGHTING_OFFSET, n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> [u8; RECORD_SIZE] {
        [0u8; RECORD_SIZE]
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn interleaved_words_sit_in_vertex_tails() {
        assert_eq!(CLIP_DEPTH_OFFSET, 60);
        assert_eq!(ID_OFFSET, 124);
        assert_eq!(Z_FIGHTING_OFFSET, 188);
        assert_eq!(Z_FIGHTING_OFFSET + 4, RECORD_SIZE);
    }

    #[test]
    fn vertex_attributes_fit_before_interleaved_word() {
        assert!(AGE_OFFSET + 4 <= INTERLEAVED_OFFSET);
        assert!(ALPHA_OFFSET + 4 <= AGE_OFFSET);
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[test]
    fn vertex_fields_land_in_their_own_slot() {
        let mut bytes = blank();
        let mut rec = Record::new(&mut bytes[..]);
        rec.set_position(1, [1.0, 2.0, 3.0]);
        rec.set_texture(2, TextureId(9));

        assert_eq!(rec.position(1), [1.0, 2.0, 3.0]);
        assert_eq!(rec.position(0), [0.0; 3]);
        assert_eq!(rec.texture(2), TextureId(9));
        assert_eq!(rec.texture(1), TextureId(0));

        let raw = &bytes[VERTEX_STRIDE + POSITION_OFFSET..VERTEX_STRIDE + POSITION_OFFSET + 4];
        assert_eq!(raw, &1.0f32.to_ne_bytes());
    }

    #[test]
    fn bookkeeping_does_not_touch_vertex_data() {
        let mut bytes = blank();
        let mut rec = Record::new(&mut bytes[..]);
        let v = Vertex::new([4.0, 5.0, 6.0], [0.5, 0.25], TextureId(3), 0.75, 1200);
        for i in 0..VERTICES_PER_RECORD {
            rec.set_vertex(i, &v);
        }
        rec.set_clip_depth(-2.5);
        rec.set_id(77);
        rec.set_z_fighting(-4);

        for i in 0..VERTICES_PER_RECORD {
            assert_eq!(rec.vertex(i), v);
        }
        assert_eq!(rec.clip_depth(), -2.5);
        assert_eq!(rec.id(), 77);
        assert_eq!(rec.z_fighting(), -4);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut bytes = [0xffu8; RECORD_SIZE];
        let mut rec = Record::new(&mut bytes[..]);
        rec.clear();
        assert_eq!(rec.id(), 0);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn read_only_view_reads_written_bytes() {
        let mut bytes = blank();
        Record::new(&mut bytes[..]).set_material(0, MaterialTag(5));
        let rec = Record::new(&bytes[..]);
        assert_eq!(rec.material(0), MaterialTag(5));
        assert_eq!(rec.material(1), MaterialTag(0));
    }
}
