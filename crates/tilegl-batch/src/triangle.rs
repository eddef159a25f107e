use crate::record::{MaterialTag, Record, TextureId, Vertex, VERTICES_PER_RECORD};
use crate::{BatchError, IdCounter, PrimitiveId};

/// Handle over one triangle record.
///
/// The handle borrows the record's bytes and owns nothing. Handles returned by
/// the batch buffer borrow the buffer itself, so they cannot outlive a sort
/// pass or a growth step; hold on to the [`PrimitiveId`] instead and look the
/// triangle up again.
#[derive(Debug)]
pub struct Triangle<T> {
    record: Record<T>,
}

/// Read-only triangle handle.
pub type TriangleRef<'a> = Triangle<&'a [u8]>;
/// Mutable triangle handle.
pub type TriangleMut<'a> = Triangle<&'a mut [u8]>;

#[inline]
pub(crate) fn check_vertex_index(index: usize, len: usize) -> Result<(), BatchError> {
    if index < len {
        Ok(())
    } else {
        Err(BatchError::VertexIndexOutOfRange { index, len })
    }
}

impl<T: AsRef<[u8]>> Triangle<T> {
    /// Wraps an existing record without touching it.
    #[inline]
    pub(crate) fn bind(bytes: T) -> Self {
        Self { record: Record::new(bytes) }
    }

    /// Identifier, or `None` once purged.
    #[inline]
    pub fn id(&self) -> Option<PrimitiveId> {
        PrimitiveId::new(self.record.id())
    }

    /// Stored identifier; 0 once purged.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        self.record.id()
    }

    #[inline]
    pub fn is_purged(&self) -> bool {
        self.record.id() == 0
    }

    #[inline]
    pub fn material(&self) -> MaterialTag {
        self.record.material(0)
    }

    /// Texture of the first vertex; this is the one used for ordering and batching.
    #[inline]
    pub fn texture(&self) -> TextureId {
        self.record.texture(0)
    }

    #[inline]
    pub fn clip_depth(&self) -> f32 {
        self.record.clip_depth()
    }

    #[inline]
    pub fn z_fighting(&self) -> i32 {
        self.record.z_fighting()
    }

    pub fn vertex(&self, index: usize) -> Result<Vertex, BatchError> {
        check_vertex_index(index, VERTICES_PER_RECORD)?;
        Ok(self.record.vertex(index))
    }

    #[inline]
    pub fn record(&self) -> &Record<T> {
        &self.record
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Triangle<T> {
    /// Binds `slot`, clears it, stamps the material tag on every vertex and
    /// assigns the next identifier from `ids`.
    pub fn create(slot: T, material: MaterialTag, ids: &mut IdCounter) -> Result<Self, BatchError> {
        let id = ids.next_id()?;
        let mut record = Record::new(slot);
        record.clear();
        for v in 0..VERTICES_PER_RECORD {
            record.set_material(v, material);
        }
        record.set_id(id.get());
        Ok(Self { record })
    }

    /// Writes the attributes of vertex `index` (0..3).
    pub fn fill_vertex(&mut self, index: usize, vertex: &Vertex) -> Result<(), BatchError> {
        check_vertex_index(index, VERTICES_PER_RECORD)?;
        self.record.set_vertex(index, vertex);
        Ok(())
    }

    /// Caches the depth used by the sort pass. Not read by the GPU.
    #[inline]
    pub fn set_clip_depth(&mut self, z: f32) {
        self.record.set_clip_depth(z);
    }

    #[inline]
    pub fn set_z_fighting(&mut self, n: i32) {
        self.record.set_z_fighting(n);
    }

    pub fn set_alpha_all(&mut self, alpha: f32) {
        for v in 0..VERTICES_PER_RECORD {
            self.record.set_alpha(v, alpha);
        }
    }

    /// Marks the triangle deleted. Storage is reclaimed by the next sort pass.
    #[inline]
    pub fn purge(&mut self) {
        self.record.set_id(0);
    }
}
