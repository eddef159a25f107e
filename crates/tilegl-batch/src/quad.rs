use crate::record::{TextureId, Vertex};
use crate::triangle::{check_vertex_index, TriangleMut};
use crate::{BatchError, PrimitiveId};

/// Copyable key of a quad: the identifiers of its two triangles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct QuadId {
    pub first: PrimitiveId,
    pub second: PrimitiveId,
}

/// Two triangles sharing an edge, written as one four-corner strip.
///
/// Corner mapping (strip order):
/// - 0 → first triangle, vertex 0
/// - 1 → first triangle, vertex 1 and second triangle, vertex 0
/// - 2 → first triangle, vertex 2 and second triangle, vertex 1
/// - 3 → second triangle, vertex 2
///
/// Depth and z-fighting are always written to both triangles so the sort pass
/// never separates them by key.
#[derive(Debug)]
pub struct Quad<'a> {
    first: TriangleMut<'a>,
    second: TriangleMut<'a>,
}

impl<'a> Quad<'a> {
    /// Joins two live triangles created with the same material.
    pub fn new(first: TriangleMut<'a>, second: TriangleMut<'a>) -> Result<Self, BatchError> {
        let (Some(a), Some(b)) = (first.id(), second.id()) else {
            return Err(BatchError::PurgedTriangle);
        };
        if a == b {
            return Err(BatchError::SameTriangle);
        }
        if first.material() != second.material() {
            return Err(BatchError::MaterialMismatch {
                first: first.material().0,
                second: second.material().0,
            });
        }
        Ok(Self { first, second })
    }

    /// `None` once purged.
    pub fn id(&self) -> Option<QuadId> {
        Some(QuadId { first: self.first.id()?, second: self.second.id()? })
    }

    pub fn fill_vertex(&mut self, index: usize, vertex: &Vertex) -> Result<(), BatchError> {
        check_vertex_index(index, 4)?;
        match index {
            0 => self.first.fill_vertex(0, vertex),
            3 => self.second.fill_vertex(2, vertex),
            shared => {
                self.first.fill_vertex(shared, vertex)?;
                self.second.fill_vertex(shared - 1, vertex)
            }
        }
    }

    /// Reads corner `index` back (0..4).
    pub fn vertex(&self, index: usize) -> Result<Vertex, BatchError> {
        check_vertex_index(index, 4)?;
        match index {
            3 => self.second.vertex(2),
            i => self.first.vertex(i),
        }
    }

    /// Fills all four corners of an axis-aligned rectangle with the full texture.
    ///
    /// Texture coordinates follow image convention (t grows downwards) while
    /// world y grows upwards, hence the flipped `t`.
    pub fn fill_rect(
        &mut self,
        min: [f32; 2],
        max: [f32; 2],
        z: f32,
        texture: TextureId,
        alpha: f32,
        age: u32,
    ) -> Result<(), BatchError> {
        let corners = [
            ([min[0], min[1]], [0.0, 1.0]),
            ([max[0], min[1]], [1.0, 1.0]),
            ([min[0], max[1]], [0.0, 0.0]),
            ([max[0], max[1]], [1.0, 0.0]),
        ];
        for (i, ([x, y], tex_coord)) in corners.into_iter().enumerate() {
            self.fill_vertex(i, &Vertex::new([x, y, z], tex_coord, texture, alpha, age))?;
        }
        Ok(())
    }

    pub fn set_clip_depth(&mut self, z: f32) {
        self.first.set_clip_depth(z);
        self.second.set_clip_depth(z);
    }

    pub fn clip_depth(&self) -> f32 {
        self.first.clip_depth()
    }

    pub fn set_z_fighting(&mut self, n: i32) {
        self.first.set_z_fighting(n);
        self.second.set_z_fighting(n);
    }

    pub fn z_fighting(&self) -> i32 {
        self.first.z_fighting()
    }

    pub fn set_alpha_all(&mut self, alpha: f32) {
        self.first.set_alpha_all(alpha);
        self.second.set_alpha_all(alpha);
    }

    /// Purges both triangles. The quad must not be reused afterwards.
    pub fn purge(mut self) {
        self.first.purge();
        self.second.purge();
    }

    pub fn triangles(&self) -> (&TriangleMut<'a>, &TriangleMut<'a>) {
        (&self.first, &self.second)
    }
}
