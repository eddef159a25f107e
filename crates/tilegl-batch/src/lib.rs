//! Geometry batching for textured triangles.
//!
//! A [`BatchBuffer`] stores many triangles as fixed 192-byte records in one
//! contiguous region that can be uploaded to the GPU unchanged. Layers
//! allocate triangles (or [`Quad`]s), fill them through short-lived handles,
//! and keep only their [`PrimitiveId`]. Once per frame the owner calls
//! [`BatchBuffer::sort`], which orders records back-to-front, clusters equal
//! textures and reclaims purged records, then [`BatchBuffer::render`], which
//! reports one [`DrawRun`] per texture change.

mod buffer;
mod error;
mod id;
mod order;
mod quad;
pub mod record;
mod triangle;

pub use buffer::{BatchBuffer, BatchConfig, DrawRun, SortStats, DEFAULT_GROW_INCREMENT, MAX_RECORDS};
pub use error::BatchError;
pub use id::{IdCounter, PrimitiveId};
pub use order::SortKey;
pub use quad::{Quad, QuadId};
pub use record::{MaterialTag, TextureId, Vertex, RECORD_SIZE};
pub use triangle::{Triangle, TriangleMut, TriangleRef};
