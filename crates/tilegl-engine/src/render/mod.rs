//! GPU rendering subsystem.
//!
//! The batch renderer consumes a [`PreparedFrame`](crate::map::PreparedFrame)
//! and issues wgpu commands. It owns its GPU resources (pipeline, buffers,
//! textures).
//!
//! Convention:
//! - vertex positions are world units (+Y north)
//! - the vertex shader converts to NDC using the view uniform

mod batch;
mod ctx;
pub mod texture;

pub use batch::{vertex_layout, BatchRenderer, VERTEX_ATTRIBUTES};
pub use ctx::{RenderCtx, RenderTarget};
pub use texture::DecodedImage;
