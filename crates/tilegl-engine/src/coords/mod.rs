//! Coordinate types shared by the view, the layers and the renderer.
//!
//! World space:
//! - projected CRS units (e.g. web mercator meters)
//! - +X east, +Y north
//!
//! The renderer maps world space to clip space in the vertex shader from the
//! current view's center and half size.

mod bounds;
mod point;
mod viewport;

pub use bounds::Bounds;
pub use point::Point;
pub use viewport::Viewport;
