//! Tilegl engine crate.
//!
//! Drives a [`tilegl_batch::BatchBuffer`] from a pannable, zoomable map:
//! the view and its zoom transitions, the frame scheduler, the layers that
//! place tiles, image overlays and sprites into the batch, and the wgpu
//! renderer that draws it.
//!
//! The host widget owns the window, input and event loop. It forwards view
//! changes to [`GlMap`], calls [`GlMap::prepare_frame`] from its
//! animation-frame callback and hands the result to
//! [`render::BatchRenderer`].

pub mod coords;
pub mod layer;
pub mod logging;
pub mod map;
pub mod render;
pub mod time;
pub mod view;

pub use map::{GlMap, MapConfig, PreparedFrame};
pub use tilegl_batch as batch;
