//! What part of the world is on screen, and how it moves between frames.
//!
//! The host widget owns pan/zoom state; it reports the current view through
//! [`MapView`] and zoom transitions through [`ZoomAnimation`], which the map
//! samples once per frame.

mod easing;
mod map_view;
mod zoom;

pub use easing::{cubic_bezier, UnitBezier};
pub use map_view::MapView;
pub use zoom::{ZoomAnimation, ZoomAnimationConfig};
