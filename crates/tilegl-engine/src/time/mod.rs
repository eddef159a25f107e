//! Frame timing and render-loop scheduling.
//!
//! Intended usage:
//! - the host forwards its animation-frame callback to [`FrameScheduler::tick`]
//! - layers and view changes request frames with `render_once`/`render_until`
//! - each returned [`FrameTick`] allows at most one sort and one render pass

mod frame_clock;
mod scheduler;

pub use frame_clock::{FrameClock, FrameTime};
pub use scheduler::{FrameScheduler, FrameStats, FrameTick, SchedulerConfig};
