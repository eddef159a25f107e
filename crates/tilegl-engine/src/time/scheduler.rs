use std::time::{Duration, Instant};

use super::{FrameClock, FrameTime};

/// Render loop timing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Lower clamp for frame delta time.
    pub dt_min: Duration,
    /// Upper clamp for frame delta time.
    pub dt_max: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { dt_min: Duration::from_micros(100), dt_max: Duration::from_millis(250) }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Request {
    Idle,
    Once,
    Until(Instant),
}

/// Permission to run one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTick {
    pub time: FrameTime,
    /// The loop stays active and wants another animation frame after this one.
    pub continuing: bool,
}

/// Rolling frame accounting, updated by [`FrameScheduler::finish_frame`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Time between the tick and `finish_frame` of the last frame.
    pub frame_time: Duration,
    /// Rate derived from the interval between the last two finished frames.
    pub fps: f32,
    pub frames: u64,
}

/// Decides on which animation frames the map renders.
///
/// Two kinds of requests exist:
/// - `render_once`: draw a single frame, e.g. after a pan or a tile load
/// - `render_until`: keep drawing every frame until a deadline, e.g. while a
///   zoom transition or a fade-in runs; overlapping requests extend the
///   deadline, never shorten it
///
/// The host calls [`tick`](Self::tick) from its animation-frame callback and
/// schedules another callback while the returned tick says `continuing`.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    request: Request,
    clock: FrameClock,
    stats: FrameStats,
    frame_started: Option<Instant>,
    last_finished: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            request: Request::Idle,
            clock: FrameClock::with_clamps(config.dt_min, config.dt_max),
            stats: FrameStats::default(),
            frame_started: None,
            last_finished: None,
        }
    }

    /// True while a frame is pending or a loop is running.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.request != Request::Idle
    }

    /// True while a `render_until` deadline is pending.
    #[inline]
    pub fn is_looping(&self) -> bool {
        matches!(self.request, Request::Until(_))
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Keeps rendering every frame for at least `duration` from `now`.
    pub fn render_until(&mut self, now: Instant, duration: Duration) {
        let deadline = now + duration;
        self.request = match self.request {
            Request::Until(end) => Request::Until(end.max(deadline)),
            Request::Once => Request::Until(deadline),
            Request::Idle => {
                log::debug!("render loop started for {duration:?}");
                self.clock.reset();
                Request::Until(deadline)
            }
        };
    }

    /// Requests a single frame unless a loop already covers it.
    pub fn render_once(&mut self) {
        if self.request == Request::Idle {
            self.clock.reset();
            self.request = Request::Once;
        }
    }

    /// Drops any pending request, e.g. when the map is torn down.
    pub fn cancel(&mut self) {
        if self.request != Request::Idle {
            log::debug!("render loop cancelled");
        }
        self.request = Request::Idle;
    }

    /// Consumes the pending request for the animation frame at `now`.
    ///
    /// Returns `None` if nothing needs drawing. A loop whose deadline has
    /// passed still yields one last frame.
    pub fn tick(&mut self, now: Instant) -> Option<FrameTick> {
        let continuing = match self.request {
            Request::Idle => return None,
            Request::Once => {
                self.request = Request::Idle;
                false
            }
            Request::Until(end) if end > now => true,
            Request::Until(_) => {
                log::debug!("render loop ended");
                self.request = Request::Idle;
                false
            }
        };

        self.frame_started = Some(now);
        Some(FrameTick { time: self.clock.tick(now), continuing })
    }

    /// Records that the frame started by the last `tick` was submitted at `now`.
    pub fn finish_frame(&mut self, now: Instant) {
        if let Some(started) = self.frame_started.take() {
            self.stats.frame_time = now.saturating_duration_since(started);
        }
        if let Some(prev) = self.last_finished {
            let interval = now.saturating_duration_since(prev).as_secs_f32();
            if interval > 0.0 {
                self.stats.fps = 1.0 / interval;
            }
        }
        self.last_finished = Some(now);
        self.stats.frames += 1;
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}
