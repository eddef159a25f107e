use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame, in seconds (clamped).
    pub dt: f32,

    /// Timestamp the frame was ticked at.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots from caller-supplied timestamps.
///
/// Timestamps are passed in rather than read from the system clock so that a
/// host driven by its own animation-frame callback (and tests) control time.
///
/// Delta time is clamped so that a stalled or backgrounded loop does not hand
/// a huge step to fade-in and zoom interpolation.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clock with the default clamps (100 µs .. 250 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self { last: None, frame_index: 0, dt_min, dt_max }
    }

    /// Forgets the previous timestamp; the next tick reports `dt_min`.
    ///
    /// Call when a render loop restarts after being idle.
    pub fn reset(&mut self) {
        self.last = None;
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock to `now`.
    pub fn tick(&mut self, now: Instant) -> FrameTime {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last).clamp(self.dt_min, self.dt_max),
            None => self.dt_min,
        };
        self.last = Some(now);

        let ft = FrameTime { dt: dt.as_secs_f32(), now, frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_uses_minimum_dt() {
        let mut clock = FrameClock::new();
        let ft = clock.tick(Instant::now());
        assert_eq!(ft.frame_index, 0);
        assert!((ft.dt - 0.0001).abs() < 1e-6);
    }

    #[test]
    fn dt_is_clamped_after_stall() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new();
        clock.tick(t0);
        let ft = clock.tick(t0 + Duration::from_secs(3));
        assert!((ft.dt - 0.25).abs() < 1e-6);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn reset_keeps_frame_counter() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new();
        clock.tick(t0);
        clock.reset();
        let ft = clock.tick(t0 + Duration::from_millis(16));
        assert_eq!(ft.frame_index, 1);
        assert!((ft.dt - 0.0001).abs() < 1e-6);
    }
}
