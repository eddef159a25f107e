use std::time::{Duration, Instant};

use super::{MapView, UnitBezier};
use crate::coords::Point;

/// Zoom transition timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomAnimationConfig {
    /// Should match the host widget's own zoom transition.
    pub duration: Duration,
    pub easing: UnitBezier,
}

impl Default for ZoomAnimationConfig {
    fn default() -> Self {
        Self { duration: Duration::from_millis(250), easing: UnitBezier::ease_out() }
    }
}

/// An in-flight zoom from one view to another.
///
/// During a zoom exactly one world point stays at the same screen position.
/// Given start center/half size `c1, s1` and end `c2, s2`, that point solves
/// `(x - c1) / s1 = (x - c2) / s2` per axis, i.e.
/// `x = (c2·s1 - c1·s2) / (s1 - s2)`. Each frame interpolates the zoom scale
/// and rebuilds the center around that fixed point.
#[derive(Debug, Clone)]
pub struct ZoomAnimation {
    started: Instant,
    duration: Duration,
    easing: UnitBezier,
    start: MapView,
    target: MapView,
    /// World point pinned on screen.
    fixed: Point,
    /// Position of `fixed` relative to the view, in half sizes.
    relative: Point,
    scale: f64,
}

impl ZoomAnimation {
    /// Starts zooming from `from` towards `to_center`, magnifying by `scale`
    /// (2.0 = one zoom level in).
    pub fn start(
        now: Instant,
        config: &ZoomAnimationConfig,
        from: MapView,
        to_center: Point,
        scale: f64,
    ) -> Self {
        let (c1, s1) = (from.center, from.half_size);
        let s2 = s1 / scale;

        let fixed = Point::new(
            fixed_axis(c1.x, s1.x, to_center.x, s2.x),
            fixed_axis(c1.y, s1.y, to_center.y, s2.y),
        );

        Self {
            started: now,
            duration: config.duration,
            easing: config.easing,
            start: from,
            target: MapView::new(to_center, s2),
            fixed,
            relative: (fixed - c1).unscale_by(s1),
            scale,
        }
    }

    #[inline]
    pub fn target(&self) -> MapView {
        self.target
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    #[inline]
    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    /// Time left until the transition settles.
    pub fn remaining(&self, now: Instant) -> Duration {
        (self.started + self.duration).saturating_duration_since(now)
    }

    /// View to draw at `now`.
    pub fn view_at(&self, now: Instant) -> MapView {
        let t = self.progress(now);
        if t >= 1.0 {
            return self.target;
        }
        let eased = self.easing.solve(t);
        let scale = 1.0 + eased * (self.scale - 1.0);
        let half_size = self.start.half_size / scale;
        MapView::new(self.fixed - half_size.scale_by(self.relative), half_size)
    }
}

/// Pinned coordinate on one axis. Without a size change there is no pinned
/// point; the start center is used so the view simply stays put.
fn fixed_axis(c1: f64, s1: f64, c2: f64, s2: f64) -> f64 {
    let ds = s1 - s2;
    if ds.abs() <= f64::EPSILON * s1.abs().max(1.0) {
        c1
    } else {
        (c2 * s1 - c1 * s2) / ds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    fn anim(t0: Instant) -> ZoomAnimation {
        let from = MapView::new(Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        ZoomAnimation::start(t0, &ZoomAnimationConfig::default(), from, Point::new(40.0, -10.0), 2.0)
    }

    #[test]
    fn starts_at_start_view() {
        let t0 = Instant::now();
        let a = anim(t0);
        let v = a.view_at(t0);
        assert!(close(v.center, Point::zero()));
        assert!(close(v.half_size, Point::new(100.0, 50.0)));
    }

    #[test]
    fn ends_at_target_view() {
        let t0 = Instant::now();
        let a = anim(t0);
        let end = t0 + Duration::from_millis(250);
        assert!(a.is_finished(end));
        assert_eq!(a.view_at(end), a.target());
        assert!(close(a.target().half_size, Point::new(50.0, 25.0)));

        // The closed form lands on the same view just before settling.
        let almost = a.view_at(t0 + Duration::from_micros(249_999));
        assert!((almost.center.x - 40.0).abs() < 0.1);
    }

    #[test]
    fn fixed_point_keeps_its_clip_position() {
        let t0 = Instant::now();
        let a = anim(t0);
        let first = a.view_at(t0).to_clip(a.fixed);
        for ms in [50, 120, 200] {
            let clip = a.view_at(t0 + Duration::from_millis(ms)).to_clip(a.fixed);
            assert!(close(clip, first), "{ms} ms: {clip:?} vs {first:?}");
        }
    }

    #[test]
    fn half_size_shrinks_monotonically() {
        let t0 = Instant::now();
        let a = anim(t0);
        let sizes: Vec<f64> =
            (0..=10).map(|i| a.view_at(t0 + Duration::from_millis(i * 25)).half_size.x).collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn pure_pan_keeps_start_center_until_settled() {
        let t0 = Instant::now();
        let from = MapView::new(Point::new(5.0, 5.0), Point::new(10.0, 10.0));
        let a = ZoomAnimation::start(
            t0,
            &ZoomAnimationConfig::default(),
            from,
            Point::new(50.0, 50.0),
            1.0,
        );
        assert_eq!(a.view_at(t0 + Duration::from_millis(100)), from);
        assert_eq!(a.view_at(t0 + Duration::from_secs(1)).center, Point::new(50.0, 50.0));
    }
}
