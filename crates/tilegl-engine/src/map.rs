use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tilegl_batch::{BatchBuffer, BatchConfig, SortStats};

use crate::coords::{Point, Viewport};
use crate::time::{FrameScheduler, FrameStats, FrameTime, SchedulerConfig};
use crate::view::{MapView, ZoomAnimation, ZoomAnimationConfig};

/// Map configuration.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub batch: BatchConfig,
    pub scheduler: SchedulerConfig,
    pub zoom: ZoomAnimationConfig,
    /// How long new primitives take to fade in. Zero disables fading.
    pub fade_in: Duration,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            scheduler: SchedulerConfig::default(),
            zoom: ZoomAnimationConfig::default(),
            fade_in: Duration::from_millis(200),
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug)]
pub struct PreparedFrame<'a> {
    pub view: MapView,
    pub time: FrameTime,
    /// Milliseconds since the map epoch, comparable with primitive ages.
    pub now_ms: u32,
    pub fade_ms: f32,
    /// The scheduler wants another frame after this one.
    pub continuing: bool,
    /// Set when this frame re-sorted the batch.
    pub sort: Option<SortStats>,
    pub batch: &'a BatchBuffer,
}

/// Composition root: one batch buffer, the view and the frame scheduler.
///
/// The host widget calls the `on_*` hooks from its own pan/zoom/resize
/// events and drives frames with [`prepare_frame`](Self::prepare_frame) and
/// [`finish_frame`](Self::finish_frame) from its animation-frame callback.
/// Layers mutate the batch through `&mut GlMap` between frames.
#[derive(Debug)]
pub struct GlMap {
    epoch: Instant,
    batch: BatchBuffer,
    scheduler: FrameScheduler,
    zoom_config: ZoomAnimationConfig,
    fade_in: Duration,

    viewport: Viewport,
    view: MapView,
    zoom: f64,
    zoom_anim: Option<ZoomAnimation>,
}

impl GlMap {
    /// Creates a map whose primitive ages count from `epoch`.
    pub fn new(config: MapConfig, epoch: Instant) -> Result<Self> {
        let batch = BatchBuffer::new(config.batch).context("failed to create batch buffer")?;
        log::debug!("map created ({} bytes of primitive storage)", batch.capacity_bytes());

        Ok(Self {
            epoch,
            batch,
            scheduler: FrameScheduler::new(&config.scheduler),
            zoom_config: config.zoom,
            fade_in: config.fade_in,
            viewport: Viewport::new(1.0, 1.0),
            view: MapView::default(),
            zoom: 0.0,
            zoom_anim: None,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// Milliseconds since the epoch, saturating at `u32::MAX` (about 49 days).
    pub fn time_ms(&self, now: Instant) -> u32 {
        let ms = now.saturating_duration_since(self.epoch).as_millis();
        u32::try_from(ms).unwrap_or(u32::MAX)
    }

    #[inline]
    pub fn view(&self) -> MapView {
        self.view
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// World units per screen pixel for the current view.
    #[inline]
    pub fn units_per_pixel(&self) -> Point {
        self.view.units_per_pixel(self.viewport)
    }

    /// Current zoom level, as reported by the host.
    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
        self.scheduler.render_once();
    }

    #[inline]
    pub fn fade_in(&self) -> Duration {
        self.fade_in
    }

    #[inline]
    pub fn is_zooming(&self) -> bool {
        self.zoom_anim.is_some()
    }

    #[inline]
    pub fn batch(&self) -> &BatchBuffer {
        &self.batch
    }

    #[inline]
    pub fn batch_mut(&mut self) -> &mut BatchBuffer {
        &mut self.batch
    }

    #[inline]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }

    // ── render requests ───────────────────────────────────────────────────

    /// Asks for a single frame.
    #[inline]
    pub fn render_once(&mut self) {
        self.scheduler.render_once();
    }

    /// Keeps rendering while freshly added primitives fade in.
    pub fn render_fade(&mut self, now: Instant) {
        if self.fade_in.is_zero() {
            self.scheduler.render_once();
        } else {
            self.scheduler.render_until(now, self.fade_in);
        }
    }

    // ── host hooks ────────────────────────────────────────────────────────

    /// The host view moved (pan, fly-to frame, end of a move).
    pub fn on_move(&mut self, view: MapView) {
        if !view.is_valid() {
            log::warn!("ignoring degenerate view {view:?}");
            return;
        }
        self.view = view;
        self.scheduler.render_once();
    }

    /// The drawing surface changed size.
    pub fn on_resize(&mut self, viewport: Viewport, view: MapView) {
        if !viewport.is_valid() {
            log::warn!("ignoring invalid viewport {viewport:?}");
            return;
        }
        self.viewport = viewport;
        self.on_move(view);
    }

    /// An animated zoom towards `to_center` by `scale` begins.
    pub fn on_zoom_start(&mut self, now: Instant, to_center: Point, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            log::warn!("ignoring zoom animation with scale {scale}");
            return;
        }
        let anim = ZoomAnimation::start(now, &self.zoom_config, self.view, to_center, scale);
        self.scheduler.render_until(now, self.zoom_config.duration);
        self.zoom_anim = Some(anim);
    }

    /// The animated zoom is over; the view snaps to its target.
    pub fn on_zoom_end(&mut self) {
        if let Some(anim) = self.zoom_anim.take() {
            self.view = anim.target();
            self.scheduler.render_once();
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Runs the CPU side of one animation frame.
    ///
    /// Returns `None` if no frame was requested. Otherwise advances any zoom
    /// animation, sorts the batch if it changed since the last sort, and
    /// hands out the data to render exactly once.
    pub fn prepare_frame(&mut self, now: Instant) -> Option<PreparedFrame<'_>> {
        let tick = self.scheduler.tick(now)?;

        if let Some(anim) = &self.zoom_anim {
            self.view = anim.view_at(now);
        }

        let sort = self.batch.needs_sort().then(|| self.batch.sort());

        Some(PreparedFrame {
            view: self.view,
            time: tick.time,
            now_ms: self.time_ms(now),
            fade_ms: self.fade_in.as_secs_f32() * 1000.0,
            continuing: tick.continuing,
            sort,
            batch: &self.batch,
        })
    }

    /// Records that the prepared frame was submitted.
    #[inline]
    pub fn finish_frame(&mut self, now: Instant) {
        self.scheduler.finish_frame(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegl_batch::MaterialTag;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn map(t0: Instant) -> GlMap {
        let mut map = GlMap::new(MapConfig::default(), t0).unwrap();
        map.on_resize(
            Viewport::new(200.0, 100.0),
            MapView::new(Point::zero(), Point::new(100.0, 50.0)),
        );
        map
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn rejects_invalid_batch_config() {
        let config = MapConfig {
            batch: BatchConfig { initial_capacity: 0, grow_increment: 10 },
            ..MapConfig::default()
        };
        let err = GlMap::new(config, Instant::now()).unwrap_err();
        assert!(format!("{err:#}").contains("batch buffer"));
    }

    #[test]
    fn time_counts_from_epoch() {
        let t0 = Instant::now();
        let m = map(t0);
        assert_eq!(m.time_ms(t0), 0);
        assert_eq!(m.time_ms(t0 + ms(1500)), 1500);
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn no_frame_without_request() {
        let t0 = Instant::now();
        let mut m = map(t0);
        assert!(m.prepare_frame(t0).is_some()); // from on_resize
        assert!(m.prepare_frame(t0 + ms(16)).is_none());
    }

    #[test]
    fn sorts_only_when_batch_changed() {
        let t0 = Instant::now();
        let mut m = map(t0);
        m.batch_mut().allocate_triangle(MaterialTag(0)).unwrap();

        let frame = m.prepare_frame(t0).unwrap();
        assert_eq!(frame.sort.map(|s| s.live), Some(1));
        assert_eq!(frame.batch.len(), 1);

        m.render_once();
        assert!(m.prepare_frame(t0 + ms(16)).unwrap().sort.is_none());
    }

    #[test]
    fn fade_keeps_frames_coming() {
        let t0 = Instant::now();
        let mut m = map(t0);
        m.prepare_frame(t0);
        m.render_fade(t0);
        assert!(m.prepare_frame(t0 + ms(100)).unwrap().continuing);
        assert!(!m.prepare_frame(t0 + ms(250)).unwrap().continuing);
    }

    #[test]
    fn frame_reports_fade_and_time() {
        let t0 = Instant::now();
        let mut m = map(t0);
        let frame = m.prepare_frame(t0 + ms(40)).unwrap();
        assert_eq!(frame.now_ms, 40);
        assert!((frame.fade_ms - 200.0).abs() < 1e-3);
    }

    // ── hooks ─────────────────────────────────────────────────────────────

    #[test]
    fn zoom_animation_drives_the_view() {
        let t0 = Instant::now();
        let mut m = map(t0);
        m.prepare_frame(t0);

        m.on_zoom_start(t0, Point::new(20.0, 10.0), 2.0);
        assert!(m.is_zooming());

        let mid = m.prepare_frame(t0 + ms(100)).unwrap().view;
        assert!(mid.half_size.x < 100.0 && mid.half_size.x > 50.0);

        let end = m.prepare_frame(t0 + ms(300)).unwrap().view;
        assert_eq!(end.half_size, Point::new(50.0, 25.0));
        assert_eq!(end.center, Point::new(20.0, 10.0));

        m.on_zoom_end();
        assert!(!m.is_zooming());
        assert_eq!(m.view().center, Point::new(20.0, 10.0));
    }

    #[test]
    fn degenerate_view_is_ignored() {
        let t0 = Instant::now();
        let mut m = map(t0);
        let before = m.view();
        m.on_move(MapView::new(Point::zero(), Point::new(0.0, 1.0)));
        assert_eq!(m.view(), before);
    }

    #[test]
    fn units_per_pixel_follow_viewport() {
        let m = map(Instant::now());
        assert_eq!(m.units_per_pixel(), Point::new(1.0, 1.0));
    }

    #[test]
    fn stats_count_finished_frames() {
        let t0 = Instant::now();
        let mut m = map(t0);
        m.prepare_frame(t0);
        m.finish_frame(t0 + ms(2));
        assert_eq!(m.stats().frames, 1);
    }
}
