//! Zoom control for the activity timeline
//!
//! Pan and zoom accumulate in a [`ZoomTransform`] that is applied on top of the
//! base time scale, the same way a d3 zoom behaviour rescales an axis. The
//! transform survives re-renders and window resizes and snaps back to
//! identity only when a new PAG payload replaces the edges.

use crate::config::TimelineConfig;
use crate::dataflow::{Actor, Relay, relay};
use crate::stores::ActivityTimeline;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Linear map from a time domain (milliseconds) to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (pixel - r0) / (r1 - r0) * (d1 - d0)
    }
}

/// Accumulated pan (`x`, pixels) and zoom (`k`) of the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        ZoomTransform::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform { k: 1.0, x: 0.0 };

    pub fn apply_x(&self, pixel: f64) -> f64 {
        pixel * self.k + self.x
    }

    pub fn invert_x(&self, pixel: f64) -> f64 {
        (pixel - self.x) / self.k
    }

    /// Scale whose domain is the part of `scale`'s domain now visible.
    pub fn rescale(&self, scale: &LinearScale) -> LinearScale {
        let (r0, r1) = scale.range;
        LinearScale {
            domain: (
                scale.invert(self.invert_x(r0)),
                scale.invert(self.invert_x(r1)),
            ),
            range: scale.range,
        }
    }
}

/// Pan/zoom state of the timeline plus the PAG generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineView {
    pub transform: ZoomTransform,
    pub viewport_width: f64,
    pub generation: u64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl TimelineView {
    pub fn new(config: &TimelineConfig) -> Self {
        TimelineView {
            transform: ZoomTransform::IDENTITY,
            viewport_width: config.viewport_width,
            generation: 0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Zoom by `factor`, keeping the point under `anchor_px` in place.
    pub fn zoom_at(&mut self, factor: f64, anchor_px: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let k = (self.transform.k * factor).max(self.min_zoom).min(self.max_zoom);
        let anchored = self.transform.invert_x(anchor_px);
        self.transform = ZoomTransform {
            k,
            x: anchor_px - anchored * k,
        };
    }

    pub fn pan_by(&mut self, dx: f64) {
        if dx.is_finite() {
            self.transform.x += dx;
        }
    }

    /// Only the scale range follows the new width; the transform is kept.
    pub fn resize(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.viewport_width = width;
        }
    }

    /// Returns true when a new edge set arrived and the transform was reset.
    pub fn observe_generation(&mut self, generation: u64) -> bool {
        if generation == self.generation {
            return false;
        }
        self.generation = generation;
        self.transform = ZoomTransform::IDENTITY;
        true
    }

    /// Transform to draw `generation` with. A view that has not caught up
    /// with the latest edges yet draws them unzoomed.
    pub fn transform_for(&self, generation: u64) -> ZoomTransform {
        if generation == self.generation {
            self.transform
        } else {
            ZoomTransform::IDENTITY
        }
    }

    pub fn base_scale(&self, domain_ms: (f64, f64), config: &TimelineConfig) -> LinearScale {
        LinearScale::new(
            domain_ms,
            (config.margin_left, self.viewport_width - config.margin_right),
        )
    }
}

/// Wheel or pinch zoom centred on a pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomGesture {
    pub factor: f64,
    pub anchor_px: f64,
}

/// Zoom controller with Actor+Relay architecture
#[derive(Clone, Debug)]
pub struct TimelineController {
    pub view: Actor<TimelineView>,

    /// User interaction relays
    pub timeline_zoomed_relay: Relay<ZoomGesture>,
    pub timeline_panned_relay: Relay<f64>,
    pub window_resized_relay: Relay<f64>,
}

impl TimelineController {
    pub fn new(config: &TimelineConfig, activity: watch::Receiver<Arc<ActivityTimeline>>) -> Self {
        let (timeline_zoomed_relay, timeline_zoomed_stream) = relay::<ZoomGesture>();
        let (timeline_panned_relay, timeline_panned_stream) = relay::<f64>();
        let (window_resized_relay, window_resized_stream) = relay::<f64>();

        let view = Actor::new(TimelineView::new(config), async move |state| {
            let mut timeline_zoomed = timeline_zoomed_stream;
            let mut timeline_panned = timeline_panned_stream;
            let mut window_resized = window_resized_stream;
            let mut activity = activity;

            let generation = activity.borrow_and_update().generation;
            state.update_mut(|view| {
                view.observe_generation(generation);
            });

            loop {
                tokio::select! {
                    Ok(()) = activity.changed() => {
                        let generation = activity.borrow_and_update().generation;
                        if state.snapshot().generation != generation {
                            state.update_mut(|view| {
                                view.observe_generation(generation);
                            });
                            log::debug!("Timeline transform reset for edge set {}", generation);
                        }
                    }
                    Some(gesture) = timeline_zoomed.next() => {
                        state.update_mut(|view| view.zoom_at(gesture.factor, gesture.anchor_px));
                    }
                    Some(dx) = timeline_panned.next() => {
                        state.update_mut(|view| view.pan_by(dx));
                    }
                    Some(width) = window_resized.next() => {
                        state.update_mut(|view| view.resize(width));
                    }
                    else => break,
                }
            }
        });

        Self {
            view,
            timeline_zoomed_relay,
            timeline_panned_relay,
            window_resized_relay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    fn view() -> TimelineView {
        TimelineView::new(&TimelineConfig::default())
    }

    #[test]
    fn degenerate_domain_maps_to_range_center() {
        let scale = LinearScale::new((4.0, 4.0), (10.0, 30.0));
        assert_eq!(scale.map(4.0), 20.0);
    }

    #[test]
    fn identity_rescale_keeps_domain() {
        let scale = LinearScale::new((0.0, 30.0), (10.0, 1170.0));
        let rescaled = ZoomTransform::IDENTITY.rescale(&scale);
        assert!((rescaled.domain.0 - 0.0).abs() < EPSILON);
        assert!((rescaled.domain.1 - 30.0).abs() < EPSILON);
    }

    #[test]
    fn zoom_keeps_anchor_fixed_and_clamps() {
        let mut view = view();
        let config = TimelineConfig::default();
        let base = view.base_scale((0.0, 100.0), &config);
        let anchor = 400.0;
        let time_under_anchor = view.transform.rescale(&base).invert(anchor);

        view.zoom_at(4.0, anchor);
        let zoomed = view.transform.rescale(&base);
        assert_eq!(view.transform.k, 4.0);
        assert!((zoomed.invert(anchor) - time_under_anchor).abs() < 1e-6);

        view.zoom_at(1_000.0, anchor);
        assert_eq!(view.transform.k, 512.0);

        view.zoom_at(1e-9, anchor);
        assert_eq!(view.transform.k, 1.0);
    }

    #[test]
    fn inverted_zoom_bounds_do_not_panic() {
        let config = TimelineConfig { min_zoom: 8.0, max_zoom: 2.0, ..TimelineConfig::default() };
        let mut view = TimelineView::new(&config);

        view.zoom_at(2.0, 100.0);
        assert_eq!(view.transform.k, 2.0);
    }

    #[test]
    fn resize_preserves_transform_and_new_edges_reset_it() {
        let mut view = view();
        view.zoom_at(2.0, 300.0);
        view.pan_by(-45.0);
        let before = view.transform;

        view.resize(800.0);
        assert_eq!(view.transform, before);
        assert_eq!(view.viewport_width, 800.0);

        assert!(!view.observe_generation(0));
        assert!(view.observe_generation(1));
        assert_eq!(view.transform, ZoomTransform::IDENTITY);
    }

    #[test]
    fn stale_view_draws_new_edges_unzoomed() {
        let mut view = view();
        view.zoom_at(8.0, 100.0);
        assert_eq!(view.transform_for(0).k, 8.0);
        assert_eq!(view.transform_for(1), ZoomTransform::IDENTITY);
    }

    #[tokio::test]
    async fn controller_resets_on_new_generation() {
        let (activity_sender, activity_receiver) = watch::channel(Arc::new(ActivityTimeline::default()));
        let controller = TimelineController::new(&TimelineConfig::default(), activity_receiver);
        let mut signal = controller.view.signal();

        controller.timeline_zoomed_relay.send(ZoomGesture { factor: 3.0, anchor_px: 50.0 });
        tokio::time::timeout(Duration::from_secs(1), signal.wait_for(|view| view.transform.k == 3.0))
            .await
            .unwrap()
            .unwrap();

        activity_sender.send_modify(|timeline| Arc::make_mut(timeline).replace(Vec::new()));
        tokio::time::timeout(
            Duration::from_secs(1),
            signal.wait_for(|view| view.generation == 1 && view.transform == ZoomTransform::IDENTITY),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
