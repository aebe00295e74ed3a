//! Pixel geometry for activity edges.
//!
//! Nothing here is stored: every frame is derived from the current edges,
//! the pan/zoom view, the highlight set and the display toggles.

use super::time_domain::{TimeNs, TimeRange};
use super::zoom_controller::{LinearScale, TimelineView};
use crate::config::TimelineConfig;
use crate::highlight::HighlightSet;
use crate::stores::ActivityTimeline;
use crate::view_settings::ViewSettings;
use shared::ActivityEdge;

const SAME_WORKER_STROKE: f64 = 2.0;
const CROSS_WORKER_STROKE: f64 = 1.5;
const LABEL_OFFSET_X: f64 = 30.0;
const LABEL_OFFSET_Y: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashPattern {
    Solid,
    Dashed { dash: f64, gap: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: &'static str,
    pub stroke_width: f64,
    pub dash: DashPattern,
    pub opacity: f64,
    pub label: String,
    pub label_x: f64,
    pub label_y: f64,
}

/// Inputs shared by every edge of one frame.
pub struct EdgeStyle<'a> {
    pub highlights: &'a HighlightSet,
    pub highlight_enabled: bool,
    pub dimmed_opacity: f64,
    pub row_height: f64,
}

impl EdgeGeometry {
    pub fn layout(edge: &ActivityEdge, scale: &LinearScale, style: &EdgeStyle<'_>) -> Self {
        let src = TimeNs::from_nanos(edge.src.timestamp_ns);
        let dst = TimeNs::from_nanos(edge.dst.timestamp_ns);
        let y1 = worker_row(edge.src.worker, style.row_height);
        let y2 = worker_row(edge.dst.worker, style.row_height);
        let cross_worker = edge.is_cross_worker();

        EdgeGeometry {
            x1: scale.map(src.display_millis()),
            y1,
            x2: scale.map(dst.display_millis()),
            y2,
            color: edge.kind.color(),
            stroke_width: if cross_worker {
                CROSS_WORKER_STROKE
            } else {
                SAME_WORKER_STROKE
            },
            dash: if cross_worker {
                DashPattern::Dashed { dash: 5.0, gap: 5.0 }
            } else {
                DashPattern::Solid
            },
            opacity: edge_opacity(edge, style.highlights, style.highlight_enabled, style.dimmed_opacity),
            label: edge_label(edge),
            label_x: scale.map(src.midpoint_millis(dst)) - LABEL_OFFSET_X,
            label_y: (y1 + y2) / 2.0 - LABEL_OFFSET_Y,
        }
    }
}

fn worker_row(worker: u64, row_height: f64) -> f64 {
    row_height * (1.0 + worker as f64)
}

/// Full opacity unless highlighting is on, the set is non-empty and the
/// edge's correlation key is missing from it.
pub fn edge_opacity(
    edge: &ActivityEdge,
    highlights: &HighlightSet,
    highlight_enabled: bool,
    dimmed_opacity: f64,
) -> f64 {
    if !highlight_enabled || highlights.is_empty() || highlights.has(&edge.correlation_key()) {
        1.0
    } else {
        dimmed_opacity
    }
}

pub fn edge_label(edge: &ActivityEdge) -> String {
    let operator = if edge.operator_id == 0 {
        String::new()
    } else {
        format!("Op{} ", edge.operator_id)
    };
    let length = if edge.length > 0 {
        format!("({})", edge.length)
    } else {
        String::new()
    };
    format!("{} {}{}", edge.kind, operator, length)
}

pub fn tooltip_text(edge: &ActivityEdge) -> String {
    format!(
        "w{}, {} -> w{}, {}\ntype: {}\noperator: {}\nlength: {}\ntraversal: {:?}",
        edge.src.worker,
        TimeNs::from_nanos(edge.src.timestamp_ns).display_millis(),
        edge.dst.worker,
        TimeNs::from_nanos(edge.dst.timestamp_ns).display_millis(),
        edge.kind,
        edge.operator_id,
        edge.length,
        edge.traversal,
    )
}

/// Everything a renderer needs to draw the timeline once.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineFrame {
    pub generation: u64,
    pub domain: TimeRange,
    /// Axis extent after pan/zoom, in milliseconds.
    pub visible_domain_ms: (f64, f64),
    pub axis_y: f64,
    pub edges: Vec<EdgeGeometry>,
}

/// Lay out the current edge set, or `None` while there is nothing to draw.
pub fn layout_timeline(
    timeline: &ActivityTimeline,
    view: &TimelineView,
    highlights: &HighlightSet,
    settings: &ViewSettings,
    config: &TimelineConfig,
) -> Option<TimelineFrame> {
    let domain = timeline.domain()?;
    let base = view.base_scale(domain.display_millis(), config);
    let scale = view.transform_for(timeline.generation).rescale(&base);
    let style = EdgeStyle {
        highlights,
        highlight_enabled: settings.highlight,
        dimmed_opacity: config.dimmed_opacity,
        row_height: config.row_height,
    };

    Some(TimelineFrame {
        generation: timeline.generation,
        domain,
        visible_domain_ms: scale.domain,
        axis_y: config.margin_top,
        edges: timeline
            .edges
            .iter()
            .map(|edge| EdgeGeometry::layout(edge, &scale, &style))
            .collect(),
    })
}
