//! Timeline domain entry point.
//!
//! Time units, the pan/zoom controller and per-edge geometry for the
//! activity timeline.

pub mod edge_geometry;
pub mod time_domain;
pub mod zoom_controller;

pub use edge_geometry::{EdgeGeometry, TimelineFrame, layout_timeline};
pub use time_domain::{DurationNs, TimeNs, TimeRange};
pub use zoom_controller::{TimelineController, TimelineView, ZoomGesture, ZoomTransform};
