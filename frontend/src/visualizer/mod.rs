// Visualizer Module - Timeline Rendering
//
// Coordinate mapping and geometry for the activity timeline. Drawing itself
// is left to a `Renderer`.

pub mod timeline;
