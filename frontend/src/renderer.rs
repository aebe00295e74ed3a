//! Output seam between the session and whatever draws the dashboard.

use crate::invariants::InvariantPanel;
use crate::projection::{ChartRow, Projection};
use crate::visualizer::timeline::TimelineFrame;
use std::collections::HashMap;

/// Receives fully projected data. Every call replaces what was shown before.
pub trait Renderer: Send + 'static {
    fn replace_table(&mut self, projection: Projection, rows: &[ChartRow]);
    fn draw_timeline(&mut self, frame: &TimelineFrame);
    fn show_invariants(&mut self, panel: &InvariantPanel);
}

/// Renders nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn replace_table(&mut self, _projection: Projection, _rows: &[ChartRow]) {}
    fn draw_timeline(&mut self, _frame: &TimelineFrame) {}
    fn show_invariants(&mut self, _panel: &InvariantPanel) {}
}

/// Terminal renderer: summarises each view through `log`, skipping repeats.
#[derive(Debug, Default)]
pub struct LogRenderer {
    tables: HashMap<Projection, Vec<ChartRow>>,
    last_generation: Option<u64>,
    last_panel: Option<InvariantPanel>,
}

impl Renderer for LogRenderer {
    fn replace_table(&mut self, projection: Projection, rows: &[ChartRow]) {
        if self.tables.get(&projection).is_some_and(|previous| previous == rows) {
            return;
        }
        let chart = projection.chart();
        let bars: Vec<String> = rows
            .iter()
            .map(|row| {
                format!(
                    "{} {}={}",
                    row.x_label(chart.x_axis),
                    row.activity,
                    projection.value_field().get(row)
                )
            })
            .collect();
        log::info!("{} [{}]: {}", chart.title, chart.y_title, bars.join(", "));
        self.tables.insert(projection, rows.to_vec());
    }

    fn draw_timeline(&mut self, frame: &TimelineFrame) {
        if self.last_generation == Some(frame.generation) {
            log::debug!(
                "Timeline view {:.4}ms..{:.4}ms",
                frame.visible_domain_ms.0,
                frame.visible_domain_ms.1
            );
            return;
        }
        self.last_generation = Some(frame.generation);
        log::info!(
            "Timeline: {} edges over {} ({})",
            frame.edges.len(),
            frame.domain,
            frame.domain.duration()
        );
    }

    fn show_invariants(&mut self, panel: &InvariantPanel) {
        if self.last_panel.as_ref() == Some(panel) {
            return;
        }
        for section in panel.sections() {
            log::info!("{}\n{}", section.heading(), section.body());
        }
        self.last_panel = Some(panel.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::InvariantLog;

    #[test]
    fn log_renderer_remembers_last_output() {
        let mut renderer = LogRenderer::default();
        renderer.replace_table(Projection::ActivityCount, &[]);
        renderer.show_invariants(&InvariantLog::default().panel());

        assert_eq!(renderer.tables.get(&Projection::ActivityCount), Some(&Vec::new()));
        assert!(renderer.last_panel.is_some());
    }
}
