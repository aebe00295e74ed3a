//! One dashboard session: connection, stores, controllers and the loop that
//! turns store snapshots into rendered output.
//!
//! Everything is built once by [`Session::start`] and passed around by
//! handle. Dropping the session (or calling [`Session::shutdown`]) aborts
//! every task it spawned.

use crate::config::{DashboardConfig, TimelineConfig};
use crate::connection::{ConnectionAdapter, ConnectionStatus, create_connection_message_handler};
use crate::dataflow::{Actor, TaskHandle};
use crate::epoch::EpochRequests;
use crate::highlight::HighlightSet;
use crate::invariants::InvariantLog;
use crate::projection::{Projection, Source};
use crate::renderer::Renderer;
use crate::stores::{ActivityTimeline, StoreSet};
use crate::view_settings::{ViewSettings, ViewSettingsController};
use crate::visualizer::timeline::{TimelineController, TimelineView, layout_timeline};
use shared::{AggregateRecord, Epoch, MetricRecord};
use std::sync::Arc;
use tokio::sync::watch;

pub struct Session {
    stores: StoreSet,
    view_settings: ViewSettingsController,
    timeline: TimelineController,
    epoch_requests: EpochRequests,
    status: Actor<ConnectionStatus>,
    _connection: ConnectionAdapter,
    projection_task: TaskHandle,
}

impl Session {
    /// Connect to the backend and start projecting into `renderer`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &DashboardConfig, renderer: impl Renderer) -> Self {
        let stores = StoreSet::new();
        let view_settings = ViewSettingsController::new(ViewSettings::from(&config.view));
        let timeline = TimelineController::new(&config.timeline, stores.activity.signal());

        let (connection, events) = ConnectionAdapter::new(config.connection.clone());
        let epoch_requests = EpochRequests::new(
            Some(Epoch(config.view.initial_epoch)),
            config.polling.invariant_interval(),
            connection.clone(),
        );
        let status = create_connection_message_handler(
            events,
            &stores,
            epoch_requests.connection_established_relay.clone(),
        );

        let projections = ProjectionLoop {
            aggregates: stores.aggregates.signal(),
            metrics: stores.metrics.signal(),
            activity: stores.activity.signal(),
            highlights: stores.highlights.signal(),
            invariants: stores.invariants.signal(),
            settings: view_settings.settings.signal(),
            view: timeline.view.signal(),
            timeline_config: config.timeline,
            renderer,
        };
        let projection_task = TaskHandle::spawn(projections.run());

        log::info!("Dashboard session started for {}", config.connection.url);

        Self {
            stores,
            view_settings,
            timeline,
            epoch_requests,
            status,
            _connection: connection,
            projection_task,
        }
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn view_settings(&self) -> &ViewSettingsController {
        &self.view_settings
    }

    pub fn timeline(&self) -> &TimelineController {
        &self.timeline
    }

    pub fn status(&self) -> &Actor<ConnectionStatus> {
        &self.status
    }

    pub fn current_epoch(&self) -> Option<Epoch> {
        *self.epoch_requests.current_epoch.snapshot()
    }

    pub fn epoch_signal(&self) -> watch::Receiver<Arc<Option<Epoch>>> {
        self.epoch_requests.current_epoch.signal()
    }

    /// Raw text from the epoch input field.
    pub fn set_epoch_input(&self, raw: impl Into<String>) {
        self.epoch_requests.epoch_input_changed_relay.send(raw.into());
    }

    /// Resolves once the connection has given up reconnecting.
    pub async fn closed(&self) -> ConnectionStatus {
        let mut status = self.status.signal();
        let result = status
            .wait_for(|status| matches!(**status, ConnectionStatus::GaveUp { .. }))
            .await
            .map(|status| **status);
        result.unwrap_or(ConnectionStatus::Connecting)
    }

    pub fn shutdown(self) {
        self.projection_task.abort();
        log::info!("Dashboard session closed");
    }
}

/// Long-lived subscription to every store. Each change re-projects only the
/// outputs that depend on it.
struct ProjectionLoop<R> {
    aggregates: watch::Receiver<Arc<Vec<AggregateRecord>>>,
    metrics: watch::Receiver<Arc<Vec<MetricRecord>>>,
    activity: watch::Receiver<Arc<ActivityTimeline>>,
    highlights: watch::Receiver<Arc<HighlightSet>>,
    invariants: watch::Receiver<Arc<InvariantLog>>,
    settings: watch::Receiver<Arc<ViewSettings>>,
    view: watch::Receiver<Arc<TimelineView>>,
    timeline_config: TimelineConfig,
    renderer: R,
}

impl<R: Renderer> ProjectionLoop<R> {
    async fn run(mut self) {
        self.render_tables(None);
        self.render_timeline();
        self.render_invariants();

        loop {
            tokio::select! {
                Ok(()) = self.aggregates.changed() => {
                    self.render_tables(Some(Source::Aggregates));
                }
                Ok(()) = self.metrics.changed() => {
                    self.render_tables(Some(Source::Metrics));
                }
                Ok(()) = self.settings.changed() => {
                    self.render_tables(None);
                    self.render_timeline();
                }
                Ok(()) = self.activity.changed() => {
                    self.render_timeline();
                }
                Ok(()) = self.highlights.changed() => {
                    self.render_timeline();
                }
                Ok(()) = self.view.changed() => {
                    self.render_timeline();
                }
                Ok(()) = self.invariants.changed() => {
                    self.render_invariants();
                }
                else => break,
            }
        }
    }

    fn render_tables(&mut self, only: Option<Source>) {
        let aggregates = self.aggregates.borrow().clone();
        let metrics = self.metrics.borrow().clone();
        let settings = **self.settings.borrow();

        for projection in Projection::ALL {
            if only.is_some_and(|source| source != projection.source()) {
                continue;
            }
            let rows = projection.project(&aggregates, &metrics, &settings);
            self.renderer.replace_table(projection, &rows);
        }
    }

    fn render_timeline(&mut self) {
        let activity = self.activity.borrow().clone();
        let highlights = self.highlights.borrow().clone();
        let settings = **self.settings.borrow();
        let view = **self.view.borrow();

        if let Some(frame) =
            layout_timeline(&activity, &view, &highlights, &settings, &self.timeline_config)
        {
            self.renderer.draw_timeline(&frame);
        }
    }

    fn render_invariants(&mut self) {
        let panel = self.invariants.borrow().panel();
        self.renderer.show_invariants(&panel);
    }
}
