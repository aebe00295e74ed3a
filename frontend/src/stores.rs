//! Per-kind state stores fed by the connection demux.
//!
//! Each store is an Actor with its own inbound relay, so one kind never
//! waits on another. PAG, AGG and MET payloads replace their store wholesale.
//! ALL and INV accumulate for the lifetime of a session.

use crate::dataflow::{Actor, Relay, relay};
use crate::highlight::HighlightSet;
use crate::invariants::InvariantLog;
use crate::visualizer::timeline::time_domain::{TimeNs, TimeRange};
use futures::StreamExt;
use shared::{ActivityEdge, AggregateRecord, CorrelationPair, InvariantReport, MetricRecord};

/// Activity edges of the selected epoch plus a replacement counter.
///
/// The timeline resets its pan/zoom whenever `generation` moves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTimeline {
    pub edges: Vec<ActivityEdge>,
    pub generation: u64,
}

impl ActivityTimeline {
    pub fn replace(&mut self, edges: Vec<ActivityEdge>) {
        self.edges = edges;
        self.generation += 1;
    }

    /// `[first.src.t, last.dst.t]`, following the server's edge order.
    pub fn domain(&self) -> Option<TimeRange> {
        let first = self.edges.first()?;
        let last = self.edges.last()?;
        Some(TimeRange::new(
            TimeNs::from_nanos(first.src.timestamp_ns),
            TimeNs::from_nanos(last.dst.timestamp_ns),
        ))
    }
}

/// Input of a session-scoped store. Restarts travel on the same relay as
/// frames so they apply in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput<T> {
    Received(T),
    Restarted,
}

#[derive(Clone, Debug)]
pub struct StoreSet {
    pub activity: Actor<ActivityTimeline>,
    pub aggregates: Actor<Vec<AggregateRecord>>,
    pub metrics: Actor<Vec<MetricRecord>>,
    pub highlights: Actor<HighlightSet>,
    pub invariants: Actor<InvariantLog>,

    pub pag_received_relay: Relay<Vec<ActivityEdge>>,
    pub agg_received_relay: Relay<Vec<AggregateRecord>>,
    pub all_received_relay: Relay<SessionInput<Vec<CorrelationPair>>>,
    pub met_received_relay: Relay<Vec<MetricRecord>>,
    pub inv_received_relay: Relay<SessionInput<Vec<InvariantReport>>>,
}

impl StoreSet {
    pub fn new() -> Self {
        let (pag_received_relay, mut pag_received_stream) = relay::<Vec<ActivityEdge>>();
        let (agg_received_relay, mut agg_received_stream) = relay::<Vec<AggregateRecord>>();
        let (all_received_relay, mut all_received_stream) =
            relay::<SessionInput<Vec<CorrelationPair>>>();
        let (met_received_relay, mut met_received_stream) = relay::<Vec<MetricRecord>>();
        let (inv_received_relay, mut inv_received_stream) =
            relay::<SessionInput<Vec<InvariantReport>>>();

        let activity = Actor::new(ActivityTimeline::default(), async move |state| {
            while let Some(edges) = pag_received_stream.next().await {
                log::debug!("PAG: {} edges", edges.len());
                state.update_mut(|timeline| timeline.replace(edges));
            }
        });

        let aggregates = Actor::new(Vec::new(), async move |state| {
            while let Some(records) = agg_received_stream.next().await {
                log::debug!("AGG: {} records", records.len());
                state.set(records);
            }
        });

        let metrics = Actor::new(Vec::new(), async move |state| {
            while let Some(records) = met_received_stream.next().await {
                log::debug!("MET: {} records", records.len());
                state.set(records);
            }
        });

        let highlights = Actor::new(HighlightSet::default(), async move |state| {
            while let Some(input) = all_received_stream.next().await {
                match input {
                    SessionInput::Received(pairs) => state.update_mut(|set| {
                        let added = set.extend_pairs(pairs);
                        log::debug!("ALL: {} new correlation keys", added);
                    }),
                    SessionInput::Restarted => state.set(HighlightSet::default()),
                }
            }
        });

        let invariants = Actor::new(InvariantLog::default(), async move |state| {
            while let Some(input) = inv_received_stream.next().await {
                match input {
                    SessionInput::Received(reports) if reports.is_empty() => {}
                    SessionInput::Received(reports) => state.update_mut(|log| log.ingest(reports)),
                    SessionInput::Restarted => state.set(InvariantLog::default()),
                }
            }
        });

        Self {
            activity,
            aggregates,
            metrics,
            highlights,
            invariants,
            pag_received_relay,
            agg_received_relay,
            all_received_relay,
            met_received_relay,
            inv_received_relay,
        }
    }

    /// Start a fresh session: clears the highlight set and invariant log.
    /// Epoch-scoped stores keep their content until new frames replace it.
    pub fn restart_session(&self) {
        self.all_received_relay.send(SessionInput::Restarted);
        self.inv_received_relay.send(SessionInput::Restarted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActivityKind, Endpoint, Traversal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn edge(kind: ActivityKind, src: (u64, u64), dst: (u64, u64)) -> ActivityEdge {
        ActivityEdge {
            kind,
            operator_id: 0,
            length: 0,
            traversal: Traversal::Undefined,
            src: Endpoint { worker: src.0, timestamp_ns: src.1, epoch: 0 },
            dst: Endpoint { worker: dst.0, timestamp_ns: dst.1, epoch: 0 },
        }
    }

    async fn wait_until<T>(mut signal: watch::Receiver<Arc<T>>, predicate: impl FnMut(&Arc<T>) -> bool) {
        tokio::time::timeout(Duration::from_secs(1), signal.wait_for(predicate))
            .await
            .expect("store did not reach expected state")
            .expect("store stopped");
    }

    #[test]
    fn domain_spans_first_source_to_last_destination() {
        let mut timeline = ActivityTimeline::default();
        assert_eq!(timeline.domain(), None);

        timeline.replace(vec![
            edge(ActivityKind::Processing, (0, 0), (0, 10)),
            edge(ActivityKind::DataMessage, (0, 10), (1, 30)),
        ]);

        assert_eq!(timeline.generation, 1);
        assert_eq!(timeline.domain(), Some(TimeRange::new(TimeNs(0), TimeNs(30))));
    }

    #[tokio::test]
    async fn aggregates_are_replaced_not_merged() {
        let stores = StoreSet::new();
        let record = |count| AggregateRecord {
            activity: ActivityKind::Processing,
            worker: 0,
            count,
            weighted_count: count,
        };

        stores.agg_received_relay.send(vec![record(1), record(2)]);
        wait_until(stores.aggregates.signal(), |rows| rows.len() == 2).await;

        stores.agg_received_relay.send(vec![record(9)]);
        wait_until(stores.aggregates.signal(), |rows| rows.len() == 1).await;
        assert_eq!(stores.aggregates.snapshot()[0].count, 9);
    }

    #[tokio::test]
    async fn each_pag_frame_bumps_generation() {
        let stores = StoreSet::new();
        let edges = vec![edge(ActivityKind::Spinning, (0, 5), (0, 9))];

        stores.pag_received_relay.send(edges.clone());
        stores.pag_received_relay.send(edges);

        wait_until(stores.activity.signal(), |timeline| timeline.generation == 2).await;
    }

    #[tokio::test]
    async fn restart_clears_session_scoped_stores_only() {
        let stores = StoreSet::new();

        stores.all_received_relay.send(SessionInput::Received(vec![CorrelationPair(1, 2)]));
        stores.met_received_relay.send(vec![MetricRecord {
            activity: ActivityKind::Busy,
            worker_from: 0,
            worker_to: None,
            activity_count: 1,
            activity_time_ns: 10,
            record_count: 0,
        }]);
        wait_until(stores.highlights.signal(), |set| set.len() == 1).await;
        wait_until(stores.metrics.signal(), |rows| rows.len() == 1).await;

        stores.restart_session();
        wait_until(stores.highlights.signal(), |set| set.is_empty()).await;

        assert_eq!(stores.metrics.snapshot().len(), 1);

        stores.all_received_relay.send(SessionInput::Received(vec![CorrelationPair(3, 4)]));
        wait_until(stores.highlights.signal(), |set| set.len() == 1).await;
    }
}
