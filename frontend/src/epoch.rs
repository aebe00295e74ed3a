//! Epoch selection and the requests it triggers.
//!
//! A valid epoch input issues one PAG/AGG/ALL/MET batch. INV is polled on a
//! fixed interval independent of the epoch. Every (re)connect repeats the
//! current batch and one INV so a fresh session starts populated.

use crate::connection::ConnectionAdapter;
use crate::dataflow::{Actor, Relay, relay};
use futures::StreamExt;
use shared::{Epoch, UpMsg};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochController {
    current: Option<Epoch>,
}

impl EpochController {
    pub fn new(initial: Option<Epoch>) -> Self {
        EpochController { current: initial }
    }

    /// Parse raw user input. Invalid input leaves the current epoch alone
    /// and yields no requests.
    pub fn set_epoch(&mut self, raw: &str) -> Option<Vec<UpMsg>> {
        let epoch = Epoch::parse_input(raw)?;
        self.current = Some(epoch);
        Some(UpMsg::epoch_batch(epoch).to_vec())
    }

    pub fn current(&self) -> Option<Epoch> {
        self.current
    }

    pub fn current_batch(&self) -> Option<Vec<UpMsg>> {
        self.current.map(|epoch| UpMsg::epoch_batch(epoch).to_vec())
    }
}

/// Request loop wired to the connection.
#[derive(Clone, Debug)]
pub struct EpochRequests {
    pub current_epoch: Actor<Option<Epoch>>,
    pub epoch_input_changed_relay: Relay<String>,
    pub connection_established_relay: Relay<u64>,
}

impl EpochRequests {
    pub fn new(
        initial: Option<Epoch>,
        invariant_interval: Duration,
        connection: ConnectionAdapter,
    ) -> Self {
        let (epoch_input_changed_relay, epoch_input_changed_stream) = relay::<String>();
        let (connection_established_relay, connection_established_stream) = relay::<u64>();

        let current_epoch = Actor::new(initial, async move |state| {
            let mut controller = EpochController::new(initial);
            let mut epoch_input_changed = epoch_input_changed_stream;
            let mut connection_established = connection_established_stream;
            let mut invariant_poll = tokio::time::interval(invariant_interval);
            invariant_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    Some(raw) = epoch_input_changed.next() => {
                        match controller.set_epoch(&raw) {
                            Some(batch) => {
                                log::debug!("Requesting epoch {:?}", controller.current());
                                batch.into_iter().for_each(|request| connection.send_up_msg(request));
                                state.set_neq(controller.current());
                            }
                            None => log::debug!("Ignoring epoch input {:?}", raw),
                        }
                    }
                    Some(session) = connection_established.next() => {
                        log::debug!("Session {} established, re-requesting current epoch", session);
                        controller
                            .current_batch()
                            .into_iter()
                            .flatten()
                            .for_each(|request| connection.send_up_msg(request));
                        connection.send_up_msg(UpMsg::Invariants);
                    }
                    _ = invariant_poll.tick() => {
                        connection.send_up_msg(UpMsg::Invariants);
                    }
                }
            }
        });

        Self {
            current_epoch,
            epoch_input_changed_relay,
            connection_established_relay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::UnboundedReceiver;
    use shared::FrameKind;

    #[test]
    fn valid_input_yields_four_request_batch() {
        let mut controller = EpochController::default();
        let batch = controller.set_epoch("12").unwrap();

        assert_eq!(batch, UpMsg::epoch_batch(Epoch(12)).to_vec());
        assert_eq!(controller.current(), Some(Epoch(12)));
    }

    #[test]
    fn invalid_input_keeps_previous_epoch() {
        let mut controller = EpochController::new(Some(Epoch(3)));

        assert_eq!(controller.set_epoch("abc"), None);
        assert_eq!(controller.set_epoch(""), None);
        assert_eq!(controller.current(), Some(Epoch(3)));
        assert_eq!(controller.current_batch(), Some(UpMsg::epoch_batch(Epoch(3)).to_vec()));
    }

    async fn next_request(requests: &mut UnboundedReceiver<UpMsg>) -> UpMsg {
        tokio::time::timeout(Duration::from_secs(1), requests.next())
            .await
            .expect("no request sent")
            .expect("request stream closed")
    }

    fn drain(requests: &mut UnboundedReceiver<UpMsg>) -> Vec<UpMsg> {
        std::iter::from_fn(|| requests.try_recv().ok()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn invariants_are_polled_from_the_start() {
        let (connection, mut requests) = ConnectionAdapter::loopback();
        let _requests_loop = EpochRequests::new(None, Duration::from_secs(5), connection);

        assert_eq!(next_request(&mut requests).await, UpMsg::Invariants);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(next_request(&mut requests).await, UpMsg::Invariants);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_repeats_current_batch() {
        let (connection, mut requests) = ConnectionAdapter::loopback();
        let epoch_requests = EpochRequests::new(Some(Epoch(1)), Duration::from_secs(60), connection);
        assert_eq!(next_request(&mut requests).await, UpMsg::Invariants);

        epoch_requests.connection_established_relay.send(1);
        let mut kinds = Vec::new();
        for _ in 0..5 {
            kinds.push(next_request(&mut requests).await.kind());
        }
        assert_eq!(
            kinds,
            vec![FrameKind::Pag, FrameKind::Agg, FrameKind::All, FrameKind::Met, FrameKind::Inv]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_sends_nothing() {
        let (connection, mut requests) = ConnectionAdapter::loopback();
        let epoch_requests = EpochRequests::new(Some(Epoch(2)), Duration::from_secs(60), connection);
        assert_eq!(next_request(&mut requests).await, UpMsg::Invariants);

        epoch_requests.epoch_input_changed_relay.send("x1".to_string());
        epoch_requests.epoch_input_changed_relay.send("9".to_string());

        assert_eq!(next_request(&mut requests).await, UpMsg::ActivityEdges { epoch: Epoch(9) });
        let rest = drain(&mut requests);
        assert!(rest.iter().all(|request| request.epoch() == Some(Epoch(9))));

        let mut current = epoch_requests.current_epoch.signal();
        tokio::time::timeout(Duration::from_secs(1), current.wait_for(|epoch| **epoch == Some(Epoch(9))))
            .await
            .unwrap()
            .unwrap();
    }
}
