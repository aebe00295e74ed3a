//! Event streaming Relay
//!
//! A Relay is the write side of an unbounded channel. UI input, timers and
//! the connection demux push events into relays; exactly one Actor owns the
//! receiving stream and folds those events into its state.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

/// Type-safe event source for Actor+Relay wiring.
///
/// Relays are named after where the event comes from, e.g.
/// `epoch_input_changed_relay`, `pag_received_relay`, `timeline_zoomed_relay`.
///
/// ```rust,ignore
/// let (epoch_input_changed_relay, mut stream) = relay::<String>();
/// epoch_input_changed_relay.send("12".to_string());
/// assert_eq!(stream.next().await.as_deref(), Some("12"));
/// ```
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Send an event, silently discarding it when nobody listens anymore.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }
}

/// Creates a Relay together with the stream its owning Actor consumes.
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (epoch_input_changed_relay, mut stream) = relay::<String>();

        epoch_input_changed_relay.send("3".to_string());
        epoch_input_changed_relay.send("4".to_string());

        assert_eq!(stream.next().await.as_deref(), Some("3"));
        assert_eq!(stream.next().await.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn sending_after_receiver_dropped_is_silent() {
        let (pag_received_relay, receiver) = relay::<Vec<u64>>();
        drop(receiver);

        pag_received_relay.send(vec![1, 2]);
    }

    #[tokio::test]
    async fn cloned_relays_feed_one_stream() {
        let (highlight_toggled_relay, mut stream) = relay::<bool>();
        let from_checkbox = highlight_toggled_relay.clone();

        highlight_toggled_relay.send(false);
        from_checkbox.send(true);

        assert_eq!(stream.next().await, Some(false));
        assert_eq!(stream.next().await, Some(true));
    }
}
