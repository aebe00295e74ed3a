//! Single-value Actor implementation for reactive state management
//!
//! Actor owns one value behind a `tokio::sync::watch` channel and runs a
//! processor task that is the only writer. Readers get cheap `Arc` snapshots
//! and can await changes through [`Actor::signal`].

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background task owned by its creator. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct TaskHandle(JoinHandle<()>);

impl TaskHandle {
    pub fn spawn<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        TaskHandle(tokio::spawn(future))
    }

    pub fn abort(&self) {
        self.0.abort();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Single-value reactive state container for Actor+Relay architecture.
///
/// Every mutation happens inside the processor passed to [`Actor::new`], so
/// events are applied one at a time in the order the processor receives them.
///
/// ```rust,ignore
/// let (increment_relay, mut increment_stream) = relay::<u64>();
///
/// let counter = Actor::new(0_u64, async move |state| {
///     while let Some(amount) = increment_stream.next().await {
///         state.update_mut(|current| *current += amount);
///     }
/// });
///
/// increment_relay.send(5);
/// counter.signal().wait_for(|count| **count == 5).await?;
/// ```
#[derive(Clone, Debug)]
pub struct Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    receiver: watch::Receiver<Arc<T>>,
    _task: Arc<TaskHandle>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new Actor with initial state and its event processing loop.
    ///
    /// Must be called from within a tokio runtime. The task lives until its
    /// loop returns or the last clone of the Actor is dropped.
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(ActorState<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(Arc::new(initial_state));
        let task = Arc::new(TaskHandle::spawn(processor(ActorState { sender })));

        Self {
            receiver,
            _task: task,
        }
    }

    /// Change-notifying view of the state.
    ///
    /// The returned receiver has already seen the current value, so
    /// `changed().await` resolves on the next mutation.
    pub fn signal(&self) -> watch::Receiver<Arc<T>> {
        let mut receiver = self.receiver.clone();
        receiver.mark_unchanged();
        receiver
    }

    pub fn snapshot(&self) -> Arc<T> {
        self.receiver.borrow().clone()
    }
}

/// Write access handed to an Actor's processor.
#[derive(Debug)]
pub struct ActorState<T> {
    sender: watch::Sender<Arc<T>>,
}

impl<T> ActorState<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn set(&self, value: T) {
        self.sender.send_replace(Arc::new(value));
    }

    /// Replace the value, notifying readers only when it actually differs.
    pub fn set_neq(&self, value: T)
    where
        T: PartialEq,
    {
        self.sender.send_if_modified(|current| {
            if **current == value {
                false
            } else {
                *current = Arc::new(value);
                true
            }
        });
    }

    /// Mutate in place. Snapshots held by readers stay untouched.
    pub fn update_mut(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(|current| f(Arc::make_mut(current)));
    }

    pub fn get_cloned(&self) -> T {
        T::clone(&self.sender.borrow())
    }

    pub fn snapshot(&self) -> Arc<T> {
        self.sender.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::relay;
    use futures::{StreamExt, select};
    use std::time::Duration;

    async fn settle<T>(actor: &Actor<T>, predicate: impl FnMut(&Arc<T>) -> bool)
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut signal = actor.signal();
        tokio::time::timeout(Duration::from_secs(1), signal.wait_for(predicate))
            .await
            .expect("actor did not reach expected state")
            .expect("actor stopped");
    }

    #[tokio::test]
    async fn applies_events_in_order() {
        let (increment_relay, mut increment_stream) = relay::<u64>();

        let counter = Actor::new(0_u64, async move |state| {
            while let Some(amount) = increment_stream.next().await {
                state.update_mut(|current| *current += amount);
            }
        });

        increment_relay.send(5);
        increment_relay.send(3);

        settle(&counter, |count| **count == 8).await;
        assert_eq!(*counter.snapshot(), 8);
    }

    #[tokio::test]
    async fn multiple_streams_share_one_state() {
        let (increment_relay, increment_stream) = relay::<i64>();
        let (decrement_relay, decrement_stream) = relay::<i64>();

        let counter = Actor::new(10_i64, async move |state| {
            let mut increments = increment_stream.fuse();
            let mut decrements = decrement_stream.fuse();
            loop {
                select! {
                    amount = increments.next() => match amount {
                        Some(amount) => state.update_mut(|current| *current += amount),
                        None => break,
                    },
                    amount = decrements.next() => match amount {
                        Some(amount) => state.update_mut(|current| *current -= amount),
                        None => break,
                    },
                    complete => break,
                }
            }
        });

        increment_relay.send(5);
        decrement_relay.send(12);

        settle(&counter, |count| **count == 3).await;
    }

    #[tokio::test]
    async fn set_neq_skips_identical_values() {
        let (label_relay, mut label_stream) = relay::<String>();

        let label = Actor::new(String::from("idle"), async move |state| {
            while let Some(next) = label_stream.next().await {
                state.set_neq(next);
            }
        });

        let mut signal = label.signal();
        label_relay.send("idle".to_string());
        label_relay.send("busy".to_string());

        tokio::time::timeout(Duration::from_secs(1), signal.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.borrow_and_update().as_str(), "busy");
    }

    #[tokio::test]
    async fn snapshots_are_not_affected_by_later_updates() {
        let (push_relay, mut push_stream) = relay::<u8>();

        let items = Actor::new(Vec::<u8>::new(), async move |state| {
            while let Some(item) = push_stream.next().await {
                state.update_mut(|items| items.push(item));
            }
        });

        push_relay.send(1);
        settle(&items, |items| items.len() == 1).await;
        let before = items.snapshot();

        push_relay.send(2);
        settle(&items, |items| items.len() == 2).await;

        assert_eq!(*before, vec![1]);
        assert_eq!(*items.snapshot(), vec![1, 2]);
    }

    #[tokio::test]
    async fn dropping_actor_aborts_processor() {
        let (alive, mut stopped) = tokio::sync::mpsc::channel::<()>(1);
        let (_tick_relay, mut tick_stream) = relay::<()>();

        let actor = Actor::new((), async move |_state| {
            let _alive = alive;
            while tick_stream.next().await.is_some() {}
        });

        drop(actor);

        tokio::time::timeout(Duration::from_secs(1), stopped.recv())
            .await
            .expect("processor still running");
    }
}
