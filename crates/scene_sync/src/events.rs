// SPDX-License-Identifier: MIT OR Apache-2.0
//! Publish/subscribe notification channels.
//!
//! Each channel delivers events to every subscriber in emission order.
//! Nothing is promised about ordering between two different channels: a
//! selection event and the graph change caused by the same user action may
//! be observed in either order.

use crate::asset_tracker::ProgressEvent;
use crate::engine::SceneNodeRef;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// A cloneable publisher handle for one event type
pub struct EventChannel<T> {
    subscribers: Arc<Mutex<Vec<UnboundedSender<T>>>>,
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl<T: Clone> EventChannel<T> {
    /// Create a channel with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; it only sees events published afterwards
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Subscription { rx }
    }

    /// Deliver an event to every live subscriber, returning how many got it
    pub fn publish(&self, event: T) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

/// Receiving end of an [`EventChannel`]
#[derive(Debug)]
pub struct Subscription<T> {
    rx: UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Take the next pending event without waiting
    pub fn try_next(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::trace!("Event channel disconnected");
                None
            }
        }
    }

    /// Take every pending event in emission order (non-blocking)
    pub fn drain(&mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event; `None` once every publisher is gone
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// Graph shape or content changed in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphChanged {
    /// Nodes were added, removed or reparented
    pub structural: bool,
}

/// The engine's active selection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChanged {
    /// New selection, `None` when cleared
    pub node: Option<SceneNodeRef>,
}

/// The notification channels a scene collaborator publishes on
#[derive(Debug, Clone, Default)]
pub struct SceneEvents {
    /// `onSceneGraphChanged`
    pub graph_changed: EventChannel<GraphChanged>,
    /// `onObjectSelected`
    pub object_selected: EventChannel<SelectionChanged>,
    /// `onLoadProgress`
    pub load_progress: EventChannel<ProgressEvent>,
    /// `onSaveProgress`
    pub save_progress: EventChannel<ProgressEvent>,
}

impl SceneEvents {
    /// Create a fresh set of channels
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_subscriber() {
        let channel = EventChannel::new();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        for i in 0..5 {
            assert_eq!(channel.publish(i), 2);
        }

        assert_eq!(first.drain(), vec![0, 1, 2, 3, 4]);
        assert_eq!(second.drain(), vec![0, 1, 2, 3, 4]);
        assert_eq!(first.try_next(), None);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let channel = EventChannel::new();
        channel.publish("early");
        let mut late = channel.subscribe();
        channel.publish("late");
        assert_eq!(late.drain(), vec!["late"]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let channel: EventChannel<u8> = EventChannel::new();
        let kept = channel.subscribe();
        drop(channel.subscribe());
        assert_eq!(channel.publish(1), 1);
        assert_eq!(channel.subscriber_count(), 1);
        drop(kept);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_async_next() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe();
        channel.publish(GraphChanged { structural: true });
        let event = futures::executor::block_on(sub.next());
        assert_eq!(event, Some(GraphChanged { structural: true }));
    }
}
