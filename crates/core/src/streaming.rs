//! Channel-backed observer for async consumers
//!
//! Dispatch is synchronous on the reader task. `EventStream` hops events onto a
//! bounded tokio channel so a consumer can `recv().await` them on its own task.
//! Sending never blocks the reader: when the buffer is full the event is
//! dropped and logged, there is no replay.

use tokio::sync::mpsc;

use crate::dispatch::ChatObserver;
use crate::types::ChatEvent;

/// Observer that forwards every event into a bounded channel
pub struct EventStream {
    tx: mpsc::Sender<ChatEvent>,
}

impl EventStream {
    /// Create new stream with specified buffer capacity
    ///
    /// # Returns
    /// * `(EventStream, mpsc::Receiver<ChatEvent>)` - observer and receiving half
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Check if the receiver was dropped
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ChatObserver for EventStream {
    fn on_event(&self, event: &ChatEvent) -> anyhow::Result<()> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(kind = dropped.kind(), "Event stream full, dropping event");
                Ok(())
            }
            // Receiver gone; nothing to deliver to
            Err(mpsc::error::TrySendError::Closed(_)) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_events() {
        let (stream, mut rx) = EventStream::new(4);

        stream.on_event(&ChatEvent::login_result(true)).unwrap();
        stream.on_event(&ChatEvent::Disconnected).unwrap();

        assert_eq!(rx.recv().await, Some(ChatEvent::login_result(true)));
        assert_eq!(rx.recv().await, Some(ChatEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let (stream, mut rx) = EventStream::new(1);

        stream.on_event(&ChatEvent::message(false, "a", "first")).unwrap();
        stream.on_event(&ChatEvent::message(false, "a", "second")).unwrap();

        assert_eq!(rx.recv().await, Some(ChatEvent::message(false, "a", "first")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver() {
        let (stream, rx) = EventStream::new(1);
        drop(rx);
        assert!(stream.is_closed());
        assert!(stream.on_event(&ChatEvent::Disconnected).is_ok());
    }
}
