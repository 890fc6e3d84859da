//! Handoff queue between the watcher and the processor
//!
//! The only state shared by the two loops. The watcher owns the sending
//! half and the processor owns the receiving half; events move through by
//! ownership transfer. Dropping either half closes the queue for the other.

use tokio::sync::mpsc;

use crate::events::NormalizedEvent;

/// Producer half, owned by the watcher.
pub type EventSender = mpsc::UnboundedSender<NormalizedEvent>;

/// Consumer half, owned by the processor.
pub type EventReceiver = mpsc::UnboundedReceiver<NormalizedEvent>;

/// Creates an unbounded FIFO queue of normalized events.
///
/// # Examples
///
/// ```
/// use eventlens::queue::handoff_queue;
///
/// let (tx, rx) = handoff_queue();
/// assert!(!tx.is_closed());
/// drop(rx);
/// assert!(tx.is_closed());
/// ```
pub fn handoff_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::warning_event;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = handoff_queue();
        for pod in ["p1", "p2", "p3"] {
            tx.send(NormalizedEvent::from_raw(&warning_event("ns1", pod, "BackOff", "")))
                .unwrap();
        }

        for pod in ["p1", "p2", "p3"] {
            assert_eq!(rx.recv().await.unwrap().involved_object.name, pod);
        }
    }

    #[tokio::test]
    async fn test_receiver_sees_close_after_drain() {
        let (tx, mut rx) = handoff_queue();
        tx.send(NormalizedEvent::from_raw(&warning_event("ns1", "p1", "BackOff", "")))
            .unwrap();
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = handoff_queue();
        drop(rx);
        let event = NormalizedEvent::from_raw(&warning_event("ns1", "p1", "BackOff", ""));
        assert!(tx.send(event).is_err());
    }
}
