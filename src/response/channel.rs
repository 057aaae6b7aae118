//! Channel-backed response sink.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ChatResponse, UserInputListeners};
use crate::stream::{ResponseEvent, StreamChunk};

/// Forwards every chunk and the finish signal as [`ResponseEvent`]s over an
/// unbounded tokio channel, in emission order.
///
/// The receiving end is the transport (a renderer, a websocket writer, a
/// test). A closed receiver is not an error: the turn keeps running and the
/// events are dropped.
pub struct ChannelResponse {
    message_id: String,
    tx: mpsc::UnboundedSender<ResponseEvent>,
    finished: AtomicBool,
    listeners: UserInputListeners,
}

impl ChannelResponse {
    /// Creates a sink with a fresh UUID v4 message id.
    pub fn new(tx: mpsc::UnboundedSender<ResponseEvent>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), tx)
    }

    pub fn with_id(message_id: impl Into<String>, tx: mpsc::UnboundedSender<ResponseEvent>) -> Self {
        Self {
            message_id: message_id.into(),
            tx,
            finished: AtomicBool::new(false),
            listeners: UserInputListeners::new(),
        }
    }

    /// Creates a sink together with the receiver for its events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResponseEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl ChatResponse for ChannelResponse {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn emit(&self, chunk: StreamChunk, is_final: bool) {
        if self.is_finished() {
            tracing::warn!(
                message_id = %self.message_id,
                kind = %chunk.kind(),
                "dropping chunk emitted after finish"
            );
            return;
        }
        let _ = self.tx.send(ResponseEvent::Chunk {
            message_id: self.message_id.clone(),
            chunk,
            is_final,
        });
    }

    fn finish(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            tracing::warn!(message_id = %self.message_id, "finish called twice");
            return;
        }
        let _ = self.tx.send(ResponseEvent::Finished {
            message_id: self.message_id.clone(),
        });
    }

    fn listeners(&self) -> &UserInputListeners {
        &self.listeners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order_and_stop_after_finish() {
        let (response, mut rx) = ChannelResponse::channel();
        response.emit(StreamChunk::markdown("one"), false);
        response.emit(StreamChunk::markdown("two"), true);
        response.finish();
        response.emit(StreamChunk::markdown("late"), false);
        response.finish();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            ResponseEvent::Chunk { chunk: StreamChunk::Markdown(text), is_final: false, .. } if text == "one"
        ));
        assert!(matches!(&events[1], ResponseEvent::Chunk { is_final: true, .. }));
        assert!(matches!(&events[2], ResponseEvent::Finished { .. }));
        assert!(response.is_finished());
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let (response, rx) = ChannelResponse::channel();
        drop(rx);
        response.emit(StreamChunk::markdown("nobody listening"), false);
        response.finish();
        assert!(response.is_finished());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let (a, _rx_a) = ChannelResponse::channel();
        let (b, _rx_b) = ChannelResponse::channel();
        assert_ne!(a.message_id(), b.message_id());
    }
}
