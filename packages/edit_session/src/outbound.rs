use native_messaging::OutboundMessage;
use tokio::sync::mpsc;
use tracing::warn;

/// Cloneable handle for queueing messages to the extension.
///
/// Every session task and watcher shares one queue; a single writer task
/// drains it so frames never interleave.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<OutboundMessage>,
}

impl Outbound {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a message. If the writer is gone the message is dropped; the
    /// writer's own failure is what gets reported.
    pub async fn send(&self, msg: OutboundMessage) {
        if self.tx.send(msg).await.is_err() {
            warn!("Failed to queue outbound message - writer closed");
        }
    }

    pub async fn text_update(&self, id: &str, text: String) {
        self.send(OutboundMessage::text_update(id, text)).await;
    }

    pub async fn death_notice(&self, id: &str) {
        self.send(OutboundMessage::death_notice(id)).await;
    }

    pub async fn error(&self, error: impl std::fmt::Display) {
        self.send(OutboundMessage::error(error)).await;
    }
}
