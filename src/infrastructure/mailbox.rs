use crate::domain::ports::{NotificationDispatcher, Template};
use crate::error::{GivingError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub template: Template,
    pub recipient: String,
    pub payload: serde_json::Value,
}

/// Sending half of the notification queue. `send` never waits on delivery.
#[derive(Clone)]
pub struct Mailbox {
    queue: mpsc::UnboundedSender<Notification>,
}

/// Receiving half, drained by whatever delivers mail.
pub struct Outbox {
    queue: mpsc::UnboundedReceiver<Notification>,
}

pub fn mailbox() -> (Mailbox, Outbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Mailbox { queue: tx }, Outbox { queue: rx })
}

impl Outbox {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.queue.recv().await
    }

    /// Everything queued so far, without waiting.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.queue.try_recv() {
            out.push(notification);
        }
        out
    }
}

#[async_trait]
impl NotificationDispatcher for Mailbox {
    async fn send(
        &self,
        template: Template,
        recipient: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.queue
            .send(Notification {
                template,
                recipient: recipient.to_string(),
                payload,
            })
            .map_err(|_| GivingError::Dispatch("notification queue is closed".to_string()))
    }
}
