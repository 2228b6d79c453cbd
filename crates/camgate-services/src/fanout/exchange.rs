//! In-process fan-out exchange.
//!
//! Every bound queue receives every published message. Queues are bounded, so a slow
//! subscriber applies backpressure to the publisher up to [`PUBLISH_TIMEOUT`].

use camgate_core::models::ImageMessage;
use camgate_core::PublishError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::mpsc;

pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Delivers accepted images to downstream processors.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: ImageMessage) -> Result<(), PublishError>;
}

struct Binding {
    queue: String,
    sender: mpsc::Sender<ImageMessage>,
}

pub struct FanoutExchange {
    name: String,
    capacity: usize,
    bindings: RwLock<Vec<Binding>>,
    closed: AtomicBool,
}

impl FanoutExchange {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            bindings: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind a named queue. Rebinding a name replaces the previous consumer.
    pub fn bind(&self, queue: impl Into<String>) -> mpsc::Receiver<ImageMessage> {
        let queue = queue.into();
        let (sender, receiver) = mpsc::channel(self.capacity);
        let mut bindings = self.bindings.write().unwrap_or_else(|e| e.into_inner());
        bindings.retain(|b| b.queue != queue);
        tracing::info!(exchange = %self.name, queue = %queue, "Queue bound to exchange");
        bindings.push(Binding { queue, sender });
        receiver
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|b| b.queue.clone())
            .collect()
    }

    /// Refuse further publishes and drop all bindings so consumers drain and exit.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait::async_trait]
impl Publisher for FanoutExchange {
    async fn publish(&self, message: ImageMessage) -> Result<(), PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Unreachable(format!(
                "exchange {} is closed",
                self.name
            )));
        }

        let targets: Vec<(String, mpsc::Sender<ImageMessage>)> = self
            .bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|b| (b.queue.clone(), b.sender.clone()))
            .collect();

        if targets.is_empty() {
            tracing::debug!(exchange = %self.name, "No queues bound, message dropped");
            return Ok(());
        }

        for (queue, sender) in targets {
            match sender.send_timeout(message.clone(), PUBLISH_TIMEOUT).await {
                Ok(()) => {}
                Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                    return Err(PublishError::Rejected(format!("queue {} is full", queue)));
                }
                Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                    return Err(PublishError::Unreachable(format!(
                        "queue {} has no consumer",
                        queue
                    )));
                }
            }
        }

        tracing::debug!(
            exchange = %self.name,
            camera_id = %message.headers.camera_id,
            filename = %message.headers.filename,
            "Message published"
        );
        Ok(())
    }
}
