//! Bridge between the blocking digest worker and an async event consumer.
//!
//! The worker pushes [`BridgeMessage`]s into a bounded channel with
//! `blocking_send`, so a slow consumer throttles it. The forwarder task
//! drains the channel in order, hands each event to the consumer and
//! turns the final [`BridgeMessage::Finished`] sentinel into the single
//! terminal event. Its `JoinHandle` resolves once everything buffered has
//! been delivered.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gitscape_core::{DigestDocument, ProgressEvent, ProgressSink};

use crate::error::SessionError;

/// Type alias for boxed futures returned by [`EventConsumer`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The consumer can no longer accept events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event consumer closed")]
pub struct ConsumerClosed;

/// Destination for session events, e.g. a websocket or a channel.
pub trait EventConsumer: Send {
    /// Deliver one event. An error means the consumer is gone for good.
    fn send(&mut self, event: ProgressEvent) -> BoxFuture<'_, Result<(), ConsumerClosed>>;
}

impl EventConsumer for mpsc::Sender<ProgressEvent> {
    fn send(&mut self, event: ProgressEvent) -> BoxFuture<'_, Result<(), ConsumerClosed>> {
        let sender: &mpsc::Sender<ProgressEvent> = self;
        Box::pin(async move { sender.send(event).await.map_err(|_| ConsumerClosed) })
    }
}

/// Message from the worker to the forwarder.
#[derive(Debug)]
pub enum BridgeMessage {
    /// Progress to relay.
    Event(ProgressEvent),
    /// Sentinel: no further messages follow.
    Finished(Result<DigestDocument, SessionError>),
}

/// How forwarding ended.
#[derive(Debug)]
pub enum ForwardOutcome {
    /// The digest was delivered.
    Completed,
    /// The failure was delivered as an error event.
    Failed(SessionError),
    /// The worker stopped on cancellation.
    Cancelled,
    /// The consumer went away; nothing more was delivered.
    Disconnected,
}

/// Drain acknowledgment returned by the forwarder.
#[derive(Debug)]
pub struct ForwardReport {
    /// Events the consumer accepted, terminal event included.
    pub delivered: usize,
    pub outcome: ForwardOutcome,
}

/// Spawn the forwarder task that owns `consumer`.
///
/// If the consumer fails, the forwarder cancels `token` and closes the
/// channel so the worker's next push fails and it stops at its next
/// checkpoint.
pub fn spawn_forwarder<C>(
    mut rx: mpsc::Receiver<BridgeMessage>,
    mut consumer: C,
    token: CancellationToken,
) -> JoinHandle<ForwardReport>
where
    C: EventConsumer + 'static,
{
    tokio::spawn(async move {
        let mut delivered = 0;

        loop {
            let (event, outcome) = match rx.recv().await {
                Some(BridgeMessage::Event(event)) => (event, None),
                Some(BridgeMessage::Finished(Ok(digest))) => (
                    ProgressEvent::Complete { digest },
                    Some(ForwardOutcome::Completed),
                ),
                Some(BridgeMessage::Finished(Err(SessionError::Cancelled))) => (
                    ProgressEvent::error("Digest cancelled"),
                    Some(ForwardOutcome::Cancelled),
                ),
                Some(BridgeMessage::Finished(Err(err))) => {
                    (ProgressEvent::error(err.to_string()), Some(ForwardOutcome::Failed(err)))
                }
                // All senders dropped without a sentinel.
                None => {
                    let err = SessionError::Worker {
                        message: "worker stopped without a result".to_string(),
                    };
                    (ProgressEvent::error(err.to_string()), Some(ForwardOutcome::Failed(err)))
                }
            };

            if consumer.send(event).await.is_err() {
                tracing::info!(delivered, "Event consumer closed, cancelling digest");
                token.cancel();
                rx.close();
                return ForwardReport {
                    delivered,
                    outcome: ForwardOutcome::Disconnected,
                };
            }
            delivered += 1;

            if let Some(outcome) = outcome {
                tracing::debug!(delivered, ?outcome, "Forwarder drained");
                return ForwardReport { delivered, outcome };
            }
        }
    })
}

/// [`ProgressSink`] used by the blocking worker.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<BridgeMessage>,
    token: CancellationToken,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BridgeMessage>, token: CancellationToken) -> Self {
        Self { tx, token }
    }

    /// Push the sentinel. Must be called from a blocking context.
    pub fn finish(self, result: Result<DigestDocument, SessionError>) {
        if self.tx.blocking_send(BridgeMessage::Finished(result)).is_err() {
            tracing::debug!("Forwarder gone, dropping digest result");
        }
    }
}

impl ProgressSink for ChannelSink {
    fn report(&mut self, message: &str, percentage: u8) {
        if self.token.is_cancelled() {
            return;
        }
        let event = ProgressEvent::progress(message, percentage);
        if self.tx.blocking_send(BridgeMessage::Event(event)).is_err() {
            self.token.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }
}
