//! Direct messages with delivery confirmation, and plain broadcasts.
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use super::correlator::{AckCorrelator, AckStatus};
use super::errors::ConsoleError;
use crate::meshtastic::TextSender;
use crate::metrics;

/// What became of an acknowledged direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The destination confirmed receipt.
    Delivered,
    /// No routing reply within the acknowledgment timeout.
    Unconfirmed,
    /// The mesh reported a failure; `reason` is the upstream error name.
    Failed { reason: String },
}

impl From<AckStatus> for DeliveryOutcome {
    fn from(status: AckStatus) -> Self {
        match status {
            AckStatus::Unknown => DeliveryOutcome::Unconfirmed,
            AckStatus::Reason(r) if r == "NONE" => DeliveryOutcome::Delivered,
            AckStatus::Reason(reason) => DeliveryOutcome::Failed { reason },
        }
    }
}

/// Sends text through a [`TextSender`] and, for direct messages, waits on the
/// shared [`AckCorrelator`] for the routing reply.
pub struct DirectMessenger<S: TextSender> {
    sender: Arc<S>,
    correlator: Arc<AckCorrelator>,
    // Held for the whole arm..disarm sequence; one direct message in flight at a time.
    turn: AsyncMutex<()>,
    ack_timeout: Duration,
}

impl<S: TextSender> DirectMessenger<S> {
    pub fn new(sender: Arc<S>, correlator: Arc<AckCorrelator>, ack_timeout: Duration) -> Self {
        Self {
            sender,
            correlator,
            turn: AsyncMutex::new(()),
            ack_timeout,
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    pub fn correlator(&self) -> &Arc<AckCorrelator> {
        &self.correlator
    }

    /// Send `text` to `destination` (`!xxxxxxxx`) with an acknowledgment
    /// request and wait for the verdict. Concurrent calls queue behind each other.
    pub async fn send_and_wait(
        &self,
        destination: &str,
        text: &str,
    ) -> Result<DeliveryOutcome, ConsoleError> {
        let _turn = self.turn.lock().await;

        self.correlator.arm(destination)?;
        let started = Instant::now();
        if let Err(e) = self.sender.send_direct(text, destination, true) {
            self.correlator.disarm();
            metrics::inc_send_errors();
            warn!("Direct message to {} not sent: {:#}", destination, e);
            return Err(ConsoleError::Transport(e));
        }
        metrics::inc_direct_sent();
        debug!(
            "Direct message to {} sent; waiting up to {:?} for acknowledgment",
            destination, self.ack_timeout
        );

        let signalled = self.correlator.wait(self.ack_timeout).await;
        let status = self.correlator.disarm();
        if !signalled && status == AckStatus::Unknown && self.correlator.is_closed() {
            return Err(ConsoleError::ShuttingDown);
        }

        let outcome = DeliveryOutcome::from(status);
        match &outcome {
            DeliveryOutcome::Delivered => {
                metrics::inc_direct_delivered();
                metrics::observe_ack_latency(started.elapsed());
                info!("Direct message to {} delivered", destination);
            }
            DeliveryOutcome::Unconfirmed => {
                metrics::inc_direct_unconfirmed();
                info!("Direct message to {} not acknowledged in time", destination);
            }
            DeliveryOutcome::Failed { reason } => {
                metrics::inc_direct_failed();
                info!("Direct message to {} failed: {}", destination, reason);
            }
        }
        Ok(outcome)
    }

    /// Fire-and-forget broadcast on `channel`.
    pub fn broadcast(&self, text: &str, channel: u32) -> Result<u32, ConsoleError> {
        match self.sender.send_broadcast(text, channel) {
            Ok(id) => {
                metrics::inc_broadcasts_sent();
                Ok(id)
            }
            Err(e) => {
                metrics::inc_send_errors();
                Err(ConsoleError::Transport(e))
            }
        }
    }
}
