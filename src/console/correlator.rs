//! Acknowledgment correlator.
//!
//! Pairs one outstanding direct message with the routing reply that reports
//! its fate. The send path arms it with the destination id right before
//! transmitting, waits, then disarms to collect the result. The event pump
//! offers every inbound event through [`AckCorrelator::observe`]; the one
//! routing reply from the armed destination is consumed there and never
//! reaches the display.
//!
//! Only one expectation exists at a time. Callers serialise arm..disarm
//! themselves (see `DirectMessenger`). Each `arm` creates a fresh oneshot
//! pair: `observe` fires the sender, `wait` holds the receiver, and `close`
//! drops the sender so a pending wait returns at once.
use log::{debug, trace};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

use super::errors::ConsoleError;
use crate::meshtastic::MeshEvent;
use crate::metrics;

/// Routing result recorded for the armed destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AckStatus {
    /// No routing reply arrived.
    #[default]
    Unknown,
    /// Upstream routing error name; `"NONE"` means delivered.
    Reason(String),
}

impl AckStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AckStatus::Reason(r) if r == "NONE")
    }
}

#[derive(Debug, Default)]
struct Pending {
    expected: Option<String>,
    result: AckStatus,
    ready: bool,
    closed: bool,
    reply_tx: Option<oneshot::Sender<()>>,
    reply_rx: Option<oneshot::Receiver<()>>,
}

#[derive(Debug, Default)]
pub struct AckCorrelator {
    state: Mutex<Pending>,
}

impl AckCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start expecting a routing reply from `source_id`. Fails once closed.
    pub fn arm(&self, source_id: &str) -> Result<(), ConsoleError> {
        let mut st = self.lock();
        if st.closed {
            return Err(ConsoleError::ShuttingDown);
        }
        let (tx, rx) = oneshot::channel();
        st.expected = Some(source_id.to_string());
        st.result = AckStatus::Unknown;
        st.ready = false;
        st.reply_tx = Some(tx);
        st.reply_rx = Some(rx);
        trace!("ack correlator armed for {}", source_id);
        Ok(())
    }

    /// Offer an inbound event. Returns `true` when it was the awaited routing
    /// reply; the caller must then not display it.
    pub fn observe(&self, event: &MeshEvent) -> bool {
        let Some(reason) = event.routing_reason() else {
            return false;
        };
        let mut st = self.lock();
        if st.ready || st.expected.as_deref() != Some(event.source_id.as_str()) {
            return false;
        }
        st.result = AckStatus::Reason(reason.to_string());
        st.ready = true;
        if let Some(tx) = st.reply_tx.take() {
            let _ = tx.send(());
        }
        drop(st);
        debug!("routing reply from {}: {}", event.source_id, reason);
        metrics::inc_acks_consumed();
        true
    }

    /// Wait up to `limit` for the armed reply. Returns `true` if it arrived,
    /// `false` on timeout or when the correlator is closed. Returns at once
    /// when nothing is armed.
    pub async fn wait(&self, limit: Duration) -> bool {
        let taken = self.lock().reply_rx.take();
        let Some(mut rx) = taken else {
            return self.lock().ready;
        };
        match tokio::time::timeout(limit, &mut rx).await {
            Ok(Ok(())) => true,
            // Sender dropped: closed or disarmed
            Ok(Err(_)) => self.lock().ready,
            Err(_) => {
                let mut st = self.lock();
                // Keep the receiver so a later wait on the same expectation still works
                if st.expected.is_some() && st.reply_rx.is_none() {
                    st.reply_rx = Some(rx);
                }
                st.ready
            }
        }
    }

    /// Stop expecting and return whatever was recorded since the last `arm`.
    pub fn disarm(&self) -> AckStatus {
        let mut st = self.lock();
        st.expected = None;
        st.reply_tx = None;
        st.reply_rx = None;
        st.result.clone()
    }

    pub fn is_armed(&self) -> bool {
        self.lock().expected.is_some()
    }

    /// Source id of the current expectation, if any.
    pub fn armed_for(&self) -> Option<String> {
        self.lock().expected.clone()
    }

    /// Release any waiter and refuse further arming.
    pub fn close(&self) {
        let mut st = self.lock();
        st.closed = true;
        st.reply_tx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshtastic::{EventPayload, PortKind};

    fn routing(from: &str, reason: Option<&str>) -> MeshEvent {
        MeshEvent {
            source_id: from.to_string(),
            destination_id: "!00000001".to_string(),
            channel: 0,
            port: PortKind::Routing,
            payload: EventPayload::Routing {
                error_reason: reason.map(str::to_string),
            },
            packet_id: 1,
            rx_snr: None,
            rx_time: None,
        }
    }

    #[test]
    fn status_success_only_for_none() {
        assert!(AckStatus::Reason("NONE".into()).is_success());
        assert!(!AckStatus::Reason("NO_ROUTE".into()).is_success());
        assert!(!AckStatus::Unknown.is_success());
    }

    #[test]
    fn route_discovery_does_not_match() {
        let c = AckCorrelator::new();
        c.arm("!0000beef").unwrap();
        assert!(!c.observe(&routing("!0000beef", None)));
        assert_eq!(c.disarm(), AckStatus::Unknown);
    }

    #[test]
    fn disarm_is_idempotent() {
        let c = AckCorrelator::new();
        c.arm("!0000beef").unwrap();
        assert!(c.observe(&routing("!0000beef", Some("NONE"))));
        assert_eq!(c.disarm(), AckStatus::Reason("NONE".into()));
        assert_eq!(c.disarm(), AckStatus::Reason("NONE".into()));
        assert!(!c.is_armed());
    }

    #[tokio::test]
    async fn arm_after_close_fails() {
        let c = AckCorrelator::new();
        c.close();
        assert!(matches!(c.arm("!00000002"), Err(ConsoleError::ShuttingDown)));
        assert!(!c.wait(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_starts_from_a_fresh_channel() {
        let c = AckCorrelator::new();
        c.arm("!0000beef").unwrap();
        assert!(c.observe(&routing("!0000beef", Some("NONE"))));
        c.disarm();

        c.arm("!0000beef").unwrap();
        assert_eq!(c.armed_for().as_deref(), Some("!0000beef"));
        assert!(!c.wait(Duration::from_secs(15)).await);
        // Receiver is kept after a timeout, so a late reply still wakes a second wait
        assert!(c.observe(&routing("!0000beef", Some("GOT_NAK"))));
        assert!(c.wait(Duration::from_secs(1)).await);
        assert_eq!(c.disarm(), AckStatus::Reason("GOT_NAK".into()));
    }
}
