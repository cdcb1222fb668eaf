//! In-process counters for message traffic and acknowledgment outcomes.
//! Read through [`snapshot`] by the console's `stats` command.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static BROADCASTS_SENT: AtomicU64 = AtomicU64::new(0);
static DIRECT_SENT: AtomicU64 = AtomicU64::new(0);
static DIRECT_DELIVERED: AtomicU64 = AtomicU64::new(0);
static DIRECT_UNCONFIRMED: AtomicU64 = AtomicU64::new(0);
static DIRECT_FAILED: AtomicU64 = AtomicU64::new(0);
static SEND_ERRORS: AtomicU64 = AtomicU64::new(0);
static ACKS_CONSUMED: AtomicU64 = AtomicU64::new(0);
static PACKETS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static FRAMES_UNDECODABLE: AtomicU64 = AtomicU64::new(0);
static ACK_LATENCY_SUM_MS: AtomicU64 = AtomicU64::new(0);
static ACK_LATENCY_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn inc_broadcasts_sent() {
    BROADCASTS_SENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_direct_sent() {
    DIRECT_SENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_direct_delivered() {
    DIRECT_DELIVERED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_direct_unconfirmed() {
    DIRECT_UNCONFIRMED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_direct_failed() {
    DIRECT_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_send_errors() {
    SEND_ERRORS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_acks_consumed() {
    ACKS_CONSUMED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_packets_received() {
    PACKETS_RECEIVED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_frames_undecodable() {
    FRAMES_UNDECODABLE.fetch_add(1, Ordering::Relaxed);
}
pub fn observe_ack_latency(elapsed: Duration) {
    ACK_LATENCY_SUM_MS.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    ACK_LATENCY_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub broadcasts_sent: u64,
    pub direct_sent: u64,
    pub direct_delivered: u64,
    pub direct_unconfirmed: u64,
    pub direct_failed: u64,
    pub send_errors: u64,
    pub acks_consumed: u64,
    pub packets_received: u64,
    pub frames_undecodable: u64,
    pub ack_latency_avg_ms: Option<u64>,
}

pub fn snapshot() -> Snapshot {
    let sum = ACK_LATENCY_SUM_MS.load(Ordering::Relaxed);
    let count = ACK_LATENCY_COUNT.load(Ordering::Relaxed);
    Snapshot {
        broadcasts_sent: BROADCASTS_SENT.load(Ordering::Relaxed),
        direct_sent: DIRECT_SENT.load(Ordering::Relaxed),
        direct_delivered: DIRECT_DELIVERED.load(Ordering::Relaxed),
        direct_unconfirmed: DIRECT_UNCONFIRMED.load(Ordering::Relaxed),
        direct_failed: DIRECT_FAILED.load(Ordering::Relaxed),
        send_errors: SEND_ERRORS.load(Ordering::Relaxed),
        acks_consumed: ACKS_CONSUMED.load(Ordering::Relaxed),
        packets_received: PACKETS_RECEIVED.load(Ordering::Relaxed),
        frames_undecodable: FRAMES_UNDECODABLE.load(Ordering::Relaxed),
        ack_latency_avg_ms: if count > 0 { Some(sum / count) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_grow() {
        let before = snapshot();
        inc_direct_sent();
        inc_direct_delivered();
        observe_ack_latency(Duration::from_millis(40));
        let after = snapshot();
        assert!(after.direct_sent > before.direct_sent);
        assert!(after.direct_delivered > before.direct_delivered);
        assert!(after.ack_latency_avg_ms.is_some());
    }
}
