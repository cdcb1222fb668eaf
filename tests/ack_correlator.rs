//! Acknowledgment correlator behaviour against mixed event streams.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{routing_event, text_event};
use meshconsole::console::{spawn_event_pump, AckCorrelator, AckStatus};
use meshconsole::meshtastic::MeshEvent;
use tokio::sync::mpsc;

fn mixed_stream() -> Vec<MeshEvent> {
    vec![
        text_event("!aaaaaaaa", "^all", "hello"),
        routing_event("!aaaaaaaa", Some("NONE")),
        routing_event("!bbbbbbbb", Some("NO_ROUTE")),
        routing_event("!cccccccc", None),
        text_event("!bbbbbbbb", "!00000001", "direct"),
        routing_event("!aaaaaaaa", Some("MAX_RETRANSMIT")),
    ]
}

#[test]
fn unarmed_observe_consumes_nothing() {
    let c = AckCorrelator::new();
    for event in mixed_stream() {
        assert!(!c.observe(&event), "consumed {:?} while unarmed", event);
    }
    assert!(!c.is_armed());
    assert_eq!(c.disarm(), AckStatus::Unknown);
}

#[test]
fn armed_match_is_consumed_once() {
    let c = AckCorrelator::new();
    c.arm("!aaaaaaaa").unwrap();
    let consumed: Vec<bool> = mixed_stream().iter().map(|e| c.observe(e)).collect();
    assert_eq!(consumed, vec![false, true, false, false, false, false]);
    // The later MAX_RETRANSMIT from the same node does not overwrite the first result
    assert_eq!(c.disarm(), AckStatus::Reason("NONE".into()));

    c.arm("!aaaaaaaa").unwrap();
    assert!(c.observe(&routing_event("!aaaaaaaa", Some("MAX_RETRANSMIT"))));
    assert_eq!(c.disarm(), AckStatus::Reason("MAX_RETRANSMIT".into()));
}

#[test]
fn other_sources_pass_through() {
    let c = AckCorrelator::new();
    c.arm("!aaaaaaaa").unwrap();
    assert!(!c.observe(&routing_event("!bbbbbbbb", Some("NONE"))));
    assert!(!c.observe(&routing_event("!aaaaaaab", Some("NONE"))));
    assert!(!c.observe(&text_event("!aaaaaaaa", "!00000001", "not a routing reply")));
    assert!(c.is_armed());
    assert_eq!(c.disarm(), AckStatus::Unknown);
}

#[test]
fn disarm_returns_reason_verbatim() {
    for reason in ["NONE", "NO_RESPONSE", "NO_ROUTE", "ERROR_99"] {
        let c = AckCorrelator::new();
        c.arm("!cccccccc").unwrap();
        assert!(c.observe(&routing_event("!cccccccc", Some(reason))));
        assert_eq!(c.disarm(), AckStatus::Reason(reason.to_string()));
    }
}

#[test]
fn disarmed_correlator_ignores_late_reply() {
    let c = AckCorrelator::new();
    c.arm("!aaaaaaaa").unwrap();
    assert_eq!(c.disarm(), AckStatus::Unknown);
    assert!(!c.observe(&routing_event("!aaaaaaaa", Some("NONE"))));
}

#[tokio::test(start_paused = true)]
async fn wait_times_out_without_reply() {
    let c = AckCorrelator::new();
    c.arm("!bbbbbbbb").unwrap();
    let started = tokio::time::Instant::now();
    assert!(!c.wait(Duration::from_secs(15)).await);
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert_eq!(c.disarm(), AckStatus::Unknown);
}

#[tokio::test(start_paused = true)]
async fn wait_wakes_on_delayed_reply() {
    let c = Arc::new(AckCorrelator::new());
    c.arm("!aaaaaaaa").unwrap();
    let feeder = {
        let c = c.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            c.observe(&routing_event("!aaaaaaaa", Some("NONE")))
        })
    };
    let started = tokio::time::Instant::now();
    assert!(c.wait(Duration::from_secs(15)).await);
    assert!(started.elapsed() < Duration::from_secs(15));
    assert!(feeder.await.unwrap());
    assert_eq!(c.disarm(), AckStatus::Reason("NONE".into()));
}

#[tokio::test]
async fn reply_before_wait_is_not_lost() {
    let c = AckCorrelator::new();
    c.arm("!aaaaaaaa").unwrap();
    assert!(c.observe(&routing_event("!aaaaaaaa", Some("GOT_NAK"))));
    assert!(c.wait(Duration::from_millis(10)).await);
    assert_eq!(c.disarm(), AckStatus::Reason("GOT_NAK".into()));
}

#[tokio::test(start_paused = true)]
async fn close_releases_waiter() {
    let c = Arc::new(AckCorrelator::new());
    c.arm("!aaaaaaaa").unwrap();
    let waiter = {
        let c = c.clone();
        tokio::spawn(async move { c.wait(Duration::from_secs(3600)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    c.close();
    assert!(!waiter.await.unwrap());
    assert!(c.is_closed());
}

#[tokio::test]
async fn pump_forwards_everything_but_the_awaited_reply() {
    let c = Arc::new(AckCorrelator::new());
    c.arm("!aaaaaaaa").unwrap();
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let (mut display, pump) = spawn_event_pump(feed_rx, c.clone());

    for event in mixed_stream() {
        feed_tx.send(event).unwrap();
    }
    drop(feed_tx);
    pump.await.unwrap();

    let mut shown = Vec::new();
    while let Some(event) = display.recv().await {
        shown.push(event);
    }
    let expected: Vec<MeshEvent> = mixed_stream()
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, e)| e)
        .collect();
    assert_eq!(shown, expected);
    assert_eq!(c.disarm(), AckStatus::Reason("NONE".into()));
    // Feed closed, so the correlator refuses further work
    assert!(c.is_closed());
}
