//! Liveness probes on open connections.

use std::time::Duration;

use tether::{Client, CloseReason, ConnectionState, Payload};
use tether_testing::{Recorded, TEST_DELAY, settle, scripted};
use tokio::time::advance;

mod common;
use common::Harness;

const INTERVAL: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn probe_is_sent_after_an_idle_interval() {
    let mut h = Harness::with_heartbeat(5, INTERVAL);
    h.client.connect();
    let mut peer = h.accept_next().await;

    advance(Duration::from_secs(29)).await;
    settle().await;
    assert_eq!(peer.try_next_sent(), None);

    advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(peer.try_next_sent(), Some(Payload::from("ping")));
    assert_eq!(peer.try_next_sent(), None);
}

#[tokio::test(start_paused = true)]
async fn inbound_traffic_defers_the_probe() {
    let mut h = Harness::with_heartbeat(5, INTERVAL);
    h.client.connect();
    let mut peer = h.accept_next().await;

    advance(Duration::from_secs(20)).await;
    peer.push("data");
    settle().await;

    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(peer.try_next_sent(), None, "no probe within 30s of traffic");

    advance(Duration::from_secs(21)).await;
    settle().await;
    assert_eq!(peer.try_next_sent(), Some(Payload::from("ping")));
    assert_eq!(
        h.log.count(|entry| matches!(entry, Recorded::Message(_))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn probes_stop_once_closed() {
    let mut h = Harness::with_heartbeat(5, INTERVAL);
    h.client.connect();
    let mut peer = h.accept_next().await;

    h.client.close();
    h.wait_for(ConnectionState::Closed).await;
    advance(INTERVAL * 4).await;
    settle().await;

    assert_eq!(peer.try_next_sent(), None);
}

#[tokio::test(start_paused = true)]
async fn custom_probe_payload_is_used() {
    let (connector, mut attempts) = scripted();
    let client = Client::builder("mem://probe")
        .heartbeat_interval(INTERVAL)
        .heartbeat_payload(vec![0x9_u8])
        .reconnect_delay(TEST_DELAY)
        .build(connector);
    client.connect();
    let mut peer = attempts.next_attempt().await.expect("attempt").accept();
    client.wait_for_state(|state| state == ConnectionState::Open).await;

    advance(INTERVAL + Duration::from_millis(5)).await;
    settle().await;

    assert_eq!(peer.try_next_sent(), Some(Payload::from(vec![0x9_u8])));
}

#[tokio::test(start_paused = true)]
async fn failed_probe_is_reported() {
    let mut h = Harness::with_heartbeat(5, INTERVAL);
    h.client.connect();
    let peer = h.accept_next().await;

    peer.fail_sends();
    advance(INTERVAL + Duration::from_millis(5)).await;
    settle().await;

    assert_eq!(
        h.log.count(|entry| matches!(entry, Recorded::Error(message) if message == "failed to send heartbeat")),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_probe_drops_the_link() {
    let mut h = Harness::with_heartbeat(5, INTERVAL);
    h.client.connect();
    let peer = h.accept_next().await;

    peer.stall_sends();
    advance(INTERVAL + Duration::from_millis(5)).await;
    h.wait_for(ConnectionState::Closed).await;

    assert_eq!(
        h.log.count(|entry| matches!(entry, Recorded::Error(message) if message == "failed to send heartbeat")),
        1
    );
    assert!(h.log.entries().contains(&Recorded::Close(CloseReason::new(
        None,
        "write timed out after 10s"
    ))));
    assert!(h.attempts.next_attempt().await.is_some(), "a lost link is retried");
}

