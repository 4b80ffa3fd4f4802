//! Session state machine integration tests
//!
//! Each test runs a real `Session` task against a scripted peer on a
//! loopback `TcpListener`, matching the concrete scenarios in
//! `SPEC_FULL.md` SS8 (S1-S3). Timers run on paused virtual time so
//! HoldTimer/ConnectRetry expiry tests are instant; pausing time does not
//! affect the loopback socket I/O these tests drive.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::*;
use crate::capability::CapabilitiesBuilder;
use crate::config::{NeighborConfig, SessionConfig};
use crate::{Message, NotificationErrorCode, Open, OpenMessageErrorSubcode};
use futures_util::{SinkExt, StreamExt};
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::TcpListener;
use tokio_util::codec::{FramedRead, FramedWrite};

async fn loopback_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn accept_framed(
    listener: &TcpListener,
) -> (FramedRead<tokio::net::tcp::OwnedReadHalf, Codec>, FramedWrite<tokio::net::tcp::OwnedWriteHalf, Codec>) {
    let (stream, _) = listener.accept().await.unwrap();
    let (rx, tx): (tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf) = stream.into_split();
    (FramedRead::new(rx, Codec), FramedWrite::new(tx, Codec))
}

fn session_config(port: u16) -> SessionConfig {
    SessionConfig {
        local_asn: 64500,
        local_bgp_id: Ipv4Addr::new(198, 51, 100, 1),
        port,
    }
}

/// Drain events until `pred` matches one, asserting every prior event's
/// `EventKind` is `StateTransition`. Fails the test if the channel closes
/// first.
async fn until(events: &mut mpsc::Receiver<Event>, pred: impl Fn(&EventKind) -> bool) -> EventKind {
    loop {
        let event = events.recv().await.expect("event sink closed early");
        if pred(&event.kind) {
            return event.kind;
        }
    }
}

fn is_state(kind: &EventKind, state: State) -> bool {
    matches!(kind, EventKind::StateTransition(s) if *s == state)
}

#[tokio::test(start_paused = true)]
async fn test_open_handshake_succeeds() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    let (mut peer_rx, mut peer_tx) = accept_framed(&listener).await;

    let Some(Ok(Message::Open(open))) = peer_rx.next().await else {
        panic!("expected OPEN from speaker");
    };
    assert_eq!(open.version, 4);
    assert_eq!(open.hold_time, 3);

    let caps = CapabilitiesBuilder::new().mp_bgp_ls().build();
    let peer_open = Open::new_easy(64512, 3, Ipv4Addr::new(203, 0, 113, 1), caps);
    peer_tx.send(Message::Open(peer_open)).await.unwrap();

    let Some(Ok(Message::Keepalive)) = peer_rx.next().await else {
        panic!("expected KEEPALIVE after peer OPEN");
    };
    peer_tx.send(Message::Keepalive).await.unwrap();

    assert!(is_state(
        &until(&mut events_rx, |k| is_state(k, State::Idle)).await,
        State::Idle
    ));
    assert!(is_state(
        &until(&mut events_rx, |k| is_state(k, State::Connect)).await,
        State::Connect
    ));
    assert!(is_state(
        &until(&mut events_rx, |k| is_state(k, State::OpenSent)).await,
        State::OpenSent
    ));
    assert!(is_state(
        &until(&mut events_rx, |k| is_state(k, State::OpenConfirm)).await,
        State::OpenConfirm
    ));
    assert!(is_state(
        &until(&mut events_rx, |k| is_state(k, State::Established)).await,
        State::Established
    ));

    handle.disable();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_peer_as_mismatch_sends_notification() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    let (mut peer_rx, mut peer_tx) = accept_framed(&listener).await;
    let Some(Ok(Message::Open(_))) = peer_rx.next().await else {
        panic!("expected OPEN from speaker");
    };

    // Wrong ASN: configured peer is 64512.
    let caps = CapabilitiesBuilder::new().mp_bgp_ls().build();
    let bad_open = Open::new_easy(64513, 3, Ipv4Addr::new(203, 0, 113, 1), caps);
    peer_tx.send(Message::Open(bad_open)).await.unwrap();

    let Some(Ok(Message::Notification(notification))) = peer_rx.next().await else {
        panic!("expected NOTIFICATION from speaker");
    };
    assert_eq!(notification.error_code, NotificationErrorCode::OpenMessageError);
    assert_eq!(notification.error_subcode, OpenMessageErrorSubcode::BadPeerAs as u8);

    // Skip over the already-seen Idle/Connect/OpenSent transitions.
    until(&mut events_rx, |k| is_state(k, State::OpenSent)).await;
    let err = until(&mut events_rx, |k| matches!(k, EventKind::Err(_))).await;
    assert!(matches!(err, EventKind::Err(_)));
    let transition = until(&mut events_rx, |k| is_state(k, State::Idle) || is_state(k, State::Connect)).await;
    assert!(is_state(&transition, State::Idle));

    handle.disable();
    let _ = handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_message_in_open_sent() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    let (mut peer_rx, mut peer_tx) = accept_framed(&listener).await;
    let Some(Ok(Message::Open(_))) = peer_rx.next().await else {
        panic!("expected OPEN from speaker");
    };

    // Peer sends KEEPALIVE before any OPEN -- unexpected in OpenSent.
    peer_tx.send(Message::Keepalive).await.unwrap();

    let Some(Ok(Message::Notification(notification))) = peer_rx.next().await else {
        panic!("expected NOTIFICATION from speaker");
    };
    assert_eq!(notification.error_code, NotificationErrorCode::MessageHeaderError);
    assert_eq!(notification.error_subcode, crate::MessageHeaderErrorSubcode::BadMessageType as u8);
    assert_eq!(notification.data, bytes::Bytes::from_static(&[4]));

    until(&mut events_rx, |k| is_state(k, State::OpenSent)).await;
    until(&mut events_rx, |k| matches!(k, EventKind::Err(_))).await;
    let transition = until(&mut events_rx, |k| is_state(k, State::Idle)).await;
    assert!(is_state(&transition, State::Idle));

    handle.disable();
    let _ = handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_hold_timer_expiry_tears_down_established() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    let (mut peer_rx, mut peer_tx) = accept_framed(&listener).await;
    let Some(Ok(Message::Open(_))) = peer_rx.next().await else {
        panic!("expected OPEN from speaker");
    };
    let caps = CapabilitiesBuilder::new().mp_bgp_ls().build();
    let peer_open = Open::new_easy(64512, 3, Ipv4Addr::new(203, 0, 113, 1), caps);
    peer_tx.send(Message::Open(peer_open)).await.unwrap();
    let Some(Ok(Message::Keepalive)) = peer_rx.next().await else {
        panic!("expected KEEPALIVE from speaker");
    };
    peer_tx.send(Message::Keepalive).await.unwrap();

    until(&mut events_rx, |k| is_state(k, State::Established)).await;

    // Peer goes silent; advance virtual time past the negotiated 3s Hold.
    tokio::time::advance(std::time::Duration::from_secs(4)).await;

    let Some(Ok(Message::Notification(notification))) = peer_rx.next().await else {
        panic!("expected HoldTimerExpired NOTIFICATION");
    };
    assert_eq!(notification.error_code, NotificationErrorCode::HoldTimerExpired);
    assert_eq!(notification.error_subcode, 0);

    until(&mut events_rx, |k| matches!(k, EventKind::HoldTimerExpired)).await;
    let transition = until(&mut events_rx, |k| is_state(k, State::Idle)).await;
    assert!(is_state(&transition, State::Idle));

    handle.disable();
    let _ = handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_disable_before_open_sends_no_cease() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    until(&mut events_rx, |k| is_state(k, State::Connect)).await;
    handle.disable();
    handle.join().await.unwrap();

    drop(listener);
}

#[tokio::test(start_paused = true)]
async fn test_disable_after_established_sends_cease() {
    let (listener, port) = loopback_listener().await;
    let neighbor = NeighborConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64512, 3).unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let handle = spawn(neighbor, session_config(port), events_tx);

    let (mut peer_rx, mut peer_tx) = accept_framed(&listener).await;
    let Some(Ok(Message::Open(_))) = peer_rx.next().await else {
        panic!("expected OPEN from speaker");
    };
    let caps = CapabilitiesBuilder::new().mp_bgp_ls().build();
    let peer_open = Open::new_easy(64512, 3, Ipv4Addr::new(203, 0, 113, 1), caps);
    peer_tx.send(Message::Open(peer_open)).await.unwrap();
    let Some(Ok(Message::Keepalive)) = peer_rx.next().await else {
        panic!("expected KEEPALIVE from speaker");
    };
    peer_tx.send(Message::Keepalive).await.unwrap();
    until(&mut events_rx, |k| is_state(k, State::Established)).await;

    handle.disable();

    let Some(Ok(Message::Notification(notification))) = peer_rx.next().await else {
        panic!("expected CEASE NOTIFICATION on disable");
    };
    assert_eq!(notification.error_code, NotificationErrorCode::Cease);

    handle.join().await.unwrap();
}

#[test]
fn test_keepalive_derivation_matches_hold() {
    assert_eq!(timer::keepalive_time(3), std::time::Duration::from_secs(1));
    assert_eq!(timer::keepalive_time(90), std::time::Duration::from_secs(30));
}
