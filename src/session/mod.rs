//! Session state machine (SSM)
//!
//! Drives one neighbor from [`State::Idle`] through connection establishment,
//! OPEN negotiation, and liveness maintenance, to [`State::Established`], and
//! back down again on any error or external disable. `Session` itself is not
//! `Clone`-able or shareable: it owns the connection outright and is driven
//! to completion by a single `tokio::spawn`ed task (see [`spawn`]). Callers
//! interact with it only through the returned [`SessionHandle`] and the
//! `events` channel supplied to [`spawn`].
//!
//! The state machine is written as one async function per state
//! (`step_idle`, `step_connect`, ...), each returning the next [`State`] to
//! enter; [`Session::apply`] performs the entry actions common to arriving
//! at a state (publishing the `StateTransition` event, tearing the
//! connection down on `Idle`, arming the Keepalive timer on `Established`)
//! so individual `step_*` functions only need to describe what makes them
//! *leave*.

// SPDX-License-Identifier: AGPL-3.0-or-later

mod dialer;
mod event;
mod reader;
mod timer;

pub use event::{Event, EventKind, State};
pub use reader::ReaderError;

use crate::capability::CapabilitiesBuilder;
use crate::config::{NeighborConfig, SessionConfig};
use crate::open;
use crate::{Codec, Message, MessageHeaderErrorSubcode, Notification, NotificationErrorCode, Open};
use bytes::Bytes;
use dialer::Dialer;
use futures_util::SinkExt;
use reader::{ReaderEvent, ReaderHandle};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;

/// Handle to a running session task.
///
/// Dropping this without calling [`SessionHandle::disable`] does not stop
/// the session (the task keeps running against its neighbor); drop the
/// disable sender only once the session has been asked to shut down, or
/// leak it intentionally for a session meant to run for the program's
/// lifetime.
#[derive(Debug)]
pub struct SessionHandle {
    disable: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    /// Ask the session to shut down: a CEASE is sent if a connection in a
    /// state that already exchanged OPEN is owned, every resource is torn
    /// down, and the session settles in [`State::Disabled`]. A second call
    /// is a no-op.
    pub fn disable(&self) {
        let _ = self.disable.send(true);
    }

    /// Wait for the session task to finish.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.join.await
    }
}

/// Spawn a session task for `neighbor`, using `session_cfg` for the
/// session-global local identity and port, publishing every [`Event`] onto
/// `events`.
#[must_use]
pub fn spawn(
    neighbor: NeighborConfig,
    session_cfg: SessionConfig,
    events: mpsc::Sender<Event>,
) -> SessionHandle {
    let (disable_tx, disable_rx) = watch::channel(false);
    let session = Session {
        neighbor,
        session_cfg,
        state: State::Idle,
        events,
        disable: disable_rx,
        connect_retry: timer::Timer::new(),
        hold: timer::Timer::new(),
        keepalive: timer::Timer::new(),
        negotiated_hold: 0,
        write: None,
        reader: None,
        dialer: None,
        sent_open: false,
    };
    let join = tokio::spawn(session.run());
    SessionHandle {
        disable: disable_tx,
        join,
    }
}

/// What a `step_*` function decided should happen next.
enum Next {
    State(State),
    Disabled,
}

/// The session state machine itself. Single-writer on every field; nothing
/// here is shared with the reader task except through the channels in
/// [`ReaderHandle`].
struct Session {
    neighbor: NeighborConfig,
    session_cfg: SessionConfig,
    state: State,
    events: mpsc::Sender<Event>,
    disable: watch::Receiver<bool>,
    connect_retry: timer::Timer,
    hold: timer::Timer,
    keepalive: timer::Timer,
    /// HoldTime negotiated at OPEN exchange; `0` means liveness is disabled
    /// for this connection.
    negotiated_hold: u16,
    write: Option<FramedWrite<tokio::net::tcp::OwnedWriteHalf, Codec>>,
    reader: Option<ReaderHandle>,
    dialer: Option<Dialer>,
    /// Whether OPEN has been sent on the current connection. Disabling the
    /// session sends CEASE only when this is true (RFC 4271 does not expect
    /// a CEASE before a session has identified itself to the peer).
    sent_open: bool,
}

/// Wait for the disable signal to fire. A dropped sender (the
/// [`SessionHandle`] was dropped without disabling) is treated the same as
/// an explicit disable, so a session never hangs waiting on a signal nobody
/// can send again.
async fn disable_fired(disable: &mut watch::Receiver<bool>) -> bool {
    match disable.changed().await {
        Ok(()) => *disable.borrow(),
        Err(_) => true,
    }
}

impl Session {
    async fn run(mut self) {
        if !self.apply(Next::State(State::Idle)).await {
            return;
        }
        loop {
            let next = match self.state {
                State::Idle => self.step_idle().await,
                State::Connect => self.step_connect().await,
                State::Active => self.step_active().await,
                State::OpenSent => self.step_open_sent().await,
                State::OpenConfirm => self.step_open_confirm().await,
                State::Established => self.step_established().await,
                State::Disabled => unreachable!("run loop must exit before re-entering Disabled"),
            };
            if !self.apply(next).await {
                return;
            }
        }
    }

    /// Apply a `step_*` function's decision: publish the transition (unless
    /// `Disabled`, which is never published, per `SPEC_FULL.md` SS4.6), run
    /// the entry action for the new state, and report whether the run loop
    /// should continue.
    async fn apply(&mut self, next: Next) -> bool {
        match next {
            Next::Disabled => {
                if self.sent_open {
                    self.send_notification(Notification::cease(open::administrative_cease()))
                        .await;
                }
                if let Some(dialer) = self.dialer.take() {
                    dialer.abort();
                    let _ = dialer.recv().await;
                }
                self.teardown_connection().await;
                self.connect_retry.stop();
                self.state = State::Disabled;
                false
            }
            Next::State(state) => {
                self.state = state;
                self.publish(EventKind::StateTransition(state)).await;
                match state {
                    State::Idle => self.teardown_connection().await,
                    State::Established => self.arm_keepalive(),
                    State::Connect | State::Active | State::OpenSent | State::OpenConfirm => {}
                    State::Disabled => unreachable!("Disabled is never reached via Next::State"),
                }
                true
            }
        }
    }

    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::new(self.neighbor.address, self.session_cfg.port)
    }

    fn build_local_open(&self) -> Open {
        let capabilities = CapabilitiesBuilder::new()
            .mp_bgp_ls()
            .four_octet_as_number_if_needed(self.session_cfg.local_asn)
            .build();
        Open::new_easy(
            self.session_cfg.local_asn,
            self.neighbor.hold_time,
            self.session_cfg.local_bgp_id,
            capabilities,
        )
    }

    async fn send(&mut self, msg: Message) -> std::io::Result<()> {
        let write = self
            .write
            .as_mut()
            .expect("send called without an owned connection");
        write.send(msg).await
    }

    /// Best-effort NOTIFICATION send: failures are logged, not propagated,
    /// since by the time we decide to notify, the socket may already be
    /// dead -- there is nothing further to do about it.
    async fn send_notification(&mut self, notification: Notification) {
        if self.write.is_none() {
            return;
        }
        if let Err(e) = self.send(Message::Notification(notification)).await {
            log::debug!("failed to send NOTIFICATION: {e}");
        }
    }

    async fn send_bad_type_notification(&mut self, type_byte: u8) {
        self.send_notification(Notification::new(
            NotificationErrorCode::MessageHeaderError,
            MessageHeaderErrorSubcode::BadMessageType as u8,
            Bytes::copy_from_slice(&[type_byte]),
        ))
        .await;
    }

    async fn send_hold_timer_expired_notification(&mut self) {
        self.send_notification(Notification::new(
            NotificationErrorCode::HoldTimerExpired,
            0,
            Bytes::new(),
        ))
        .await;
    }

    /// Send a NOTIFICATION for a reader failure's wire `{code, subcode,
    /// data}` triple, when it has one (SS7 class 1: a deserialization error).
    /// Returns whether a triple was found and sent; `false` means this was a
    /// local/socket failure (SS7 class 2) with nothing to notify the peer
    /// about.
    async fn notify_reader_failure(&mut self, e: &ReaderError) -> bool {
        let triple = match e {
            ReaderError::Codec(err) => err.notification_triple(),
            ReaderError::Eof => None,
        };
        match triple {
            Some((code, subcode, data)) => {
                self.send_notification(Notification::new(code, subcode, data))
                    .await;
                true
            }
            None => false,
        }
    }

    async fn publish(&mut self, kind: EventKind) {
        let event = Event::new(&self.neighbor, kind);
        if self.events.send(event).await.is_err() {
            log::warn!("event sink dropped; no further events will be delivered");
        }
    }

    /// Reset the HoldTimer to the negotiated value (or disarm it, when
    /// liveness is disabled), draining and rearming in one step.
    fn reset_hold(&mut self) {
        if self.negotiated_hold == 0 {
            self.hold.stop();
        } else {
            self.hold.reset(Duration::from_secs(u64::from(self.negotiated_hold)));
        }
    }

    fn arm_keepalive(&mut self) {
        if self.negotiated_hold == 0 {
            self.keepalive.stop();
        } else {
            self.keepalive.reset(timer::keepalive_time(self.negotiated_hold));
        }
    }

    /// Close the connection, shut the reader down, and disarm the
    /// liveness timers. The only path that closes the connection and
    /// reader; called exactly once per connection's lifetime.
    async fn teardown_connection(&mut self) {
        self.write = None;
        if let Some(reader) = self.reader.take() {
            reader.shutdown().await;
        }
        self.hold.stop();
        self.keepalive.stop();
        self.negotiated_hold = 0;
        self.sent_open = false;
    }

    // -- Idle --------------------------------------------------------

    async fn step_idle(&mut self) -> Next {
        if *self.disable.borrow() {
            return Next::Disabled;
        }
        Next::State(State::Connect)
    }

    // -- Connect -------------------------------------------------------

    async fn step_connect(&mut self) -> Next {
        if self.dialer.is_none() {
            self.connect_retry.reset(timer::CONNECT_RETRY);
            self.dialer = Some(Dialer::spawn(self.remote_addr()));
        }
        loop {
            tokio::select! {
                biased;
                fired = disable_fired(&mut self.disable) => {
                    if fired {
                        return Next::Disabled;
                    }
                    continue;
                }
                _ = self.connect_retry.tick(), if self.connect_retry.armed() => {
                    self.connect_retry.stop();
                    if let Some(dialer) = self.dialer.take() {
                        dialer.abort();
                        let _ = dialer.recv().await;
                    }
                    self.connect_retry.reset(timer::CONNECT_RETRY);
                    self.dialer = Some(Dialer::spawn(self.remote_addr()));
                    return Next::State(State::Connect);
                }
                result = self.dialer.as_mut().expect("dialer armed in Connect").result_mut() => {
                    self.connect_retry.stop();
                    self.dialer = None;
                    match result {
                        Ok(Ok(stream)) => {
                            return if self.on_dial_success(stream).await {
                                Next::State(State::OpenSent)
                            } else {
                                Next::State(State::Idle)
                            };
                        }
                        Ok(Err(e)) => {
                            self.publish(EventKind::Err(format!("dial to {} failed: {e}", self.remote_addr()))).await;
                            self.connect_retry.reset(timer::CONNECT_RETRY);
                            return Next::State(State::Active);
                        }
                        Err(_) => {
                            // Drained an aborted dial with nothing to act on.
                            self.connect_retry.reset(timer::CONNECT_RETRY);
                            self.dialer = Some(Dialer::spawn(self.remote_addr()));
                            continue;
                        }
                    }
                }
            }
        }
    }

    async fn on_dial_success(&mut self, stream: TcpStream) -> bool {
        let (read_half, write_half) = stream.into_split();
        self.reader = Some(reader::spawn(read_half));
        self.write = Some(FramedWrite::new(write_half, Codec));
        let open = self.build_local_open();
        match self.send(Message::Open(open)).await {
            Ok(()) => {
                self.sent_open = true;
                self.hold.reset(timer::LARGE_HOLD_TIME);
                true
            }
            Err(e) => {
                self.publish(EventKind::Err(format!("failed to send OPEN: {e}")))
                    .await;
                self.teardown_connection().await;
                false
            }
        }
    }

    // -- Active --------------------------------------------------------

    async fn step_active(&mut self) -> Next {
        loop {
            tokio::select! {
                biased;
                fired = disable_fired(&mut self.disable) => {
                    if fired {
                        return Next::Disabled;
                    }
                    continue;
                }
                _ = self.connect_retry.tick(), if self.connect_retry.armed() => {
                    self.connect_retry.stop();
                    return Next::State(State::Connect);
                }
            }
        }
    }

    // -- OpenSent --------------------------------------------------------

    async fn step_open_sent(&mut self) -> Next {
        loop {
            tokio::select! {
                biased;
                fired = disable_fired(&mut self.disable) => {
                    if fired {
                        return Next::Disabled;
                    }
                    continue;
                }
                _ = self.hold.tick(), if self.hold.armed() => {
                    self.hold.stop();
                    self.send_hold_timer_expired_notification().await;
                    self.publish(EventKind::HoldTimerExpired).await;
                    return Next::State(State::Idle);
                }
                event = self.reader.as_mut().expect("reader present in OpenSent").events.recv() => {
                    match event {
                        Some(ReaderEvent::Message(Message::Open(open))) => {
                            return self.handle_peer_open(open).await;
                        }
                        Some(ReaderEvent::Message(Message::Notification(n))) => {
                            self.publish(EventKind::NotificationReceived(n)).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Message(other)) => {
                            let type_byte = other.message_type();
                            self.send_bad_type_notification(type_byte).await;
                            self.publish(EventKind::Err("unexpected message type in OpenSent".into())).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Failed(e)) => {
                            let protocol_error = self.notify_reader_failure(&e).await;
                            self.publish(EventKind::Err(format!("connection error in OpenSent: {e}"))).await;
                            return if protocol_error {
                                Next::State(State::Idle)
                            } else {
                                Next::State(State::Active)
                            };
                        }
                        None => {
                            self.publish(EventKind::Err("reader channel closed unexpectedly".into())).await;
                            return Next::State(State::Active);
                        }
                    }
                }
            }
        }
    }

    async fn handle_peer_open(&mut self, peer_open: Open) -> Next {
        match open::validate(&peer_open, self.neighbor.asn) {
            Ok(()) => {
                self.negotiated_hold = if self.neighbor.hold_time == 0 || peer_open.hold_time == 0 {
                    0
                } else {
                    self.neighbor.hold_time.min(peer_open.hold_time)
                };
                debug_assert!(self.negotiated_hold == 0 || self.negotiated_hold >= 3);
                if let Err(e) = self.send(Message::Keepalive).await {
                    self.publish(EventKind::Err(format!("failed to send KEEPALIVE: {e}")))
                        .await;
                    return Next::State(State::Idle);
                }
                self.reset_hold();
                Next::State(State::OpenConfirm)
            }
            Err(validation_err) => {
                self.send_notification(Notification::new(
                    validation_err.error_code(),
                    validation_err.subcode as u8,
                    validation_err.data.clone(),
                ))
                .await;
                self.publish(EventKind::Err(format!(
                    "invalid OPEN from peer: {validation_err}"
                )))
                .await;
                Next::State(State::Idle)
            }
        }
    }

    // -- OpenConfirm -------------------------------------------------------

    async fn step_open_confirm(&mut self) -> Next {
        loop {
            tokio::select! {
                biased;
                fired = disable_fired(&mut self.disable) => {
                    if fired {
                        return Next::Disabled;
                    }
                    continue;
                }
                _ = self.hold.tick(), if self.hold.armed() => {
                    self.hold.stop();
                    self.send_hold_timer_expired_notification().await;
                    self.publish(EventKind::HoldTimerExpired).await;
                    return Next::State(State::Idle);
                }
                event = self.reader.as_mut().expect("reader present in OpenConfirm").events.recv() => {
                    match event {
                        Some(ReaderEvent::Message(Message::Keepalive)) => {
                            return Next::State(State::Established);
                        }
                        Some(ReaderEvent::Message(Message::Notification(n))) => {
                            self.publish(EventKind::NotificationReceived(n)).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Message(other)) => {
                            let type_byte = other.message_type();
                            self.send_bad_type_notification(type_byte).await;
                            self.publish(EventKind::Err("unexpected message type in OpenConfirm".into())).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Failed(e)) => {
                            self.notify_reader_failure(&e).await;
                            self.publish(EventKind::Err(format!("reader error in OpenConfirm: {e}"))).await;
                            return Next::State(State::Idle);
                        }
                        None => {
                            self.publish(EventKind::Err("reader channel closed unexpectedly".into())).await;
                            return Next::State(State::Idle);
                        }
                    }
                }
            }
        }
    }

    // -- Established -------------------------------------------------------

    async fn step_established(&mut self) -> Next {
        loop {
            tokio::select! {
                biased;
                fired = disable_fired(&mut self.disable) => {
                    if fired {
                        return Next::Disabled;
                    }
                    continue;
                }
                _ = self.hold.tick(), if self.hold.armed() => {
                    self.hold.stop();
                    self.send_hold_timer_expired_notification().await;
                    self.publish(EventKind::HoldTimerExpired).await;
                    return Next::State(State::Idle);
                }
                _ = self.keepalive.tick(), if self.keepalive.armed() => {
                    self.keepalive.stop();
                    if let Err(e) = self.send(Message::Keepalive).await {
                        self.publish(EventKind::Err(format!("failed to send KEEPALIVE: {e}"))).await;
                        return Next::State(State::Idle);
                    }
                    self.arm_keepalive();
                    continue;
                }
                event = self.reader.as_mut().expect("reader present in Established").events.recv() => {
                    match event {
                        Some(ReaderEvent::Message(Message::Keepalive)) => {
                            self.reset_hold();
                            continue;
                        }
                        Some(ReaderEvent::Message(Message::Update(update))) => {
                            self.reset_hold();
                            self.publish(EventKind::UpdateReceived(update)).await;
                            continue;
                        }
                        Some(ReaderEvent::Message(Message::Notification(n))) => {
                            self.publish(EventKind::NotificationReceived(n)).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Message(other)) => {
                            let type_byte = other.message_type();
                            self.send_bad_type_notification(type_byte).await;
                            self.publish(EventKind::Err("received OPEN while Established".into())).await;
                            return Next::State(State::Idle);
                        }
                        Some(ReaderEvent::Failed(e)) => {
                            self.notify_reader_failure(&e).await;
                            self.publish(EventKind::Err(format!("reader error in Established: {e}"))).await;
                            return Next::State(State::Idle);
                        }
                        None => {
                            self.publish(EventKind::Err("reader channel closed unexpectedly".into())).await;
                            return Next::State(State::Idle);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
