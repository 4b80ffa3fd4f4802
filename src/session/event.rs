//! Events published to the external sink
//!
//! The SSM never holds its own event queue: every [`Event`] is pushed onto a
//! `tokio::sync::mpsc::Sender<Event>` the caller supplies when spawning a
//! session, and publication happens synchronously with the selection loop
//! (see `SPEC_FULL.md` SS5). The sink is a typed stand-in for whatever
//! consumer the embedding application wires up; this crate does not ship one.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::config::NeighborConfig;
use crate::{Notification, Update};

/// Session state names, matching RFC 4271 Section 8 with one addition:
/// `Disabled`, the terminal state this implementation settles in after an
/// external disable signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
    Disabled,
}

/// A value published to the external event sink, always identified by the
/// neighbor it concerns (a supervisor fanning events from several sessions
/// into one sink needs this to tell them apart).
#[derive(Clone, Debug)]
pub struct Event {
    pub neighbor: NeighborConfig,
    pub kind: EventKind,
}

/// The payload of an [`Event`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum EventKind {
    /// Emitted on every entry to a non-`Disabled` state.
    StateTransition(State),
    /// Emitted on any recoverable error: a parse failure, a socket error, an
    /// invalid OPEN. Carries a human-readable diagnostic; the wire
    /// NOTIFICATION triple (when one exists) has already been sent to the
    /// peer by the time this is published.
    Err(String),
    /// The negotiated HoldTimer elapsed with no message from the peer.
    HoldTimerExpired,
    /// The peer sent a NOTIFICATION; the session is tearing down.
    NotificationReceived(Notification),
    /// The peer sent an UPDATE; published only after the message's
    /// HoldTimer reset has already happened.
    UpdateReceived(Update),
}

impl Event {
    pub(crate) fn new(neighbor: &NeighborConfig, kind: EventKind) -> Self {
        Self {
            neighbor: neighbor.clone(),
            kind,
        }
    }
}
