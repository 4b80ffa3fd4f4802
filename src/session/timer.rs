//! Per-session timers (ConnectRetry, Hold, Keepalive)
//!
//! RFC 4271 Section 8 specifies three timers; each is modeled here as a
//! [`Timer`] wrapping a `tokio::time::Sleep` that is reset in place rather
//! than reallocated, so it can be awaited from inside `tokio::select!`
//! alongside the reader and dialer without pinning gymnastics at the call
//! site. A timer that has not been armed never fires: callers gate the
//! `tick()` branch on [`Timer::armed`].

// SPDX-License-Identifier: AGPL-3.0-or-later

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Default ConnectRetry interval (RFC 4271 suggests 120s; this speaker uses
/// the faster 5s the corpus's own reconnect logic favors for a single
/// statically-configured neighbor).
pub const CONNECT_RETRY: Duration = Duration::from_secs(5);

/// HoldTimer value used in Connect and OpenSent before negotiation, to give
/// a slow peer time to complete the OPEN exchange without this speaker
/// giving up first.
pub const LARGE_HOLD_TIME: Duration = Duration::from_secs(4 * 60);

/// A resettable, drainable timer.
#[derive(Debug)]
pub struct Timer {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Timer {
    /// Construct a new, disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sleep: Box::pin(sleep(Duration::from_secs(0))),
            armed: false,
        }
    }

    /// Whether the timer is currently armed. Gate a `tick()` select branch
    /// on this so a disarmed timer's already-elapsed `Sleep` does not spin
    /// the selection loop.
    #[must_use]
    pub const fn armed(&self) -> bool {
        self.armed
    }

    /// Arm (or re-arm) the timer for `duration` from now. Equivalent to the
    /// stop-drain-then-reset sequence a channel-based timer needs; a
    /// `tokio::time::Sleep` reset in place needs no draining.
    pub fn reset(&mut self, duration: Duration) {
        self.sleep.as_mut().reset(Instant::now() + duration);
        self.armed = true;
    }

    /// Disarm the timer. A disarmed timer's `tick()` is never selected.
    pub fn stop(&mut self) {
        self.armed = false;
    }

    /// Wait for the timer to elapse. Callers must gate this with
    /// `if timer.armed()` in `tokio::select!` and call [`Timer::stop`] (or
    /// [`Timer::reset`]) as soon as the branch fires, since an elapsed
    /// `Sleep` resolves immediately on every subsequent poll.
    pub async fn tick(&mut self) {
        self.sleep.as_mut().await;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the Keepalive interval from a negotiated HoldTime: `floor(hold/3)`
/// seconds, truncated, per RFC 4271 Section 4.4. A HoldTime of `0` disables
/// both the HoldTimer and the Keepalive timer.
#[must_use]
pub fn keepalive_time(hold_time: u16) -> Duration {
    Duration::from_secs(u64::from(hold_time / 3))
}
