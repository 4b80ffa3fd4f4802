//! The outbound TCP dial
//!
//! At most one dial is ever in flight per session (`SPEC_FULL.md` invariant
//! iv). The dial runs on its own task so the SSM's selection loop never
//! blocks on `connect()`; the result crosses back on a oneshot channel. When
//! the SSM gives up on a dial in progress (ConnectRetry expiry, a disable
//! signal) it aborts the task through the `JoinHandle` but still has to
//! consume the paired `oneshot::Receiver` -- an aborted task's sender is
//! simply dropped, so the receiver resolves to a `RecvError`, which reads
//! here as a drained, failed dial rather than a leak.

// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A dial in progress.
#[derive(Debug)]
pub struct Dialer {
    handle: JoinHandle<()>,
    result: oneshot::Receiver<std::io::Result<TcpStream>>,
}

impl Dialer {
    /// Spawn a task that dials `addr` and reports the outcome.
    pub fn spawn(addr: SocketAddr) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            log::debug!("dialing {addr}");
            let result = TcpStream::connect(addr).await;
            // The receiver may already be gone if the SSM aborted us after
            // we'd already returned; a send failure here is not an error.
            let _ = tx.send(result);
        });
        Self { handle, result: rx }
    }

    /// Abort the dial task. The caller must still await [`Dialer::recv`] (or
    /// drop this value) to drain the paired channel; `abort` alone does not
    /// reclaim the oneshot.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the dial to finish. Resolves to `Err` (treated as a failed,
    /// drained dial) if the task was aborted before it could reply.
    pub async fn recv(self) -> Result<std::io::Result<TcpStream>, oneshot::error::RecvError> {
        self.result.await
    }

    /// A mutable handle onto the result channel, for selecting on it without
    /// consuming the dial (`tokio::select!` polls this repeatedly across
    /// loop iterations until it resolves).
    pub(crate) fn result_mut(
        &mut self,
    ) -> &mut oneshot::Receiver<std::io::Result<TcpStream>> {
        &mut self.result
    }
}
