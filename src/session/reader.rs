//! The background network reader
//!
//! One task per session owns the read half of the TCP connection and
//! decodes it through [`crate::Codec`]; the SSM never touches the socket's
//! read side directly. A single ordered channel carries both decoded
//! messages and the terminal read failure back to the SSM's selection loop
//! (collapsing the conceptual `reader_err`/`inbound_msg` pair from
//! `SPEC_FULL.md` SS5 into one stream preserves arrival order between a
//! message and a failure that follows it, and gives the SSM one thing to
//! select on instead of two). A `watch<bool>` shutdown signal lets the SSM
//! ask the reader to stop, with a oneshot acknowledgement the SSM waits on
//! before closing the channel.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{Codec, Message};
use futures_util::StreamExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

/// A reader-side failure: either the wire codec rejected something the peer
/// sent, or the connection was closed.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error(transparent)]
    Codec(#[from] crate::Error),
    #[error("connection closed by peer")]
    Eof,
}

/// One item from the reader: a decoded message, or the terminal failure
/// that ends the reader's task.
#[derive(Debug)]
pub enum ReaderEvent {
    Message(Message),
    Failed(ReaderError),
}

/// Handle to a running reader task.
#[derive(Debug)]
pub struct ReaderHandle {
    pub events: mpsc::Receiver<ReaderEvent>,
    shutdown: watch::Sender<bool>,
    closed: Option<oneshot::Receiver<()>>,
    join: JoinHandle<()>,
}

impl ReaderHandle {
    /// Signal the reader to stop, wait for its exit acknowledgement, then
    /// join the task. Idempotent resource teardown relies on this being the
    /// only path that closes the channel.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(closed) = self.closed.take() {
            let _ = closed.await;
        }
        let _ = self.join.await;
    }
}

/// Spawn a reader task over `read_half`.
pub fn spawn(read_half: OwnedReadHalf) -> ReaderHandle {
    let (tx, rx) = mpsc::channel(16);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (closed_tx, closed_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut framed = FramedRead::new(read_half, Codec);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    log::trace!("reader received shutdown signal");
                    break;
                }
                item = framed.next() => {
                    match item {
                        Some(Ok(msg)) => {
                            log::trace!("reader decoded a message");
                            if tx.send(ReaderEvent::Message(msg)).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            log::debug!("reader decode error: {err}");
                            let _ = tx.send(ReaderEvent::Failed(ReaderError::Codec(err))).await;
                            break;
                        }
                        None => {
                            log::debug!("reader saw EOF");
                            let _ = tx.send(ReaderEvent::Failed(ReaderError::Eof)).await;
                            break;
                        }
                    }
                }
            }
        }
        let _ = closed_tx.send(());
    });

    ReaderHandle {
        events: rx,
        shutdown: shutdown_tx,
        closed: Some(closed_rx),
        join,
    }
}
