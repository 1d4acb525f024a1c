//! Streaming delivery channel state machine.
//!
//! One [`StreamChannel`] models one long-lived server-to-client push
//! connection: `Opening → Open → Closed`. On open it emits a synthetic
//! `connected` event, registers with the [`EventBus`], and starts a
//! heartbeat timer; on close (client disconnect or server cancellation,
//! whichever fires first) it cancels the heartbeat and releases the bus
//! subscription exactly once.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use crate::domain::{Event, EventBus, Unsubscribe};

/// One open push connection's registration and lifecycle with the bus.
///
/// Yields [`Event`]s as a [`Stream`]. Dropping the channel (the transport
/// went away) and calling [`StreamChannel::close`] (server-side
/// cancellation) perform the same cleanup; both paths may race and the
/// cleanup still runs exactly once. After the channel is closed the
/// stream yields nothing, even if a `publish` races with the transition.
#[derive(Debug)]
pub struct StreamChannel {
    rx: mpsc::UnboundedReceiver<Event>,
    heartbeat: JoinHandle<()>,
    unsubscribe: Unsubscribe,
    closed: AtomicBool,
}

impl StreamChannel {
    /// Opens a channel against the bus.
    ///
    /// The synthetic `connected` event is queued before the bus
    /// subscription exists, so the client can confirm liveness before any
    /// real event arrives. The heartbeat fires every `heartbeat_interval`
    /// so intermediary proxies do not recycle the connection for
    /// inactivity.
    #[must_use]
    pub fn open(bus: &EventBus, heartbeat_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = tx.send(Event::connected());
        let unsubscribe = bus.subscribe(tx.clone());

        let heartbeat = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
            loop {
                ticker.tick().await;
                if tx.send(Event::ping()).is_err() {
                    // Receiving half is gone; the channel is closing.
                    break;
                }
            }
        });

        Self {
            rx,
            heartbeat,
            unsubscribe,
            closed: AtomicBool::new(false),
        }
    }

    /// Transitions the channel to `Closed`, once.
    ///
    /// Cancels the heartbeat timer and releases the bus subscription.
    /// Safe to call from racing cleanup paths: the first caller performs
    /// the cleanup, later callers are no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.heartbeat.abort();
            self.unsubscribe.unsubscribe();
            tracing::debug!("stream channel closed");
        }
    }

    /// Returns `true` once the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for StreamChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl Stream for StreamChannel {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        // Closed gate: nothing is handed out after the transition, even
        // for events already buffered when close() raced a publish.
        if this.closed.load(Ordering::SeqCst) {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}
