//! # Subscription Manager
//!
//! The [`SubscriptionManager`] owns the lifecycle of the upstream stream. It connects,
//! writes the filter specification, feeds every received envelope to the
//! [`Dispatcher`], and reconnects with a bounded number of attempts when the stream
//! fails or ends.
//!
//! ## State machine
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Reconnecting -> Connecting -> ...
//!              \______________________/    \-> Terminated (attempts exhausted)
//! any non-terminal state -> Terminated (cancellation)
//! ```
//!
//! The attempt counter resets to zero whenever the manager enters `Streaming` and
//! increments on every failure. Once it reaches the configured maximum, the manager
//! terminates with [`SubscriptionError::ReconnectsExhausted`] without making another
//! connection attempt. The delay between attempts is fixed.
//!
//! Envelopes are dispatched one at a time, in delivery order; the next envelope is
//! only read once the previous one has been fully handled.

use crate::{
    config::StreamConfig,
    dispatcher::Dispatcher,
    error::{StreamError, SubscriptionError},
    filters::FilterSpec,
    update::UpdateEnvelope,
};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use std::{fmt, time::Duration};
use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;

/// The stream of envelopes produced by an open subscription.
pub type UpdateStream = BoxStream<'static, Result<UpdateEnvelope, StreamError>>;

/// A trait abstracting over the upstream transport.
///
/// This allows the manager to be driven by the live Geyser client as well as by
/// scripted sources in tests.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Opens a new stream and writes `filter` as its subscription request.
    ///
    /// Returns once the request has been written successfully.
    async fn subscribe(&self, filter: &FilterSpec) -> Result<UpdateStream, StreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Reconnecting,
    Terminated,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionState::Idle => "idle",
            SubscriptionState::Connecting => "connecting",
            SubscriptionState::Streaming => "streaming",
            SubscriptionState::Reconnecting => "reconnecting",
            SubscriptionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// A point-in-time view of the manager, published through [`SubscriptionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionStatus {
    pub state: SubscriptionState,
    pub attempts: u32,
}

/// A clonable handle for observing and stopping a running [`SubscriptionManager`].
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancel: CancellationToken,
    status_rx: watch::Receiver<SubscriptionStatus>,
}

impl SubscriptionHandle {
    /// Signals the manager to close the active stream and stop reconnecting.
    ///
    /// An envelope that is already being dispatched is allowed to finish.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn status(&self) -> SubscriptionStatus {
        *self.status_rx.borrow()
    }

    pub fn state(&self) -> SubscriptionState {
        self.status().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SubscriptionState::Streaming
    }

    /// Waits until the manager reaches `state`. Returns `false` if the manager was
    /// dropped before getting there.
    pub async fn wait_for(&mut self, state: SubscriptionState) -> bool {
        self.status_rx
            .wait_for(|status| status.state == state)
            .await
            .is_ok()
    }
}

/// Why consumption of an open stream stopped.
enum Consumed {
    Cancelled,
    Failed(StreamError),
}

pub struct SubscriptionManager<S> {
    source: S,
    dispatcher: Dispatcher,
    max_attempts: u32,
    reconnect_delay: Duration,
    attempts: u32,
    state: SubscriptionState,
    cancel: CancellationToken,
    status_tx: watch::Sender<SubscriptionStatus>,
}

impl<S: StreamSource> SubscriptionManager<S> {
    /// Creates a new `SubscriptionManager` in the `Idle` state, and its handle.
    pub fn new(
        source: S,
        dispatcher: Dispatcher,
        config: &StreamConfig,
    ) -> (Self, SubscriptionHandle) {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(SubscriptionStatus::default());
        let manager = Self {
            source,
            dispatcher,
            max_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay(),
            attempts: 0,
            state: SubscriptionState::Idle,
            cancel: cancel.clone(),
            status_tx,
        };
        let handle = SubscriptionHandle { cancel, status_rx };
        (manager, handle)
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Runs the subscription until it is cancelled or the reconnect budget is spent.
    ///
    /// Returns `Ok(())` after cancellation, and
    /// [`SubscriptionError::ReconnectsExhausted`] once `max_reconnect_attempts`
    /// consecutive failures have occurred.
    pub async fn run(mut self, filter: FilterSpec) -> Result<(), SubscriptionError> {
        loop {
            self.transition(SubscriptionState::Connecting);
            tracing::info!("Connecting to Geyser stream...");

            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                opened = self.source.subscribe(&filter) => Some(opened),
            };
            let Some(opened) = opened else {
                return self.terminate();
            };

            let failure = match opened {
                Ok(stream) => {
                    self.attempts = 0;
                    self.transition(SubscriptionState::Streaming);
                    tracing::info!("Successfully subscribed to Geyser stream");
                    match self.consume(stream).await {
                        Consumed::Cancelled => return self.terminate(),
                        Consumed::Failed(e) => e,
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to connect to Geyser stream: {}", e);
                    e
                }
            };

            self.attempts += 1;
            self.transition(SubscriptionState::Reconnecting);

            if self.attempts >= self.max_attempts {
                tracing::error!(
                    attempts = self.attempts,
                    "Max reconnection attempts reached. Giving up."
                );
                self.transition(SubscriptionState::Terminated);
                return Err(SubscriptionError::ReconnectsExhausted {
                    attempts: self.attempts,
                    last_error: failure.to_string(),
                });
            }

            tracing::warn!(
                "Attempting to reconnect ({}/{}) in {:?}...",
                self.attempts,
                self.max_attempts,
                self.reconnect_delay
            );

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = sleep(self.reconnect_delay) => false,
            };
            if cancelled {
                return self.terminate();
            }
        }
    }

    /// Reads and dispatches envelopes until the stream fails, ends or is cancelled.
    /// Dropping the stream on return closes it.
    async fn consume(&self, mut stream: UpdateStream) -> Consumed {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Consumed::Cancelled,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(envelope)) => {
                    tracing::trace!(kind = envelope.kind(), "Dispatching update");
                    self.dispatcher.handle(envelope).await
                }
                Some(Err(e)) => {
                    tracing::error!("Stream error occurred: {}", e);
                    return Consumed::Failed(e);
                }
                None => {
                    tracing::warn!("Stream ended");
                    return Consumed::Failed(StreamError::Ended);
                }
            }
        }
    }

    fn terminate(&mut self) -> Result<(), SubscriptionError> {
        tracing::info!("Shutdown signal received, subscription terminated.");
        self.transition(SubscriptionState::Terminated);
        Ok(())
    }

    fn transition(&mut self, next: SubscriptionState) {
        tracing::debug!(from = %self.state, to = %next, attempts = self.attempts, "Subscription state change");
        self.state = next;
        self.status_tx.send_replace(SubscriptionStatus {
            state: next,
            attempts: self.attempts,
        });
    }
}
