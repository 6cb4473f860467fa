//! The relay loop: wait for a notification, forward it, ping when idle.
//!
//! The loop is a two-state machine. In `Waiting` it blocks on the next
//! notification with an idle timeout. When the timeout fires it enters
//! `Probing`, dispatches a detached liveness probe and drops straight back to
//! `Waiting`. The probe's outcome is only logged; it never gates the loop and
//! a failed probe does not reconnect the subscription.
//!
//! Forwarding is awaited inline, so a slow webhook delays the next
//! notification. A failed forward is logged once and the alert is dropped.

use crate::core::{AlertSink, LivenessProbe, NotificationEvent, Subscription, WaitOutcome};
use crate::listener::ListenerError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("listener error: {0}")]
    Transport(#[from] ListenerError),
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Waiting,
    Probing,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Waiting => write!(f, "waiting"),
            RelayState::Probing => write!(f, "probing"),
        }
    }
}

/// What a single iteration of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A notification was received and one forward attempt was made.
    Forwarded { payload: String, delivered: bool },
    /// The idle timeout elapsed and a probe was dispatched.
    Probed,
}

/// Joins one subscription to one alert sink.
pub struct Relay<S: Subscription, K: AlertSink> {
    subscription: S,
    sink: Arc<K>,
    probe: Arc<dyn LivenessProbe>,
    idle_timeout: Duration,
    state: RelayState,
}

impl<S: Subscription, K: AlertSink> Relay<S, K> {
    /// Creates a new `Relay`.
    pub fn new(subscription: S, sink: Arc<K>, idle_timeout: Duration) -> Self {
        let probe = subscription.prober();
        Self {
            subscription,
            sink,
            probe,
            idle_timeout,
            state: RelayState::Waiting,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Runs the loop until the subscription fails or shutdown is signalled.
    ///
    /// Returns `Ok(())` on shutdown and `Err` on a fatal listener error.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<()>) -> Result<(), RelayError> {
        info!(
            "Waiting for notifications on channel '{}'...",
            self.subscription.channel()
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Relay received shutdown signal.");
                    return Ok(());
                }
                step = self.step() => {
                    step?;
                }
            }
        }
    }

    /// Performs one Waiting iteration: forward one event or dispatch one probe.
    pub async fn step(&mut self) -> Result<Step, RelayError> {
        match self.subscription.wait_next(self.idle_timeout).await {
            Ok(WaitOutcome::Event(event)) => {
                let delivered = forward(self.sink.as_ref(), &event).await;
                Ok(Step::Forwarded {
                    payload: event.payload,
                    delivered,
                })
            }
            Ok(WaitOutcome::Timeout) => {
                self.transition(RelayState::Probing);
                self.dispatch_probe();
                info!("No new notifications, listener ping sent.");
                self.transition(RelayState::Waiting);
                Ok(Step::Probed)
            }
            Err(e) => {
                error!(error = %e, "Listener error");
                Err(e.into())
            }
        }
    }

    /// Spawns the probe without keeping its handle; the result is only logged.
    fn dispatch_probe(&self) {
        let probe = Arc::clone(&self.probe);
        tokio::spawn(async move {
            if let Err(e) = probe.probe().await {
                warn!(error = %e, "Failed to ping listener");
            }
        });
    }

    fn transition(&mut self, next: RelayState) {
        debug!(from = %self.state, to = %next, "Relay state change");
        self.state = next;
    }
}

/// Makes exactly one delivery attempt for `event`.
async fn forward<K: AlertSink>(sink: &K, event: &NotificationEvent) -> bool {
    info!(channel = %event.channel, "Got NOTIFY: {}", event.payload);
    match sink.send(&event.payload).await {
        Ok(()) => true,
        Err(e) => {
            error!(sink = sink.name(), error = %e, "Failed to send alert");
            false
        }
    }
}
