//! A channel-fed subscription and a counting probe for driving the relay
//! without a database.

#![allow(dead_code)]
use async_trait::async_trait;
use sqlalert::core::{LivenessProbe, NotificationEvent, Subscription};
use sqlalert::listener::ListenerError;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Notify};

pub const CHANNEL: &str = "sql_alert";

pub type EventResult = Result<NotificationEvent, ListenerError>;

pub struct FakeSubscription {
    rx: mpsc::UnboundedReceiver<EventResult>,
    probe: Arc<CountingProbe>,
}

/// Handle used by a test to push notifications and transport errors.
#[derive(Clone)]
pub struct SubscriptionHandle {
    tx: mpsc::UnboundedSender<EventResult>,
}

impl SubscriptionHandle {
    pub fn notify(&self, payload: &str) {
        self.tx
            .send(Ok(NotificationEvent::new(CHANNEL, payload)))
            .expect("subscription dropped");
    }

    pub fn fail(&self, error: ListenerError) {
        self.tx.send(Err(error)).expect("subscription dropped");
    }
}

impl FakeSubscription {
    pub fn new(probe: Arc<CountingProbe>) -> (Self, SubscriptionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, probe }, SubscriptionHandle { tx })
    }
}

#[async_trait]
impl Subscription for FakeSubscription {
    fn channel(&self) -> &str {
        CHANNEL
    }

    async fn next_event(&mut self) -> EventResult {
        self.rx.recv().await.unwrap_or(Err(ListenerError::Closed))
    }

    fn prober(&self) -> Arc<dyn LivenessProbe> {
        self.probe.clone()
    }
}

/// A probe that counts how often it was called.
#[derive(Debug, Default)]
pub struct CountingProbe {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub notifier: Notify,
}

impl CountingProbe {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Waits until the probe has been called at least `target` times.
    pub async fn wait_for_count(&self, target: usize) {
        while self.count() < target {
            self.notifier.notified().await;
        }
    }
}

#[async_trait]
impl LivenessProbe for CountingProbe {
    async fn probe(&self) -> Result<(), ListenerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notifier.notify_one();
        if self.fail {
            Err(ListenerError::Probe(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}
