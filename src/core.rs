//! Core domain types and service traits for sqlalert
//!
//! This module defines the data that flows through one relay iteration and
//! the trait contracts between the listener, the liveness probe and the
//! alert forwarder. The relay loop only talks to these traits, which keeps it
//! testable without a database or a webhook.

use crate::listener::ListenerError;
use crate::notification::dingtalk::ForwardError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Message type tag DingTalk expects for plain text robot messages.
pub const TEXT_MSGTYPE: &str = "text";

/// Prefix prepended to every forwarded payload.
pub const ALERT_PREFIX: &str = "Alert: ";

/// A single notification received on the subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationEvent {
    /// The channel the notification arrived on
    pub channel: String,
    /// Opaque application-defined text sent with `NOTIFY`
    pub payload: String,
}

impl NotificationEvent {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// The JSON envelope posted to the webhook.
///
/// Serializes to `{"msgtype":"text","text":{"content":"Alert: <payload>"}}`;
/// field order matters for byte-exact bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertPayload {
    pub msgtype: String,
    pub text: TextContent,
}

/// The `text` object of a DingTalk text message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextContent {
    pub content: String,
}

impl AlertPayload {
    /// Builds the text alert for a raw notification payload.
    pub fn text(payload: &str) -> Self {
        Self {
            msgtype: TEXT_MSGTYPE.to_string(),
            text: TextContent {
                content: format!("{}{}", ALERT_PREFIX, payload),
            },
        }
    }
}

/// Result of waiting on a subscription with an idle timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A notification arrived before the timeout.
    Event(NotificationEvent),
    /// Nothing arrived within the timeout.
    Timeout,
}

// =============================================================================
// Service Traits
// =============================================================================

/// A live subscription to a notification channel.
#[async_trait]
pub trait Subscription: Send {
    /// The channel this subscription listens on.
    fn channel(&self) -> &str;

    /// Waits for the next notification.
    ///
    /// # Returns
    /// * `Ok(NotificationEvent)` when a notification arrives
    /// * `Err` when the underlying transport fails; the subscription cannot
    ///   recover from this and the caller should treat it as fatal
    ///
    /// Implementations must be cancel-safe: dropping the future must not lose
    /// a notification.
    async fn next_event(&mut self) -> Result<NotificationEvent, ListenerError>;

    /// Returns a probe that can check the connection from a detached task.
    fn prober(&self) -> Arc<dyn LivenessProbe>;

    /// Waits for the next notification, giving up after `timeout`.
    async fn wait_next(&mut self, timeout: Duration) -> Result<WaitOutcome, ListenerError> {
        match tokio::time::timeout(timeout, self.next_event()).await {
            Ok(event) => event.map(WaitOutcome::Event),
            Err(_) => Ok(WaitOutcome::Timeout),
        }
    }
}

/// A keep-alive check against the database behind a subscription.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self) -> Result<(), ListenerError>;
}

/// Delivers one alert for one notification payload.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// A short name for logs (e.g. "dingtalk").
    fn name(&self) -> &str;

    /// Sends a single alert built from `payload`.
    ///
    /// # Returns
    /// * `Ok(())` if the endpoint acknowledged the alert
    /// * `Err` on serialization, transport or status failures
    async fn send(&self, payload: &str) -> Result<(), ForwardError>;
}
