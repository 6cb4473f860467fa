//! A client for sending alerts to a DingTalk robot webhook.

use crate::core::{AlertPayload, AlertSink};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("failed to serialize alert: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP request to webhook failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("received non-200 response code: {status}, body: {body:?}")]
    Status { status: StatusCode, body: String },
}

/// Posts text alerts to a single webhook URL.
///
/// The client makes exactly one attempt per alert. Failed alerts are not
/// retried or queued.
#[derive(Clone, Debug)]
pub struct DingTalkClient {
    webhook_url: String,
    client: reqwest::Client,
}

impl DingTalkClient {
    /// Creates a new `DingTalkClient`.
    ///
    /// `timeout` bounds the whole request; `None` leaves the call unbounded.
    pub fn new(webhook_url: String, timeout: Option<Duration>) -> Result<Self, ForwardError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            webhook_url,
            client: builder.build()?,
        })
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }
}

#[async_trait]
impl AlertSink for DingTalkClient {
    fn name(&self) -> &str {
        "dingtalk"
    }

    #[instrument(skip(self, payload), fields(len = payload.len()))]
    async fn send(&self, payload: &str) -> Result<(), ForwardError> {
        let body = serde_json::to_vec(&AlertPayload::text(payload))?;

        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ForwardError::Status { status, body });
        }

        info!("Alert sent to DingTalk successfully.");
        Ok(())
    }
}
