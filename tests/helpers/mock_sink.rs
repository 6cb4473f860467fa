#![allow(dead_code)]
use async_trait::async_trait;
use sqlalert::core::AlertSink;
use sqlalert::notification::ForwardError;
use std::sync::Mutex;
use tokio::sync::Notify;

/// A mock sink that records every payload it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
    pub notifier: Notify,
    pub fail: bool,
}

impl RecordingSink {
    /// A sink that records the attempt and then reports a 500.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn wait_for_count(&self, target: usize) {
        while self.payloads().len() < target {
            self.notifier.notified().await;
        }
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn send(&self, payload: &str) -> Result<(), ForwardError> {
        self.sent.lock().unwrap().push(payload.to_string());
        self.notifier.notify_one();
        if self.fail {
            return Err(ForwardError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: String::new(),
            });
        }
        Ok(())
    }
}
