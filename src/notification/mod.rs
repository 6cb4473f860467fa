//! Alert forwarding to external notification services.
//!
//! Each sink implements `core::AlertSink` and turns one notification payload
//! into one outbound message. Only the DingTalk robot webhook exists today.
pub mod dingtalk;

pub use dingtalk::{DingTalkClient, ForwardError};
