/// sqlalert - relays PostgreSQL NOTIFY events to a DingTalk webhook
///
/// The library holds the two halves of the relay (the notification listener
/// and the alert forwarder) plus the loop that joins them. The binary in
/// `main.rs` only wires configuration and logging around it.
pub mod cli;
pub mod config;
pub mod core;
pub mod dsn;
pub mod listener;
pub mod notification;
pub mod relay;

// Re-export core types for convenience
pub use core::*;
