pub mod fake_subscription;
pub mod log_capture;
pub mod mock_sink;
