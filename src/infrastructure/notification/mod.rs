//! Customer notification HTTP client.

pub mod client;

pub use client::HttpNotificationGateway;
