//! Reasoning gateway HTTP client.

pub mod client;

pub use client::HttpReasoningGateway;
