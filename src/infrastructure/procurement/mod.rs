//! Signal procurement HTTP client.

pub mod client;

pub use client::HttpProcurementGateway;
