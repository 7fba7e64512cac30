//! # outreach-channels
//!
//! Messaging transport integrations for Outreach.

pub mod bridge;

pub use bridge::BridgeTransport;
