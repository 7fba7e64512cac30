//! # outreach-core
//!
//! Core types, traits, configuration, and error handling for the Outreach bot.

pub mod config;
pub mod contact;
pub mod context;
pub mod error;
pub mod lead;
pub mod message;
pub mod traits;

pub use config::shellexpand;
pub use contact::Contact;
