//! # outreach-providers
//!
//! Reply generator backends for Outreach.

pub mod openai;

pub use openai::OpenAiResponder;
