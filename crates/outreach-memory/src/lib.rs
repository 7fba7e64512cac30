//! # outreach-memory
//!
//! Per-contact conversational state and persistent lead storage for Outreach.
//!
//! - [`MessageLedger`]: which inbound message IDs have already been handled
//! - [`ConversationStore`]: capped per-contact transcripts
//! - [`Store`]: SQLite-backed lead table and delivery log
//! - [`CsvDirectory`]: contacts directory used for lead enrichment

pub mod audit;
pub mod conversations;
pub mod directory;
pub mod ledger;
pub mod store;

pub use audit::{DeliveryEntry, DeliveryKind, DeliveryLog, DeliveryStatus};
pub use conversations::ConversationStore;
pub use directory::{read_contact_rows, ContactRow, CsvDirectory};
pub use ledger::MessageLedger;
pub use store::Store;
