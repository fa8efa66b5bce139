//! Maildir keyword table and its synchronization with the message index.
//!
//! - [`table`] - slot <-> name table backed by the mailbox control file
//! - [`commit`] - atomic, mtime-bumping rewrite of the control file
//! - [`session`] - per-sync-pass id <-> character translation
//! - [`types`] - ids, slot/character mapping, configuration

pub mod commit;
pub mod session;
pub mod table;
pub mod types;

pub use commit::serialize_slots;
pub use session::SyncSession;
pub use table::{parse_control_line, KeywordTable};
pub use types::*;
