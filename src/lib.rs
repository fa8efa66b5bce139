//! # mdkw - maildir keyword table
//!
//! Maildir messages carry their keywords as single lowercase characters in
//! the `:2,` info section of the filename. Which name each character stands
//! for is recorded per mailbox in a small control file of `<slot> <name>`
//! lines. This crate keeps that file, the in-memory table, and the message
//! index's keyword ids consistent with each other.
//!
//! ## Architecture
//!
//! - [`keywords`] - The keyword table, its commit protocol and sync sessions
//! - [`maildir`] - Maildir filename info parsing and formatting
//! - [`index`] - The message index interface and an in-memory implementation
//! - [`output`] - Command line output formatting
//! - [`utils`] - Configuration and timestamp helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use mdkw::index::MemoryIndex;
//! use mdkw::keywords::{KeywordConfig, KeywordTable, SyncSession};
//! use std::path::Path;
//!
//! // The caller must hold the mailbox's uidlist lock from here on
//! let mut table = KeywordTable::open(Path::new("/var/mail/box"), KeywordConfig::default());
//! let mut index = MemoryIndex::with_keywords(["Work", "$Label1"]);
//!
//! let mut session = SyncSession::new(&mut table, &mut index);
//! let code = session.keyword_char(0)?;          // Some('a')
//! let id = session.char_keyword('a')?;          // 0
//! session.finish()?;                            // writes the control file
//! # Ok::<(), mdkw::KeywordError>(())
//! ```
//!
//! ## Locking
//!
//! Nothing here takes locks. The table relies on the caller holding the
//! mailbox lock for every read-modify-write sequence; the control file's
//! mtime, bumped on every commit, is how other processes notice changes.

pub mod error;
pub mod index;
pub mod keywords;
pub mod maildir;
pub mod output;
pub mod utils;

pub use error::{KeywordError, Result};
