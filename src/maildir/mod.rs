//! Maildir filename handling.
//!
//! Keywords travel in the `:2,` info section of a message filename as single
//! lowercase characters; see [`crate::keywords`] for how those characters map
//! to names.

pub mod info;

pub use info::*;
