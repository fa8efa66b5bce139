//! The message index side of keyword synchronization.
//!
//! The index owns the canonical keyword id <-> name table. A sync session only
//! needs an ordered snapshot of the names and a way to resolve (or create) the
//! id for a name.

pub mod memory;

pub use memory::MemoryIndex;

use crate::keywords::KeywordId;

/// Keyword table of a message index
pub trait KeywordIndex {
    /// All keyword names, positioned by their id
    fn keyword_names(&self) -> Vec<String>;

    /// Id for `name`, registering it if the index does not know it yet
    fn lookup_or_create_keyword(&mut self, name: &str) -> KeywordId;
}

impl<T: KeywordIndex + ?Sized> KeywordIndex for &mut T {
    fn keyword_names(&self) -> Vec<String> {
        (**self).keyword_names()
    }

    fn lookup_or_create_keyword(&mut self, name: &str) -> KeywordId {
        (**self).lookup_or_create_keyword(name)
    }
}
