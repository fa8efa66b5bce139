use crate::error::{KeywordError, Result};
use crate::index::KeywordIndex;
use crate::keywords::table::KeywordTable;
use crate::keywords::types::*;
use crate::maildir::MaildirInfo;
use tracing::{debug, warn};

/// Translation context for one index synchronization pass.
///
/// Converts index keyword ids to maildir filename characters and back,
/// caching both directions for the lifetime of the pass. Misses go to the
/// keyword table, which may re-read or grow the control file. Pending table
/// changes are committed when the session finishes.
///
/// Like the table, a session must only be used while the mailbox lock is held.
pub struct SyncSession<'a, I: KeywordIndex> {
    table: &'a mut KeywordTable,
    index: I,
    /// Index keyword names at session start, positioned by id
    keywords: Vec<String>,
    /// Slot -> resolved index id
    chridx_to_idx: [Option<KeywordId>; MAX_KEYWORDS],
    /// Index id -> resolved character
    idx_to_chr: Vec<Option<char>>,
    finished: bool,
}

impl<'a, I: KeywordIndex> SyncSession<'a, I> {
    pub fn new(table: &'a mut KeywordTable, index: I) -> Self {
        let keywords = index.keyword_names();
        let idx_to_chr = vec![None; keywords.len()];
        Self {
            table,
            index,
            keywords,
            chridx_to_idx: [None; MAX_KEYWORDS],
            idx_to_chr,
            finished: false,
        }
    }

    pub fn table(&self) -> &KeywordTable {
        self.table
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Filename character for index keyword `id`.
    ///
    /// Allocates a slot for keywords the control file doesn't know yet.
    /// `Ok(None)` means every slot is taken and the keyword cannot be stored
    /// in filenames.
    pub fn keyword_char(&mut self, id: KeywordId) -> Result<Option<char>> {
        if let Some(Some(c)) = self.idx_to_chr.get(id as usize) {
            return Ok(Some(*c));
        }

        let name = self
            .keywords
            .get(id as usize)
            .ok_or(KeywordError::UnknownKeywordId(id))?;

        let slot = match self.table.lookup_or_create(name) {
            Ok(slot) => slot,
            Err(e) if e.is_capacity() => {
                debug!("keyword {:?} has no filename character: {}", name, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let c = slot_to_char(slot);
        self.cache_char(id, c);
        Ok(Some(c))
    }

    /// Index keyword id for filename character `c`.
    ///
    /// A character whose name got lost from the control file is given a
    /// generated `unknown-<slot>` name so it still maps to a stable id.
    pub fn char_keyword(&mut self, c: char) -> Result<KeywordId> {
        let slot = char_to_slot(c).ok_or(KeywordError::InvalidCode(c))?;

        if let Some(id) = self.chridx_to_idx[slot] {
            return Ok(id);
        }

        let name = match self.table.name_at(slot)? {
            Some(name) => name.to_string(),
            None => self.recreate_lost(slot)?,
        };

        let id = self.index.lookup_or_create_keyword(&name);
        self.chridx_to_idx[slot] = Some(id);
        self.cache_char(id, c);
        Ok(id)
    }

    /// Index ids for every keyword code in a parsed filename
    pub fn keywords_from_info(&mut self, info: &MaildirInfo) -> Result<Vec<KeywordId>> {
        let mut ids = Vec::new();
        for c in info.keyword_codes() {
            let id = self.char_keyword(c)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Set the keyword codes of `info` to represent `ids`. Keywords without a
    /// free character are left out and returned.
    pub fn apply_keywords(
        &mut self,
        info: &mut MaildirInfo,
        ids: &[KeywordId],
    ) -> Result<Vec<KeywordId>> {
        let mut codes = Vec::with_capacity(ids.len());
        let mut dropped = Vec::new();
        for &id in ids {
            match self.keyword_char(id)? {
                Some(c) => codes.push(c),
                None => dropped.push(id),
            }
        }
        info.set_keyword_codes(codes);
        Ok(dropped)
    }

    /// Commit pending table changes and end the session
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.table.commit()
    }

    /// Store a generated name in the empty `slot`, never reusing a name the
    /// table already has.
    fn recreate_lost(&mut self, slot: Slot) -> Result<String> {
        // name_at() only reports an empty slot from a synced table, so the
        // lookups below cannot reload the file under us
        debug_assert!(self.table.is_synced());

        let mut name = format!("unknown-{}", slot);
        while self.table.lookup(&name)?.is_some() {
            name.push('?');
        }

        warn!(
            "keyword for character {:?} missing from {}, using {:?}",
            slot_to_char(slot),
            self.table.path().display(),
            name
        );
        self.table.create_at(&name, slot);
        Ok(name)
    }

    fn cache_char(&mut self, id: KeywordId, c: char) {
        let idx = id as usize;
        if idx >= self.idx_to_chr.len() {
            self.idx_to_chr.resize(idx + 1, None);
        }
        self.idx_to_chr[idx] = Some(c);
    }
}

impl<I: KeywordIndex> Drop for SyncSession<'_, I> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.table.commit() {
            warn!(
                "failed to commit keywords to {}: {}",
                self.table.path().display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::utils::secs_to_system_time;
    use std::fs;
    use tempfile::tempdir;

    fn table_in(dir: &std::path::Path, capacity: usize) -> KeywordTable {
        KeywordTable::open(
            dir,
            KeywordConfig {
                fsync: false,
                ..KeywordConfig::with_capacity(capacity)
            },
        )
    }

    #[test]
    fn test_keyword_char_allocates_and_caches() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut index = MemoryIndex::with_keywords(["Work", "Personal"]);

        let mut session = SyncSession::new(&mut table, &mut index);
        assert_eq!(session.keyword_char(1).unwrap(), Some('a'));
        assert_eq!(session.keyword_char(0).unwrap(), Some('b'));
        assert_eq!(session.keyword_char(1).unwrap(), Some('a'));
        session.finish().unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join(KEYWORDS_FILE_NAME)).unwrap(),
            "0 Personal\n1 Work\n"
        );
    }

    #[test]
    fn test_keyword_char_unknown_id() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut session = SyncSession::new(&mut table, MemoryIndex::new());

        assert!(matches!(
            session.keyword_char(3),
            Err(KeywordError::UnknownKeywordId(3))
        ));
    }

    #[test]
    fn test_keyword_char_capacity_is_not_an_error() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 1);
        let mut session = SyncSession::new(&mut table, MemoryIndex::with_keywords(["A", "B"]));

        assert_eq!(session.keyword_char(0).unwrap(), Some('a'));
        assert_eq!(session.keyword_char(1).unwrap(), None);
    }

    #[test]
    fn test_char_keyword_uses_stored_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(KEYWORDS_FILE_NAME), "0 Work\n1 $Label1\n").unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut index = MemoryIndex::with_keywords(["$label1"]);

        let mut session = SyncSession::new(&mut table, &mut index);
        assert_eq!(session.char_keyword('b').unwrap(), 0);
        assert_eq!(session.char_keyword('a').unwrap(), 1);
        // The reverse direction is primed as well
        assert_eq!(session.keyword_char(0).unwrap(), Some('b'));
        session.finish().unwrap();

        assert_eq!(index.name(1), Some("Work"));
    }

    #[test]
    fn test_char_keyword_synthesizes_lost_name() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut index = MemoryIndex::new();

        let mut session = SyncSession::new(&mut table, &mut index);
        let id = session.char_keyword('c').unwrap();
        assert!(session.table().is_changed());
        let len = session.table().len();

        assert_eq!(session.char_keyword('c').unwrap(), id);
        assert_eq!(session.table().len(), len);
        session.finish().unwrap();

        assert_eq!(index.name(id), Some("unknown-2"));
        assert_eq!(
            fs::read_to_string(dir.path().join(KEYWORDS_FILE_NAME)).unwrap(),
            "2 unknown-2\n"
        );
    }

    #[test]
    fn test_char_keyword_disambiguates_placeholder() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(KEYWORDS_FILE_NAME),
            "0 unknown-2\n1 UNKNOWN-2?\n",
        )
        .unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut index = MemoryIndex::new();

        let mut session = SyncSession::new(&mut table, &mut index);
        let id = session.char_keyword('c').unwrap();
        session.finish().unwrap();

        assert_eq!(index.name(id), Some("unknown-2??"));
        assert_eq!(table.name_at(2).unwrap(), Some("unknown-2??"));
    }

    #[test]
    fn test_char_keyword_rejects_non_keyword_codes() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut session = SyncSession::new(&mut table, MemoryIndex::new());

        assert!(matches!(session.char_keyword('S'), Err(KeywordError::InvalidCode('S'))));
        assert!(matches!(session.char_keyword('{'), Err(KeywordError::InvalidCode('{'))));
        assert!(session.char_keyword('b').is_ok());
    }

    #[test]
    fn test_char_keyword_resolves_codes_beyond_capacity() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(KEYWORDS_FILE_NAME), "0 A
5 Foo
").unwrap();
        let mut table = table_in(dir.path(), 2);
        let mut index = MemoryIndex::new();

        let mut session = SyncSession::new(&mut table, &mut index);
        let id = session.char_keyword('f').unwrap();
        session.finish().unwrap();

        assert_eq!(index.name(id), Some("Foo"));
    }

    #[test]
    fn test_char_keyword_sees_slot_filled_by_other_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KEYWORDS_FILE_NAME);
        fs::write(&path, "0 A\n2 C\n").unwrap();

        let mut table = table_in(dir.path(), 26);
        table.refresh().unwrap();
        table.commit().unwrap();
        let loaded = table.synced_mtime().unwrap();

        // Another process fills slot 1 while this table still has it empty
        fs::write(&path, "0 A\n1 Important\n2 C\n").unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(secs_to_system_time(loaded + 5))
            .unwrap();

        let mut index = MemoryIndex::new();
        let mut session = SyncSession::new(&mut table, &mut index);
        let id = session.char_keyword('b').unwrap();
        session.finish().unwrap();

        assert_eq!(index.name(id), Some("Important"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "0 A\n1 Important\n2 C\n");
    }

    #[test]
    fn test_drop_commits() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        {
            let mut session = SyncSession::new(&mut table, MemoryIndex::with_keywords(["A"]));
            session.keyword_char(0).unwrap();
        }
        assert!(!table.is_changed());
        assert!(dir.path().join(KEYWORDS_FILE_NAME).exists());
    }

    #[test]
    fn test_filename_round_trip_through_session() {
        let dir = tempdir().unwrap();
        let mut table = table_in(dir.path(), 26);
        let mut index = MemoryIndex::with_keywords(["Work", "Todo"]);

        let mut session = SyncSession::new(&mut table, &mut index);
        let mut info = MaildirInfo::parse("1700000000.M1P2.host:2,S");
        let dropped = session.apply_keywords(&mut info, &[1, 0]).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(info.to_filename(), "1700000000.M1P2.host:2,Sab");

        let ids = session.keywords_from_info(&info).unwrap();
        assert_eq!(ids, vec![1, 0]);
        session.finish().unwrap();
    }
}
