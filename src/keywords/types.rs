use serde::{Deserialize, Serialize};

/// Identifier of a keyword inside the message index
pub type KeywordId = u32;

/// Position of a keyword in the control file, encoded as one filename character
pub type Slot = usize;

/// Highest number of keyword slots a maildir filename can address ('a'..='z')
pub const MAX_KEYWORDS: usize = 26;

/// Character encoding slot 0
pub const KEYWORD_FIRST: char = 'a';

/// Character encoding the last addressable slot
pub const KEYWORD_LAST: char = 'z';

/// Default name of the control file inside a mailbox's control directory
pub const KEYWORDS_FILE_NAME: &str = "dovecot-keywords";

/// Convert a slot to its filename character
#[inline]
pub fn slot_to_char(slot: Slot) -> char {
    debug_assert!(slot < MAX_KEYWORDS);
    (KEYWORD_FIRST as u8 + slot as u8) as char
}

/// Convert a filename character back to its slot
#[inline]
pub fn char_to_slot(c: char) -> Option<Slot> {
    if (KEYWORD_FIRST..=KEYWORD_LAST).contains(&c) {
        Some(c as usize - KEYWORD_FIRST as usize)
    } else {
        None
    }
}

/// Tells whether the caller currently holds the mailbox lock.
///
/// Every mutating table operation requires the uidlist lock to be held for
/// the whole read-modify-write sequence. The probe is only consulted by
/// debug assertions; it never acquires anything.
pub trait LockProbe {
    fn is_locked(&self) -> bool;
}

impl<F: Fn() -> bool> LockProbe for F {
    fn is_locked(&self) -> bool {
        self()
    }
}

/// Settings for a mailbox keyword table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// File name of the control file within the control directory
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Suffix appended to the control path to form the commit lock file
    #[serde(default = "default_lock_suffix")]
    pub lock_suffix: String,

    /// Number of usable slots (clamped to 1..=26)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Permission bits for the lock file (and so the committed control file)
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// Age in seconds after which a leftover lock file is considered stale.
    /// 0 disables stale lock removal.
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,

    /// fsync the lock file before replacing the control file
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

fn default_file_name() -> String {
    KEYWORDS_FILE_NAME.to_string()
}

fn default_lock_suffix() -> String {
    ".lock".to_string()
}

fn default_capacity() -> usize {
    MAX_KEYWORDS
}

fn default_file_mode() -> u32 {
    0o600
}

fn default_stale_lock_secs() -> u64 {
    120
}

fn default_fsync() -> bool {
    true
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            lock_suffix: default_lock_suffix(),
            capacity: default_capacity(),
            file_mode: default_file_mode(),
            stale_lock_secs: default_stale_lock_secs(),
            fsync: default_fsync(),
        }
    }
}

impl KeywordConfig {
    /// Capacity actually enforced by the table
    pub fn effective_capacity(&self) -> usize {
        self.capacity.clamp(1, MAX_KEYWORDS)
    }

    /// Config with a custom capacity, everything else default
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_char_mapping() {
        assert_eq!(slot_to_char(0), 'a');
        assert_eq!(slot_to_char(25), 'z');
        assert_eq!(char_to_slot('a'), Some(0));
        assert_eq!(char_to_slot('z'), Some(25));
        assert_eq!(char_to_slot('A'), None);
        assert_eq!(char_to_slot('{'), None);
    }

    #[test]
    fn test_capacity_is_clamped() {
        assert_eq!(KeywordConfig::with_capacity(0).effective_capacity(), 1);
        assert_eq!(KeywordConfig::with_capacity(2).effective_capacity(), 2);
        assert_eq!(KeywordConfig::with_capacity(99).effective_capacity(), MAX_KEYWORDS);
    }

    #[test]
    fn test_config_partial_json() {
        let config: KeywordConfig = serde_json::from_str(r#"{"capacity": 4}"#).unwrap();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.file_name, KEYWORDS_FILE_NAME);
        assert_eq!(config.lock_suffix, ".lock");
        assert!(config.fsync);
    }

    #[test]
    fn test_closure_lock_probe() {
        let held = || true;
        assert!(held.is_locked());
    }
}
