use crate::keywords::char_to_slot;

/// Separator between a maildir base name and its flag list
pub const INFO_SEPARATOR: &str = ":2,";

/// System flags defined by the maildir format
pub const SYSTEM_FLAGS: &[char] = &['D', 'F', 'P', 'R', 'S', 'T'];

/// A maildir filename split into base name and flags.
///
/// Flags are kept in ASCII order without duplicates, the order they are
/// written back in. Uppercase letters are system flags, `a`..`z` keyword
/// codes; anything else is kept as-is so renames never drop data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaildirInfo {
    pub base: String,
    flags: Vec<char>,
    /// Whether the name carried a `:2,` section when parsed
    has_info: bool,
}

impl MaildirInfo {
    /// Split `filename` at its `:2,` info section
    pub fn parse(filename: &str) -> Self {
        match filename.find(INFO_SEPARATOR) {
            Some(idx) => {
                let mut info = Self::new(&filename[..idx]);
                info.has_info = true;
                for flag in filename[idx + INFO_SEPARATOR.len()..].chars() {
                    info.insert(flag);
                }
                info
            }
            None => Self::new(filename),
        }
    }

    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            flags: Vec::new(),
            has_info: false,
        }
    }

    /// All flags, in the order they are written
    pub fn flags(&self) -> &[char] {
        &self.flags
    }

    /// Keyword codes (`a`..`z`)
    pub fn keyword_codes(&self) -> impl Iterator<Item = char> + '_ {
        self.flags.iter().copied().filter(|&c| char_to_slot(c).is_some())
    }

    /// Flags that are not keyword codes
    pub fn other_flags(&self) -> impl Iterator<Item = char> + '_ {
        self.flags.iter().copied().filter(|&c| char_to_slot(c).is_none())
    }

    pub fn insert(&mut self, flag: char) {
        if let Err(pos) = self.flags.binary_search(&flag) {
            self.flags.insert(pos, flag);
        }
    }

    /// Replace every keyword code with `codes`, keeping the other flags
    pub fn set_keyword_codes(&mut self, codes: impl IntoIterator<Item = char>) {
        self.flags.retain(|&c| char_to_slot(c).is_none());
        for code in codes {
            debug_assert!(char_to_slot(code).is_some());
            self.insert(code);
        }
    }

    /// Rebuild the filename. An empty `:2,` is kept if the name had one;
    /// a name that never had flags stays as it was.
    pub fn to_filename(&self) -> String {
        if !self.has_info && self.flags.is_empty() {
            return self.base.clone();
        }

        let mut name = String::with_capacity(self.base.len() + INFO_SEPARATOR.len() + self.flags.len());
        name.push_str(&self.base);
        name.push_str(INFO_SEPARATOR);
        name.extend(self.flags.iter());
        name
    }
}

/// Whether `flag` is one of the maildir system flags
pub fn is_system_flag(flag: char) -> bool {
    SYSTEM_FLAGS.contains(&flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_base_and_flags() {
        let info = MaildirInfo::parse("1700000000.M1P2.host:2,Sba");
        assert_eq!(info.base, "1700000000.M1P2.host");
        assert_eq!(info.flags(), &['S', 'a', 'b']);
        assert_eq!(info.keyword_codes().collect::<String>(), "ab");
        assert_eq!(info.other_flags().collect::<String>(), "S");
    }

    #[test]
    fn test_parse_without_info() {
        let info = MaildirInfo::parse("1700000000.M1P2.host");
        assert_eq!(info.base, "1700000000.M1P2.host");
        assert!(info.flags().is_empty());
    }

    #[test]
    fn test_to_filename_sorts_and_dedups() {
        let info = MaildirInfo::parse("msg:2,cSaFa");
        assert_eq!(info.to_filename(), "msg:2,FSac");
    }

    #[test]
    fn test_set_keyword_codes_keeps_system_flags() {
        let mut info = MaildirInfo::parse("msg:2,RSbz");
        info.set_keyword_codes(['c', 'a']);
        assert_eq!(info.to_filename(), "msg:2,RSac");

        info.set_keyword_codes(Vec::new());
        assert_eq!(info.to_filename(), "msg:2,RS");
    }

    #[test]
    fn test_name_without_info_is_kept() {
        let mut info = MaildirInfo::parse("1700000000.M1P2.host");
        assert_eq!(info.to_filename(), "1700000000.M1P2.host");

        info.set_keyword_codes(['b']);
        assert_eq!(info.to_filename(), "1700000000.M1P2.host:2,b");

        let empty = MaildirInfo::parse("1700000000.M1P2.host:2,");
        assert_eq!(empty.to_filename(), "1700000000.M1P2.host:2,");
    }

    #[test]
    fn test_unknown_flags_are_preserved() {
        let info = MaildirInfo::parse("msg:2,S1X");
        assert_eq!(info.other_flags().collect::<String>(), "1SX");
        assert!(is_system_flag('S'));
        assert!(!is_system_flag('X'));
    }
}
