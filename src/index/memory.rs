use crate::index::KeywordIndex;
use crate::keywords::KeywordId;
use rustc_hash::FxHashMap;

/// In-memory keyword table with append-only id assignment
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    names: Vec<String>,
    /// ASCII-lowercased name -> id
    ids: FxHashMap<String, KeywordId>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index whose ids follow the order of `names`. Names repeated
    /// case-insensitively keep their first id.
    pub fn with_keywords<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for name in names {
            index.lookup_or_create_keyword(name.as_ref());
        }
        index
    }

    pub fn lookup(&self, name: &str) -> Option<KeywordId> {
        self.ids.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn name(&self, id: KeywordId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl KeywordIndex for MemoryIndex {
    fn keyword_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn lookup_or_create_keyword(&mut self, name: &str) -> KeywordId {
        let key = name.to_ascii_lowercase();
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }

        let id = self.names.len() as KeywordId;
        self.names.push(name.to_string());
        self.ids.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_assigned_in_order() {
        let mut index = MemoryIndex::new();
        assert_eq!(index.lookup_or_create_keyword("$Forwarded"), 0);
        assert_eq!(index.lookup_or_create_keyword("Work"), 1);
        assert_eq!(index.lookup_or_create_keyword("work"), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.name(1), Some("Work"));
    }

    #[test]
    fn test_with_keywords_dedups() {
        let index = MemoryIndex::with_keywords(["A", "b", "a"]);
        assert_eq!(index.keyword_names(), vec!["A".to_string(), "b".to_string()]);
        assert_eq!(index.lookup("B"), Some(1));
        assert_eq!(index.lookup("c"), None);
    }
}
