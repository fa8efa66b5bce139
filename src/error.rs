use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by the keyword table and its sync sessions
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("{op}({}) failed: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Keyword file is locked by another writer: {}", .0.display())]
    LockContention(PathBuf),

    #[error("No free keyword slot left (capacity {capacity})")]
    CapacityExhausted { capacity: usize },

    #[error("Invalid keyword name: {0:?}")]
    InvalidName(String),

    #[error("Character {0:?} is not a keyword code")]
    InvalidCode(char),

    #[error("Keyword id {0} is not in the index snapshot")]
    UnknownKeywordId(u32),
}

impl KeywordError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        KeywordError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this is the expected "table is full" outcome
    pub fn is_capacity(&self) -> bool {
        matches!(self, KeywordError::CapacityExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, KeywordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = KeywordError::io(
            "stat",
            Path::new("/tmp/box/dovecot-keywords"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("stat(/tmp/box/dovecot-keywords) failed"));
    }

    #[test]
    fn test_capacity_is_distinguished() {
        assert!(KeywordError::CapacityExhausted { capacity: 26 }.is_capacity());
        assert!(!KeywordError::LockContention(PathBuf::from("x")).is_capacity());
    }
}
