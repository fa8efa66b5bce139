//! Durable commit of a keyword table.
//!
//! The new contents are written to `<control file><lock suffix>`, which doubles
//! as the writer lock: it is created exclusively and never waited on. Its
//! mtime is forced past the last synced mtime and it is then renamed over the
//! control file, so readers see either the old or the new file, and always a
//! newer mtime after a change.

use crate::error::{KeywordError, Result};
use crate::keywords::table::KeywordTable;
use crate::keywords::types::KeywordConfig;
use crate::utils::{next_mtime, now_secs, secs_to_system_time};
use std::fmt::Write as _;
use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

impl KeywordTable {
    /// Path of the lock file used while committing
    pub fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone().into_os_string();
        lock.push(&self.config.lock_suffix);
        PathBuf::from(lock)
    }

    /// Persist pending changes.
    ///
    /// Every call invalidates the synced state, so the next lookup re-checks
    /// the file even when nothing was written. On failure the pending changes
    /// stay in memory for a later retry.
    pub fn commit(&mut self) -> Result<()> {
        self.assert_locked();
        self.synced = false;

        if !self.changed {
            return Ok(());
        }

        let lock_path = self.lock_path();
        let contents = serialize_slots(&self.slots);
        let mtime = next_mtime(self.synced_mtime, now_secs());

        let (lock, mut file) = LockFile::create(&lock_path, &self.config)?;
        write_contents(&mut file, &lock_path, contents.as_bytes(), self.config.fsync)?;
        set_mtime(&file, &lock_path, mtime)?;
        drop(file);
        lock.replace(&self.path)?;

        info!(
            "committed {} keywords to {} (mtime {})",
            self.len(),
            self.path.display(),
            mtime
        );
        self.synced_mtime = Some(mtime);
        self.changed = false;
        Ok(())
    }
}

/// Render filled slots as `<slot> <name>\n` lines in slot order
pub fn serialize_slots(slots: &[Option<String>]) -> String {
    let mut out = String::with_capacity(slots.len() * 16);
    for (slot, name) in slots.iter().enumerate() {
        if let Some(name) = name {
            let _ = writeln!(out, "{} {}", slot, name);
        }
    }
    out
}

/// Exclusively created lock file that is removed again unless it replaced
/// its target.
struct LockFile {
    path: PathBuf,
    replaced: bool,
}

impl LockFile {
    fn create(path: &Path, config: &KeywordConfig) -> Result<(Self, File)> {
        let file = match open_exclusive(path, config.file_mode) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(path, config.stale_lock_secs) {
                    warn!("keyword lock {} is held by another writer", path.display());
                    return Err(KeywordError::LockContention(path.to_path_buf()));
                }

                warn!("removing stale keyword lock {}", path.display());
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(KeywordError::io("unlink", path, e)),
                }

                match open_exclusive(path, config.file_mode) {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(KeywordError::LockContention(path.to_path_buf()));
                    }
                    Err(e) => return Err(KeywordError::io("open", path, e)),
                }
            }
            Err(e) => return Err(KeywordError::io("open", path, e)),
        };

        debug!("acquired keyword lock {}", path.display());
        let lock = Self {
            path: path.to_path_buf(),
            replaced: false,
        };
        Ok((lock, file))
    }

    /// Rename the lock file over `target`. The file handle must be closed.
    fn replace(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target).map_err(|e| KeywordError::io("rename", target, e))?;
        self.replaced = true;
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if self.replaced {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove keyword lock {}: {}", self.path.display(), e);
        }
    }
}

fn write_contents(file: &mut File, path: &Path, data: &[u8], fsync: bool) -> Result<()> {
    file.write_all(data)
        .map_err(|e| KeywordError::io("write", path, e))?;
    if fsync {
        file.sync_all()
            .map_err(|e| KeywordError::io("fsync", path, e))?;
    }
    Ok(())
}

fn set_mtime(file: &File, path: &Path, mtime: u64) -> Result<()> {
    let times = FileTimes::new()
        .set_accessed(SystemTime::now())
        .set_modified(secs_to_system_time(mtime));
    file.set_times(times)
        .map_err(|e| KeywordError::io("utime", path, e))
}

fn open_exclusive(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

/// Whether an existing lock file is older than `stale_secs`
fn is_stale(path: &Path, stale_secs: u64) -> bool {
    if stale_secs == 0 {
        return false;
    }

    let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
        // Vanished in between: let the retry find out
        return true;
    };

    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > Duration::from_secs(stale_secs))
        .unwrap_or(false)
}
