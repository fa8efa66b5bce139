use crate::error::{KeywordError, Result};
use crate::keywords::types::*;
use crate::utils::mtime_secs;
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistent slot <-> name table for one mailbox.
///
/// Nothing in here locks anything: every method assumes the caller holds the
/// mailbox's uidlist lock for the whole read-modify-write sequence. That is
/// what makes the stat-then-read change detection and the lock-free
/// allocation below safe.
pub struct KeywordTable {
    pub(super) path: PathBuf,
    pub(super) config: KeywordConfig,
    capacity: usize,
    /// Slot -> name. New names only go below `capacity`, but loaded entries
    /// may sit anywhere below `MAX_KEYWORDS`.
    pub(super) slots: Vec<Option<String>>,
    /// ASCII-lowercased name -> slot
    names: FxHashMap<String, Slot>,
    pub(super) synced_mtime: Option<u64>,
    pub(super) synced: bool,
    pub(super) changed: bool,
    lock_probe: Option<Box<dyn LockProbe>>,
}

impl KeywordTable {
    /// Create a table for the control file at `path`. Nothing is read until
    /// the first lookup.
    pub fn new(path: &Path, config: KeywordConfig) -> Self {
        let capacity = config.effective_capacity();
        Self {
            path: path.to_path_buf(),
            config,
            capacity,
            slots: Vec::with_capacity(capacity),
            names: FxHashMap::default(),
            synced_mtime: None,
            synced: false,
            changed: false,
            lock_probe: None,
        }
    }

    /// Create a table for the mailbox whose control directory is `control_dir`
    pub fn open(control_dir: &Path, config: KeywordConfig) -> Self {
        let path = control_dir.join(&config.file_name);
        Self::new(&path, config)
    }

    /// Install a probe that debug builds use to assert the mailbox lock is held
    pub fn with_lock_probe(mut self, probe: impl LockProbe + 'static) -> Self {
        self.lock_probe = Some(Box::new(probe));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mtime of the last control file state merged into memory
    pub fn synced_mtime(&self) -> Option<u64> {
        self.synced_mtime
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Filled slots in slot order
    pub fn entries(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, name)| name.as_deref().map(|n| (slot, n)))
    }

    /// Bring the in-memory state up to date with the control file.
    ///
    /// Cheap when the file's mtime matches what was last loaded: only a stat.
    pub fn refresh(&mut self) -> Result<()> {
        self.assert_locked();

        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.reset_missing();
                return Ok(());
            }
            Err(e) => return Err(KeywordError::io("stat", &self.path, e)),
        };

        let mtime = mtime_secs(&metadata);
        if self.synced_mtime == Some(mtime) {
            self.synced = true;
            return Ok(());
        }

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.reset_missing();
                return Ok(());
            }
            Err(e) => return Err(KeywordError::io("open", &self.path, e)),
        };

        self.clear();
        if let Err(e) = self.load(file) {
            // Half-read state must not pass for the file's contents
            self.clear();
            self.synced = false;
            self.synced_mtime = None;
            return Err(e);
        }

        debug!(
            "loaded {} keywords from {} (mtime {})",
            self.names.len(),
            self.path.display(),
            mtime
        );
        self.synced_mtime = Some(mtime);
        self.synced = true;
        Ok(())
    }

    /// Find the slot holding `name` (ASCII case-insensitive)
    pub fn lookup(&mut self, name: &str) -> Result<Option<Slot>> {
        self.assert_locked();

        let key = fold(name);
        if let Some(&slot) = self.names.get(&key) {
            return Ok(Some(slot));
        }
        if self.synced {
            return Ok(None);
        }

        self.refresh()?;
        Ok(self.names.get(&key).copied())
    }

    /// Find the slot holding `name`, allocating the lowest free slot if the
    /// name is new. The allocation is only in memory until `commit`.
    pub fn lookup_or_create(&mut self, name: &str) -> Result<Slot> {
        validate_name(name)?;

        if let Some(slot) = self.lookup(name)? {
            return Ok(slot);
        }
        // lookup() refreshed on a miss, so the slots reflect the file
        debug_assert!(self.synced);

        let in_range = self.slots.len().min(self.capacity);
        let slot = match self.slots[..in_range].iter().position(Option::is_none) {
            Some(free) => free,
            None if in_range >= self.capacity => {
                return Err(KeywordError::CapacityExhausted {
                    capacity: self.capacity,
                });
            }
            None => in_range,
        };

        self.create_at(name, slot);
        Ok(slot)
    }

    /// Name stored in `slot`, if any. An empty slot is only reported from a
    /// synced table; otherwise the file is checked first.
    pub fn name_at(&mut self, slot: Slot) -> Result<Option<&str>> {
        self.assert_locked();

        let filled = self.slots.get(slot).is_some_and(Option::is_some);
        if !filled && !self.synced {
            self.refresh()?;
        }

        Ok(self.slots.get(slot).and_then(|name| name.as_deref()))
    }

    /// Put `name` into an empty `slot`. Caller guarantees both are free.
    pub(crate) fn create_at(&mut self, name: &str, slot: Slot) {
        debug_assert!(slot < MAX_KEYWORDS);
        debug_assert!(self.slots.get(slot).is_none_or(Option::is_none));
        debug_assert!(!self.names.contains_key(&fold(name)));

        self.assign(slot, name.to_string());
        self.changed = true;
    }

    /// Slot `slot` now holds `name`. A previous name in the slot and a
    /// previous slot holding the name both lose their entry.
    fn assign(&mut self, slot: Slot, name: String) {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }

        if let Some(old) = self.slots[slot].take() {
            let old_key = fold(&old);
            if self.names.get(&old_key) == Some(&slot) {
                self.names.remove(&old_key);
            }
        }

        if let Some(prev) = self.names.insert(fold(&name), slot) {
            if prev != slot {
                self.slots[prev] = None;
            }
        }
        self.slots[slot] = Some(name);
    }

    fn load(&mut self, file: File) -> Result<()> {
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| KeywordError::io("read", &self.path, e))?;
            if read == 0 {
                break;
            }

            // Slots past the configured capacity are still in message
            // filenames and must survive the next commit
            match parse_control_line(&line, MAX_KEYWORDS) {
                Some((slot, name)) => self.assign(slot, name),
                None => debug!(
                    "skipping keyword line {:?} in {}",
                    String::from_utf8_lossy(&line).trim_end(),
                    self.path.display()
                ),
            }
        }

        Ok(())
    }

    fn reset_missing(&mut self) {
        debug!("no keyword file at {}", self.path.display());
        self.clear();
        self.synced = true;
    }

    /// Drop everything derived from the control file. Pending changes go
    /// with it: the state they were built on is gone.
    fn clear(&mut self) {
        self.slots.clear();
        self.names.clear();
        self.changed = false;
    }

    pub(super) fn assert_locked(&self) {
        debug_assert!(
            self.lock_probe.as_ref().is_none_or(|probe| probe.is_locked()),
            "keyword table {} used without the mailbox lock",
            self.path.display()
        );
    }
}

/// Parse one control file line of the form `<slot> <name>`.
///
/// Returns `None` for lines without a separator, with a non-numeric or
/// out-of-range slot, or with an empty name.
pub fn parse_control_line(line: &[u8], capacity: usize) -> Option<(Slot, String)> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let sep = memchr::memchr(b' ', line)?;
    let (idx, name) = (&line[..sep], &line[sep + 1..]);

    if idx.is_empty() || !idx.iter().all(u8::is_ascii_digit) || name.is_empty() {
        return None;
    }

    let slot: Slot = std::str::from_utf8(idx).ok()?.parse().ok()?;
    if slot >= capacity {
        return None;
    }

    Some((slot, String::from_utf8_lossy(name).into_owned()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['\n', '\r']) {
        return Err(KeywordError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Key used in the case-insensitive name map
#[inline]
fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}
