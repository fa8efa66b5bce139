//! Second-resolution file timestamps.
//!
//! Change detection on the control file compares whole seconds, the same
//! granularity every reader of the file can rely on.

use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Modification time of a file in whole seconds since the Unix epoch
pub fn mtime_secs(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .map(system_time_secs)
        .unwrap_or(0)
}

/// Current wall clock in whole seconds since the Unix epoch
pub fn now_secs() -> u64 {
    system_time_secs(SystemTime::now())
}

/// Convert whole seconds back to a `SystemTime`
pub fn secs_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Pick the mtime for the next write: the wall clock, unless that would not
/// move past the last synced mtime, in which case one second past it.
pub fn next_mtime(synced_mtime: Option<u64>, now: u64) -> u64 {
    match synced_mtime {
        Some(prev) if now <= prev => prev + 1,
        _ => now,
    }
}

fn system_time_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
