//! Age-based cleanup of ingestion work directories

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub errors: usize,
}

/// Remove files under `root` last modified at least `max_age` ago, then
/// directories that are empty and were already that old before the sweep.
/// `root` itself is kept, and so is a fresh directory another run is still
/// filling.
pub fn sweep(root: &Path, max_age: Duration) -> SweepStats {
    let mut stats = SweepStats::default();
    if !root.is_dir() {
        debug!("Nothing to sweep at {}", root.display());
        return stats;
    }
    let now = SystemTime::now();
    let expired = |entry: &walkdir::DirEntry| {
        entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= max_age)
    };

    // Directory ages are taken before any removal touches their mtime
    let mut stale_dirs = HashSet::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read entry under {}: {}", root.display(), e);
                stats.errors += 1;
                continue;
            }
        };
        if entry.file_type().is_dir() {
            if expired(&entry) {
                stale_dirs.insert(entry.path().to_path_buf());
            }
            continue;
        }
        if !entry.file_type().is_file() || !expired(&entry) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => stats.files_removed += 1,
            Err(e) => {
                warn!("Failed to remove {}: {}", entry.path().display(), e);
                stats.errors += 1;
            }
        }
    }

    // Deepest first so parents empty out before they are visited
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && stale_dirs.contains(e.path()))
    {
        let is_empty = std::fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            match std::fs::remove_dir(entry.path()) {
                Ok(()) => stats.dirs_removed += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", entry.path().display(), e);
                    stats.errors += 1;
                }
            }
        }
    }

    info!(
        files = stats.files_removed,
        dirs = stats.dirs_removed,
        errors = stats.errors,
        "Swept {}",
        root.display()
    );
    stats
}
