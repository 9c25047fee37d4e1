//! Shared test utilities.
//!
//! Content trees are described as a list of relative paths: a trailing `/`
//! makes a directory, anything else an empty file (parents are created).
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! build_tree(tmp.path(), &["album/", "album/photo.jpg", "notes.txt"]);
//! write_file(tmp.path(), "notes.txt.d", "Some notes\n");
//! ```

use crate::directory::Entry;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::Path;

/// Create every path of `entries` under `root`.
pub fn build_tree(root: &Path, entries: &[&str]) {
    for entry in entries {
        if let Some(dir) = entry.strip_suffix('/') {
            fs::create_dir_all(root.join(dir)).unwrap();
        } else {
            write_file(root, entry, "");
        }
    }
}

/// Write `content` to `dir/rel`, creating parent directories.
pub fn write_file(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn names(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

/// 2024-03-09T14:05:00Z, the clock every expansion test runs against.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
}
