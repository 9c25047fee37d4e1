//! The directory model: an ordered snapshot of one directory, with a cursor.
//!
//! Every directory visited during a traversal becomes a [`DirectorySnapshot`]
//! living in a [`DirectoryTree`]. The tree is an arena owned by the traversal:
//! snapshots are pushed when a directory is entered and dropped when it is
//! left, so the arena only ever holds the current root-to-leaf path.
//!
//! ## Ordering
//!
//! Entries are split into two sequences, directories and plain files, each
//! sorted case-insensitively by name. Equal names (ignoring case) keep the
//! order in which the filesystem enumerated them:
//!
//! ```text
//! readdir:   Banana  apple/  Cherry  notes/  ALPHA
//! dirs:      apple/  notes/
//! files:     ALPHA  Banana  Cherry
//! ```
//!
//! ## Cursor
//!
//! [`DirectoryTree::advance`] walks all directories, then all files, then
//! resets to "nothing selected" and reports `false`. The next call starts the
//! cycle again, which is what lets several templates iterate the same
//! snapshot one after another.
//!
//! ## Breadcrumbs
//!
//! [`DirectoryTree::mark_path_to_root`] leaves a mark on every ancestor
//! pointing at the child on the way down. [`DirectoryTree::next_path_segment`]
//! then consumes those marks from the top, yielding the entry names from the
//! root to the leaf. Only one path is ever enumerated at a time.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parent directory has no selected entry to enter")]
    NoSelection,
    #[error("no snapshot with id {0}")]
    UnknownSnapshot(usize),
}

/// Returned by [`DirectoryTree::next_path_segment`] when a marked child has
/// no entry name. Only a root can lack one, and a root is never a child.
pub const UNNAMED_SEGMENT: &str = "(unnamed)";

/// Handle to a snapshot inside a [`DirectoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotId(usize);

impl SnapshotId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One directory entry as seen when the snapshot was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// Size in kilobytes, rounded to the nearest.
    pub size_kb: u64,
    pub is_dir: bool,
}

impl Entry {
    pub fn new(name: impl Into<String>, size_bytes: u64, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            size_kb: (size_bytes + 512) >> 10,
            is_dir,
        }
    }
}

/// Position of the cursor. The variant doubles as the iteration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Unset,
    Directory(usize),
    File(usize),
}

/// A sorted listing of one directory.
#[derive(Debug)]
pub struct DirectorySnapshot {
    parent: Option<SnapshotId>,
    /// Entry name in the parent's listing; `None` for the root.
    entry_name: Option<String>,
    path: PathBuf,
    directories: Vec<Entry>,
    files: Vec<Entry>,
    cursor: Cursor,
    breadcrumb: Option<SnapshotId>,
}

impl DirectorySnapshot {
    fn empty(parent: Option<SnapshotId>, entry_name: Option<String>, path: PathBuf) -> Self {
        Self {
            parent,
            entry_name,
            path,
            directories: Vec::new(),
            files: Vec::new(),
            cursor: Cursor::Unset,
            breadcrumb: None,
        }
    }

    /// Insert keeping the sequence ordered; equal names go after existing ones.
    pub fn insert(&mut self, entry: Entry) {
        let list = if entry.is_dir {
            &mut self.directories
        } else {
            &mut self.files
        };
        let at = list
            .iter()
            .position(|e| compare_names(&entry.name, &e.name) == Ordering::Less)
            .unwrap_or(list.len());
        list.insert(at, entry);
    }

    pub fn parent(&self) -> Option<SnapshotId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn entry_name(&self) -> Option<&str> {
        self.entry_name.as_deref()
    }

    /// Filesystem location of this directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directories(&self) -> &[Entry] {
        &self.directories
    }

    pub fn files(&self) -> &[Entry] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn selected(&self) -> Option<&Entry> {
        match self.cursor {
            Cursor::Unset => None,
            Cursor::Directory(i) => self.directories.get(i),
            Cursor::File(i) => self.files.get(i),
        }
    }

    pub fn selected_name(&self) -> &str {
        self.selected().map(|e| e.name.as_str()).unwrap_or("")
    }

    pub fn selected_size_kb(&self) -> u64 {
        self.selected().map(|e| e.size_kb).unwrap_or(0)
    }

    pub fn is_selected_directory(&self) -> bool {
        self.selected().is_some_and(|e| e.is_dir)
    }

    /// Move to the next entry: directories first, then files.
    ///
    /// Returns `false` once both sequences are exhausted; the cursor is then
    /// unset and the following call starts over.
    pub fn advance(&mut self) -> bool {
        let next = match self.cursor {
            Cursor::Unset => self.first_directory(),
            Cursor::Directory(i) if i + 1 < self.directories.len() => Cursor::Directory(i + 1),
            Cursor::Directory(_) => self.first_file(),
            Cursor::File(i) if i + 1 < self.files.len() => Cursor::File(i + 1),
            Cursor::File(_) => Cursor::Unset,
        };
        self.cursor = next;
        next != Cursor::Unset
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = Cursor::Unset;
    }

    fn first_directory(&self) -> Cursor {
        if self.directories.is_empty() {
            self.first_file()
        } else {
            Cursor::Directory(0)
        }
    }

    fn first_file(&self) -> Cursor {
        if self.files.is_empty() {
            Cursor::Unset
        } else {
            Cursor::File(0)
        }
    }
}

/// Case-insensitive (ASCII) name order, byte by byte.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let a = a.bytes().map(|c| c.to_ascii_lowercase());
    let b = b.bytes().map(|c| c.to_ascii_lowercase());
    a.cmp(b)
}

/// Arena of the snapshots along the current traversal path.
#[derive(Debug, Default)]
pub struct DirectoryTree {
    snapshots: Vec<DirectorySnapshot>,
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `dir` into a new snapshot.
    ///
    /// With a parent, the parent's selected entry is the directory being
    /// entered. `include` sees the snapshot under construction and each entry
    /// name; rejected names are never stat'ed. Entries that cannot be stat'ed
    /// or have non UTF-8 names are logged and skipped.
    pub fn enter<F>(
        &mut self,
        parent: Option<SnapshotId>,
        dir: &Path,
        mut include: F,
    ) -> Result<SnapshotId, DirectoryError>
    where
        F: FnMut(&DirectorySnapshot, &str) -> bool,
    {
        let entry_name = match parent {
            Some(p) => {
                let parent = self.get(p)?;
                let selected = parent.selected().ok_or(DirectoryError::NoSelection)?;
                Some(selected.name.clone())
            }
            None => None,
        };
        let mut snapshot = DirectorySnapshot::empty(parent, entry_name, dir.to_path_buf());

        let read = fs::read_dir(dir).map_err(|source| DirectoryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for dirent in read {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    warn!("{}: {e}", dir.display());
                    continue;
                }
            };
            let name = match dirent.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("{}: skipping non UTF-8 name {raw:?}", dir.display());
                    continue;
                }
            };
            if name.is_empty() || !include(&snapshot, &name) {
                continue;
            }
            // Follows symlinks, so a linked directory is listed as a directory.
            match fs::metadata(dirent.path()) {
                Ok(meta) => snapshot.insert(Entry::new(name, meta.len(), meta.is_dir())),
                Err(e) => warn!("{}: {e}; not included", dirent.path().display()),
            }
        }

        let id = SnapshotId(self.snapshots.len());
        self.snapshots.push(snapshot);
        debug!("snapshot {} for {}", id.0, dir.display());
        Ok(id)
    }

    /// Drop `id` and everything entered after it.
    pub fn leave(&mut self, id: SnapshotId) {
        self.snapshots.truncate(id.0);
    }

    pub fn get(&self, id: SnapshotId) -> Result<&DirectorySnapshot, DirectoryError> {
        self.snapshots
            .get(id.0)
            .ok_or(DirectoryError::UnknownSnapshot(id.0))
    }

    pub fn get_mut(&mut self, id: SnapshotId) -> Result<&mut DirectorySnapshot, DirectoryError> {
        self.snapshots
            .get_mut(id.0)
            .ok_or(DirectoryError::UnknownSnapshot(id.0))
    }

    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn advance(&mut self, id: SnapshotId) -> bool {
        self.get_mut(id).map(DirectorySnapshot::advance).unwrap_or(false)
    }

    pub fn is_root(&self, id: SnapshotId) -> bool {
        self.get(id).is_ok_and(DirectorySnapshot::is_root)
    }

    /// Mark the path from the root down to `id`, one mark per ancestor.
    ///
    /// Any walk left unfinished on this path is discarded.
    pub fn mark_path_to_root(&mut self, id: SnapshotId) {
        self.clear_marks(id);
        let mut child = id;
        while let Some(parent) = self.snapshots.get(child.0).and_then(|s| s.parent) {
            self.snapshots[parent.0].breadcrumb = Some(child);
            child = parent;
        }
    }

    /// Drop every mark on `id` and its ancestors.
    pub fn clear_marks(&mut self, id: SnapshotId) {
        let mut at = Some(id);
        while let Some(snapshot) = at.and_then(|i| self.snapshots.get_mut(i.0)) {
            snapshot.breadcrumb = None;
            at = snapshot.parent;
        }
    }

    /// Number of directories between the root and `id`.
    pub fn levels_below_root(&self, id: SnapshotId) -> usize {
        let mut levels = 0;
        let mut at = id;
        while let Some(parent) = self.snapshots.get(at.0).and_then(|s| s.parent) {
            levels += 1;
            at = parent;
        }
        levels
    }

    /// Consume the highest remaining mark above `id` and return the name of
    /// the child it pointed to. `None` once every mark has been consumed.
    pub fn next_path_segment(&mut self, id: SnapshotId) -> Option<&str> {
        let mut at = id;
        while let Some(parent) = self.snapshots.get(at.0)?.parent {
            if self.snapshots[parent.0].breadcrumb.is_none() {
                break;
            }
            at = parent;
        }
        let child = self.snapshots[at.0].breadcrumb.take()?;
        let name = self
            .snapshots
            .get(child.0)
            .and_then(|s| s.entry_name.as_deref())
            .unwrap_or(UNNAMED_SEGMENT);
        Some(name)
    }

    /// Breadcrumb from the root to `id`, joined with `/` and ending in `/`.
    pub fn path_string(&mut self, id: SnapshotId) -> String {
        self.mark_path_to_root(id);
        let mut path = String::new();
        while let Some(segment) = self.next_path_segment(id) {
            path.push_str(segment);
            path.push('/');
        }
        path
    }
}
