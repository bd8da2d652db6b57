use std::fmt;
use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Moved => "moved",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filesystem change, consumed once by the reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub is_directory: bool,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind, is_directory: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            is_directory,
        }
    }

    /// Map a watcher event onto a change. Access and other non-content events
    /// yield `None`. For renames the source path is reported.
    pub fn from_notify(event: &notify::Event) -> Option<Self> {
        let path = event.paths.first()?.clone();
        let (kind, is_directory) = match event.kind {
            EventKind::Create(CreateKind::Folder) => (ChangeKind::Created, true),
            EventKind::Create(_) => (ChangeKind::Created, path.is_dir()),
            EventKind::Modify(ModifyKind::Name(_)) => {
                let current = event.paths.last().unwrap_or(&path);
                (ChangeKind::Moved, current.is_dir())
            }
            EventKind::Modify(_) => (ChangeKind::Modified, path.is_dir()),
            EventKind::Remove(RemoveKind::Folder) => (ChangeKind::Deleted, true),
            EventKind::Remove(_) => (ChangeKind::Deleted, false),
            EventKind::Any => {
                if path.exists() {
                    (ChangeKind::Modified, path.is_dir())
                } else {
                    (ChangeKind::Deleted, false)
                }
            }
            EventKind::Access(_) | EventKind::Other => return None,
        };
        Some(Self {
            path,
            kind,
            is_directory,
        })
    }
}
