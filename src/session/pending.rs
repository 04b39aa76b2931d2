// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pending change tracking.
//!
//! Every mutation of a workspace is recorded as a __pending change__ until it
//! gets checked in. A pending change is one of three kinds: an add of a path
//! the server has never seen, an edit of a path the server already has, or a
//! delete of a path the server already has.
//!
//! # Pending File Layout
//!
//! Pending changes survive process restarts. They are kept in a plain text
//! file inside the workspace's Git directory named `raft-pending`. Each line
//! holds one change, its kind, a single space, then the server path:
//!
//! ```text
//! add demo/scripts/deploy.otter
//! delete demo/roles/web.otter
//! edit demo/variables
//! ```
//!
//! Lines are sorted by path, and a path never shows up twice.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write, OpenOptions},
    path::PathBuf,
    str::FromStr,
};

/// Kind of pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    /// Path is new to the server.
    Add,

    /// Path exists on the server with new content.
    Edit,

    /// Path exists on the server and will be removed.
    Delete,
}

impl Display for ChangeKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let kind = match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
        };

        fmt.write_str(kind)
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "add" => Ok(Self::Add),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            other => Err(Error::UnknownKind { kind: other.into() }),
        }
    }
}

/// Manage pending changes in the pending file.
#[derive(Clone, Debug)]
pub struct PendingDrafter {
    pending_path: PathBuf,
}

impl PendingDrafter {
    /// Construct new pending change drafter.
    ///
    /// Creates the pending file if it does not already exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`Error::CreatePendingFile`] if pending file cannot be
    ///   created if missing.
    pub fn new(gitdir: impl Into<PathBuf>) -> Result<Self> {
        let pending_path = gitdir.into().join("raft-pending");

        // INVARIANT: Create pending file if needed.
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&pending_path)
            .map_err(|err| Error::CreatePendingFile {
                source: err,
                pending_path: pending_path.clone(),
            })?;

        Ok(Self { pending_path })
    }

    /// Edit pending changes.
    ///
    /// Read current change set into [`PendingEdit`] instance, and let the
    /// editor modify it before writing the results back into the pending
    /// file. Nothing is written if the editor left the set untouched.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadPendingFile`] if pending file cannot be read.
    /// - Return [`Error::Malformed`] if pending file cannot be parsed.
    /// - Return [`Error::WritePendingFile`] if changes cannot be written to
    ///   pending file.
    pub fn edit<E, T>(&self, editor: E) -> Result<T>
    where
        E: FnOnce(&mut PendingEdit) -> T,
    {
        let mut changes = self.load()?;
        let outcome = editor(&mut changes);

        if !changes.changed {
            return Ok(outcome);
        }

        write(&self.pending_path, changes.to_string().as_bytes()).map_err(|err| {
            Error::WritePendingFile {
                source: err,
                pending_path: self.pending_path.clone(),
            }
        })?;

        Ok(outcome)
    }

    /// List current pending changes.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadPendingFile`] if pending file cannot be read.
    /// - Return [`Error::Malformed`] if pending file cannot be parsed.
    pub fn current(&self) -> Result<BTreeMap<String, ChangeKind>> {
        Ok(self.load()?.changes)
    }

    fn load(&self) -> Result<PendingEdit> {
        let content = read_to_string(&self.pending_path).map_err(|err| Error::ReadPendingFile {
            source: err,
            pending_path: self.pending_path.clone(),
        })?;

        content.parse()
    }
}

/// Pending change editor.
///
/// # Invariant
///
/// - At most one pending change per path.
/// - An add stays an add until checked in, no matter how often it is edited.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    changes: BTreeMap<String, ChangeKind>,
    changed: bool,
}

impl PendingEdit {
    /// Construct new pending change editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pend an add of a path the local mirror does not have.
    ///
    /// Re-adding a path with a pending delete turns it into an edit.
    pub fn pend_add(&mut self, path: impl Into<String>) {
        let path = path.into();
        let kind = match self.changes.get(&path) {
            Some(ChangeKind::Delete) | Some(ChangeKind::Edit) => ChangeKind::Edit,
            Some(ChangeKind::Add) | None => ChangeKind::Add,
        };
        self.set(path, kind);
    }

    /// Pend an edit of a path the local mirror already has.
    pub fn pend_edit(&mut self, path: impl Into<String>) {
        let path = path.into();
        if self.changes.get(&path) == Some(&ChangeKind::Add) {
            return;
        }
        self.set(path, ChangeKind::Edit);
    }

    /// Pend a delete.
    ///
    /// A pending add is simply forgotten, since the server never saw it. A
    /// path tracked at the workspace head becomes a pending delete. Anything
    /// else is already satisfied. Returns whether something was deleted.
    pub fn pend_delete(&mut self, path: impl Into<String>, tracked: bool) -> bool {
        let path = path.into();
        match self.changes.get(&path) {
            Some(ChangeKind::Add) => {
                self.changes.remove(&path);
                self.changed = true;
                true
            }
            Some(ChangeKind::Delete) => false,
            Some(ChangeKind::Edit) => {
                self.set(path, ChangeKind::Delete);
                true
            }
            None if tracked => {
                self.set(path, ChangeKind::Delete);
                true
            }
            None => false,
        }
    }

    /// Clear all pending changes.
    pub fn clear(&mut self) {
        if !self.changes.is_empty() {
            self.changes.clear();
            self.changed = true;
        }
    }

    /// Pending change of a path, if any.
    pub fn get(&self, path: impl AsRef<str>) -> Option<ChangeKind> {
        self.changes.get(path.as_ref()).copied()
    }

    fn set(&mut self, path: String, kind: ChangeKind) {
        if self.changes.insert(path, kind) != Some(kind) {
            self.changed = true;
        }
    }
}

impl Display for PendingEdit {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        for (path, kind) in &self.changes {
            writeln!(fmt, "{kind} {path}")?;
        }

        Ok(())
    }
}

impl FromStr for PendingEdit {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut changes = BTreeMap::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (kind, path) = line.split_once(' ').ok_or(Error::Malformed {
                line: index + 1,
            })?;
            changes.insert(path.to_string(), kind.parse()?);
        }

        Ok(Self {
            changes,
            changed: false,
        })
    }
}

/// Pending change management error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pending file cannot be created when missing.
    #[error("failed to create pending file at {:?}", pending_path.display())]
    CreatePendingFile {
        #[source]
        source: std::io::Error,
        pending_path: PathBuf,
    },

    /// Pending file cannot be read from.
    #[error("failed to read from pending file at {:?}", pending_path.display())]
    ReadPendingFile {
        #[source]
        source: std::io::Error,
        pending_path: PathBuf,
    },

    /// Pending file cannot be written to.
    #[error("failed to write to pending file at {:?}", pending_path.display())]
    WritePendingFile {
        #[source]
        source: std::io::Error,
        pending_path: PathBuf,
    },

    /// Pending file line lacks a kind or a path.
    #[error("malformed pending change at line {line}")]
    Malformed { line: usize },

    /// Pending file line names an unknown change kind.
    #[error("unknown pending change kind {kind:?}")]
    UnknownKind { kind: String },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
