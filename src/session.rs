// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Workspace sessions.
//!
//! A __session__ owns the two expensive resources a raft needs: one
//! authenticated [`Connection`] to the server, and one local [`Workspace`]
//! mapped to the raft's server path prefix. Both start out unopened, and get
//! opened exactly once on first use. Closing the session releases both
//! handles, but leaves the workspace on disk so the next session can reuse
//! it instead of pulling everything again.
//!
//! # Concurrency
//!
//! A session is meant to be driven by one caller at a time. Two sessions
//! mapped to the same local path will step on each other's pending changes,
//! and nothing here guards against that.

pub mod connection;
pub mod pending;
pub mod workspace;

pub use connection::{Connection, Credentials};
pub use pending::ChangeKind;
pub use workspace::{OpenMode, Recursion, ServerItem, Workspace, WorkspaceMapping};

use std::{path::PathBuf, sync::Arc};
use tracing::{debug, warn};

/// Lazily opened connection and workspace for one raft.
#[derive(Debug)]
pub struct Session {
    url: String,
    credentials: Arc<Credentials>,
    mapping: WorkspaceMapping,
    connection: Option<Connection>,
    workspace: Option<Workspace>,
}

impl Session {
    /// Construct new session without touching the server or the disk.
    pub fn new(url: impl Into<String>, credentials: Credentials, mapping: WorkspaceMapping) -> Self {
        Self {
            url: url.into(),
            credentials: Arc::new(credentials),
            mapping,
            connection: None,
            workspace: None,
        }
    }

    /// Workspace mapping of the session.
    pub fn mapping(&self) -> &WorkspaceMapping {
        &self.mapping
    }

    /// Check whether the connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect to the server, or hand out the cached connection.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials.
    /// - Return [`SessionError::Git2`] if the server cannot be reached.
    pub fn connect(&mut self) -> Result<&mut Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                let connection = Connection::open(&self.url, Arc::clone(&self.credentials))?;
                if let Some(branch) = connection.default_branch() {
                    if branch != self.mapping.branch {
                        warn!(
                            "server head is {branch:?}, but raft uses branch {:?}",
                            self.mapping.branch
                        );
                    }
                }
                connection
            }
        };

        Ok(self.connection.insert(connection))
    }

    /// Open the workspace, or hand out the cached workspace.
    ///
    /// Connects first if needed.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials.
    /// - Return [`SessionError::WorkspaceUnavailable`] if the workspace cannot
    ///   be created, mapped, or refreshed.
    pub fn open_workspace(&mut self) -> Result<&mut Workspace> {
        let workspace = match self.workspace.take() {
            Some(workspace) => workspace,
            None => {
                let connection = self.connect()?;
                let (url, credentials) = (connection.url().to_string(), connection.credentials());
                Workspace::open(&url, credentials, &self.mapping)?
            }
        };

        Ok(self.workspace.insert(workspace))
    }

    /// Check whether the authenticated identity lacks check-in permission.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if connecting fails on
    ///   rejected credentials.
    pub fn is_read_only(&mut self) -> Result<bool> {
        Ok(!self.connect()?.has_check_in_permission()?)
    }

    /// Release the connection and workspace handles.
    ///
    /// Safe to call repeatedly, and safe to call on a session that never
    /// opened anything. The workspace stays on disk.
    pub fn close(&mut self) {
        if self.workspace.take().is_some() {
            debug!("release workspace {:?}", self.mapping.name);
        }

        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }
}

/// All possible error types for session interaction.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Server rejected the credentials.
    #[error("authentication against {url:?} was rejected")]
    Authentication {
        url: String,
        #[source]
        source: git2::Error,
    },

    /// Local workspace cannot be created, mapped, or refreshed.
    #[error("workspace at {:?} is unavailable: {reason}", path.display())]
    WorkspaceUnavailable { path: PathBuf, reason: String },

    /// Server rejected a check-in.
    #[error("check-in rejected by server: {reason}")]
    CheckInConflict { reason: String },

    /// Server path lies outside of the mapped prefix.
    #[error("server path {path:?} is not mapped by prefix {prefix:?}")]
    Unmapped { path: String, prefix: String },

    /// Item query pattern is not a valid glob.
    #[error("invalid item pattern {pattern:?}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Pending change bookkeeping fails.
    #[error(transparent)]
    Pending(#[from] pending::Error),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Local mirror file I/O fails.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SessionError> = std::result::Result<T, E>;
