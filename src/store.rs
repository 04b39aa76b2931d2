// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Raft store management and manipulation.
//!
//! A __raft__ is a named collection of typed items plus a flat table of
//! variables. The raft store persists one raft in a remote repository, and
//! works on it through a local workspace.
//!
//! # Raft Layout
//!
//! Everything belonging to a raft sits below one server path prefix, which is
//! the raft name unless configured otherwise. Each item type has its own
//! folder, and each item is one file in it. See [`naming`](crate::naming)
//! for the exact layout.
//!
//! # Pending Changes
//!
//! Writes, deletes, and variable updates only touch the local workspace and
//! record pending changes. Reads see those changes right away. Nothing is
//! visible to anybody else until [`RaftStore::commit`] checks every pending
//! change in as one revision.
//!
//! Item listings and lookups, on the other hand, ask the server. They only
//! report checked in items.
//!
//! # Missing Things
//!
//! Asking for something that is not there is not an error. Missing items
//! come back as [`None`], a missing variable table is an empty mapping, and
//! deleting something that does not exist simply does nothing.

use crate::{
    config::{RaftDefinition, RaftSettings},
    naming::{
        item_path, item_pattern, parse_item_path, type_folder, variables_path, RaftItemType,
        ITEM_EXTENSION,
    },
    path::NoWayHome,
    session::{
        ChangeKind, Credentials, OpenMode, Recursion, ServerItem, Session, SessionError,
        Workspace, WorkspaceMapping,
    },
    variables::{VariableError, VariableTable},
};

use git2::{Oid, Signature};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Write},
    time::SystemTime,
    vec::IntoIter,
};
use tracing::{debug, info, instrument};

const FALLBACK_EMAIL: &str = "raft@localhost";

/// Named, typed document of a raft.
///
/// Snapshot of the server state at the time it was listed. Fetch it again to
/// see later check-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaftItem {
    kind: RaftItemType,
    name: String,
    last_modified: SystemTime,
}

impl RaftItem {
    /// Type of the item.
    pub fn kind(&self) -> RaftItemType {
        self.kind
    }

    /// Name of the item, unique within its type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time of the last check-in that changed the item.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }
}

/// Someone who commits changes to a raft.
pub trait CommitAuthor {
    /// Name shown in the revision history.
    fn display_name(&self) -> &str;

    /// Email address recorded with the revision.
    fn email(&self) -> Option<&str> {
        None
    }
}

impl CommitAuthor for str {
    fn display_name(&self) -> &str {
        self
    }
}

impl CommitAuthor for String {
    fn display_name(&self) -> &str {
        self
    }
}

/// Basic commit author.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct User {
    /// Name shown in the revision history.
    pub display_name: String,

    /// Email address recorded with the revision.
    pub email: Option<String>,
}

impl CommitAuthor for User {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Raft persisted in a remote repository.
///
/// The connection and workspace are opened on first use, and kept for the
/// lifetime of the store. Dropping or [closing](RaftStore::close) the store
/// releases them, but the workspace stays on disk for the next store.
#[derive(Debug)]
pub struct RaftStore {
    settings: RaftSettings,
    prefix: String,
    session: Session,
}

impl RaftStore {
    /// Construct new raft store from a raft definition.
    ///
    /// Does not touch the server or the disk.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Path`] if the default workspace location cannot
    ///   be determined.
    pub fn new(definition: RaftDefinition) -> Result<Self> {
        let credentials = Credentials::from_settings(&definition.settings);
        Self::with_credentials(definition, credentials)
    }

    /// Construct new raft store with explicit credentials.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Path`] if the default workspace location cannot
    ///   be determined.
    pub fn with_credentials(definition: RaftDefinition, credentials: Credentials) -> Result<Self> {
        let settings = definition.settings;
        let prefix = settings.resolved_prefix();
        let mapping = WorkspaceMapping {
            name: settings.resolved_workspace_name()?,
            local_path: settings.resolved_workspace_path()?,
            prefix: prefix.clone(),
            branch: settings.branch.clone(),
        };
        let session = Session::new(settings.base_url.clone(), credentials, mapping);

        Ok(Self {
            settings,
            prefix,
            session,
        })
    }

    /// Name of the raft.
    pub fn raft_name(&self) -> &str {
        &self.settings.raft_name
    }

    /// Server path prefix of the raft.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Workspace mapping used by the raft.
    pub fn mapping(&self) -> &WorkspaceMapping {
        self.session.mapping()
    }

    /// Check whether the authenticated identity lacks check-in permission.
    ///
    /// Advisory only. Mutations stay callable, and fail at commit time.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] if connecting fails.
    pub fn is_read_only(&mut self) -> Result<bool> {
        Ok(self.session.is_read_only()?)
    }

    /// List every checked in item of every type.
    ///
    /// Items come grouped by type in [`RaftItemType::all`] order, then in
    /// server listing order. Folders under the raft prefix that are not item
    /// type folders are skipped.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] if the workspace cannot be opened or
    ///   the server cannot be queried.
    pub fn list_all_items(&mut self) -> Result<RaftItems<'_>> {
        let workspace = self.workspace()?;
        workspace.fetch()?;

        Ok(RaftItems::new(
            workspace,
            RaftItemType::all().collect(),
            Recursion::OneLevel,
        ))
    }

    /// List every checked in item of one type.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] if the workspace cannot be opened or
    ///   the server cannot be queried.
    pub fn list_items(&mut self, kind: RaftItemType) -> Result<RaftItems<'_>> {
        let workspace = self.workspace()?;
        workspace.fetch()?;

        Ok(RaftItems::new(workspace, vec![kind], Recursion::None))
    }

    /// Look up one checked in item.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::InvalidItemName`] if the name cannot be an item.
    /// - Return [`RaftError::Session`] if the workspace cannot be opened or
    ///   the server cannot be queried.
    #[instrument(skip(self), level = "debug")]
    pub fn get_item(&mut self, kind: RaftItemType, name: &str) -> Result<Option<RaftItem>> {
        validate_item_name(name)?;
        let path = item_path(&self.prefix, kind, name);
        let pattern = format!(
            "{}/{}.{ITEM_EXTENSION}",
            type_folder(&self.prefix, kind),
            glob::Pattern::escape(name)
        );

        let workspace = self.workspace()?;
        workspace.fetch()?;
        let found = workspace
            .query_items(&pattern, Recursion::None)?
            .into_iter()
            .find(|item| item.path == path)
            .map(|item| RaftItem {
                kind,
                name: name.to_string(),
                last_modified: item.last_modified,
            });

        Ok(found)
    }

    /// Open an item stream.
    ///
    /// Write-intending modes pend an add or an edit before handing out the
    /// stream. Reading an item the local mirror does not have gives [`None`].
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::InvalidItemName`] if the name cannot be an item.
    /// - Return [`RaftError::Session`] if the workspace cannot be opened, or
    ///   the local mirror file cannot be opened.
    #[instrument(skip(self), level = "debug")]
    pub fn open_item(
        &mut self,
        kind: RaftItemType,
        name: &str,
        mode: OpenMode,
    ) -> Result<Option<File>> {
        validate_item_name(name)?;
        let path = item_path(&self.prefix, kind, name);
        let workspace = self.workspace()?;

        if mode.is_write() {
            return Ok(Some(workspace.write_item(&path, mode)?));
        }

        Ok(workspace.read_item(&path)?)
    }

    /// Pend a delete of an item.
    ///
    /// Deleting an item that does not exist does nothing.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::InvalidItemName`] if the name cannot be an item.
    /// - Return [`RaftError::Session`] if the workspace cannot be opened or
    ///   the delete cannot be recorded.
    #[instrument(skip(self), level = "debug")]
    pub fn delete_item(&mut self, kind: RaftItemType, name: &str) -> Result<()> {
        validate_item_name(name)?;
        let path = item_path(&self.prefix, kind, name);
        if !self.workspace()?.delete_item(&path)? {
            debug!("item {kind}/{name} does not exist, nothing to delete");
        }

        Ok(())
    }

    /// Read the variable table.
    ///
    /// Sees uncommitted variable updates. A raft that never stored any
    /// variables has an empty table.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::MalformedStoredData`] if the stored table cannot
    ///   be parsed.
    /// - Return [`RaftError::Session`] if the workspace cannot be opened.
    pub fn get_variables(&mut self) -> Result<BTreeMap<String, String>> {
        Ok(self.load_variables()?.into_map())
    }

    /// Insert or overwrite a variable.
    ///
    /// Rewrites the whole variable table. Not safe against another store
    /// updating the same raft at the same time, the last check-in wins.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::InvalidVariableName`] if the name cannot be
    ///   stored.
    /// - Return [`RaftError::MalformedStoredData`] if the stored table cannot
    ///   be parsed.
    /// - Return [`RaftError::Session`] if the table cannot be written.
    #[instrument(skip(self, value), level = "debug")]
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        let mut table = self.load_variables()?;
        table
            .insert(name, value)
            .map_err(|_| RaftError::InvalidVariableName {
                name: name.to_string(),
            })?;

        self.save_variables(&table)
    }

    /// Remove a variable, returning whether it was present.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::MalformedStoredData`] if the stored table cannot
    ///   be parsed.
    /// - Return [`RaftError::Session`] if the table cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn delete_variable(&mut self, name: &str) -> Result<bool> {
        let mut table = self.load_variables()?;
        if !table.remove(name) {
            return Ok(false);
        }

        self.save_variables(&table)?;
        Ok(true)
    }

    /// List pending changes of the workspace.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] if the workspace cannot be opened.
    pub fn pending_changes(&mut self) -> Result<BTreeMap<String, ChangeKind>> {
        Ok(self.workspace()?.pending_changes()?)
    }

    /// Get latest from the server into the workspace.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] if the workspace cannot be refreshed.
    pub fn refresh(&mut self) -> Result<()> {
        Ok(self.session.open_workspace()?.refresh()?)
    }

    /// Check in every pending change as one revision by the given author.
    ///
    /// Returns the new revision, or [`None`] if nothing changed.
    ///
    /// # Errors
    ///
    /// - Return [`RaftError::Session`] wrapping
    ///   [`SessionError::CheckInConflict`] if the server rejects the
    ///   revision.
    #[instrument(skip(self, author), level = "debug")]
    pub fn commit(&mut self, author: &(impl CommitAuthor + ?Sized)) -> Result<Option<Oid>> {
        let signature = Signature::now(
            author.display_name(),
            author.email().unwrap_or(FALLBACK_EMAIL),
        )
        .map_err(SessionError::from)?;
        let message = format!("Updated by raft user {}.", author.display_name());

        let revision = self.workspace()?.check_in(&signature, &message)?;
        if let Some(revision) = revision {
            info!("raft {:?} now at {revision}", self.settings.raft_name);
        }

        Ok(revision)
    }

    /// Release the connection and workspace handles.
    ///
    /// Safe to call repeatedly, and without ever having used the store. The
    /// workspace stays on disk.
    pub fn close(&mut self) {
        self.session.close();
    }

    fn workspace(&mut self) -> Result<&Workspace> {
        let workspace: &Workspace = self.session.open_workspace()?;
        Ok(workspace)
    }

    fn load_variables(&mut self) -> Result<VariableTable> {
        let path = variables_path(&self.prefix);
        let Some(mut file) = self.workspace()?.read_item(&path)? else {
            return Ok(VariableTable::new());
        };

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        VariableTable::from_bytes(&content)
            .map_err(|source| RaftError::MalformedStoredData { path, source })
    }

    fn save_variables(&mut self, table: &VariableTable) -> Result<()> {
        let path = variables_path(&self.prefix);
        let mut file = self.workspace()?.write_item(&path, OpenMode::Write)?;
        file.write_all(table.to_string().as_bytes())?;

        Ok(())
    }
}

impl Drop for RaftStore {
    fn drop(&mut self) {
        self.session.close();
    }
}

/// Lazy listing of raft items.
///
/// Queries the server one item type at a time, only when the previous type
/// has been exhausted.
pub struct RaftItems<'a> {
    workspace: &'a Workspace,
    kinds: IntoIter<RaftItemType>,
    recursion: Recursion,
    current: IntoIter<ServerItem>,
}

impl<'a> RaftItems<'a> {
    fn new(workspace: &'a Workspace, kinds: Vec<RaftItemType>, recursion: Recursion) -> Self {
        Self {
            workspace,
            kinds: kinds.into_iter(),
            recursion,
            current: Vec::new().into_iter(),
        }
    }
}

impl Iterator for RaftItems<'_> {
    type Item = Result<RaftItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                // INVARIANT: Skip anything that does not map back to an item,
                // e.g., files in nested folders.
                match parse_item_path(self.workspace.prefix(), &item.path) {
                    Some((kind, name)) => {
                        return Some(Ok(RaftItem {
                            kind,
                            name,
                            last_modified: item.last_modified,
                        }))
                    }
                    None => {
                        debug!("skip foreign item {:?}", item.path);
                        continue;
                    }
                }
            }

            let kind = self.kinds.next()?;
            let pattern = item_pattern(self.workspace.prefix(), kind);
            let prefix = self.workspace.prefix();
            let maps_to_item = |path: &str| parse_item_path(prefix, path).is_some();
            match self
                .workspace
                .query_items_where(&pattern, self.recursion, maps_to_item)
            {
                Ok(items) => self.current = items.into_iter(),
                Err(err) => {
                    self.kinds = Vec::new().into_iter();
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

fn validate_item_name(name: &str) -> Result<()> {
    // INVARIANT: Control characters would split a pending change line.
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control);

    if !valid {
        return Err(RaftError::InvalidItemName { name: name.into() });
    }

    Ok(())
}

/// All possible error types for raft store interaction.
#[derive(Debug, thiserror::Error)]
pub enum RaftError {
    /// Connection, workspace, or check-in fails.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Stored variable table cannot be parsed.
    #[error("stored variable table at {path:?} is malformed")]
    MalformedStoredData {
        path: String,
        #[source]
        source: VariableError,
    },

    /// Variable name cannot be stored.
    #[error("invalid variable name {name:?}")]
    InvalidVariableName { name: String },

    /// Item name cannot be mapped to a server path.
    #[error("invalid item name {name:?}")]
    InvalidItemName { name: String },

    /// Default workspace location cannot be determined.
    #[error(transparent)]
    Path(#[from] NoWayHome),

    /// Item or variable table I/O fails.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RaftError {
    /// Check whether the server rejected a check-in.
    pub fn is_check_in_conflict(&self) -> bool {
        matches!(self, Self::Session(SessionError::CheckInConflict { .. }))
    }

    /// Check whether the server rejected the credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Session(SessionError::Authentication { .. }))
    }
}

/// Friendly result alias :3
pub type Result<T, E = RaftError> = std::result::Result<T, E>;
