// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local workspace logic.
//!
//! A __workspace__ is a non-bare repository on local disk whose `origin`
//! points at the server. The server path prefix of the raft is mapped into
//! the workspace, so every server path below that prefix has exactly one
//! local mirror file under the workspace's working tree.
//!
//! The workspace distinguishes two views of the server:
//!
//! - The __server view__ is the remote-tracking branch. Item queries run
//!   against it, so they only ever report checked in items.
//! - The __local mirror__ is the working tree. Reads and writes go through
//!   it, so callers always see their own uncommitted writes.
//!
//! Writes and deletes are recorded as pending changes. Nothing reaches the
//! server until [`Workspace::check_in`] stages every pending change, commits
//! them as one revision, and pushes that revision.

use crate::session::{
    connection::{classify, Credentials},
    pending::{ChangeKind, PendingDrafter, PendingEdit},
    Result, SessionError,
};

use git2::{
    build::CheckoutBuilder, Commit, Config, ErrorCode, FetchOptions, ObjectType, Oid,
    PushOptions, Repository, RepositoryInitOptions, ResetType, Signature, Sort, Time, Tree,
};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    fs::{remove_file, File, OpenOptions},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument, warn};

const CONFIG_WORKSPACE: &str = "raft.workspace";
const CONFIG_PREFIX: &str = "raft.prefix";

/// Where and how a workspace gets mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMapping {
    /// Workspace name, already sanitized.
    pub name: String,

    /// Local disk path of the workspace.
    pub local_path: PathBuf,

    /// Server path prefix mapped into the workspace.
    pub prefix: String,

    /// Branch acting as the server head.
    pub branch: String,
}

/// How far an item query descends below its folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    /// Only files directly inside the folder.
    None,

    /// Files inside the folder and inside its immediate subfolders.
    OneLevel,
}

/// Item descriptor reported by the server view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerItem {
    /// Server path of the item.
    pub path: String,

    /// Time of the last check-in that changed the item.
    pub last_modified: SystemTime,
}

/// How an item stream gets opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read existing content.
    Read,

    /// Replace content, creating the item if needed.
    Write,

    /// Append to content, creating the item if needed.
    Append,

    /// Read and write in place, creating the item if needed.
    ReadWrite,
}

impl OpenMode {
    /// Check whether the mode intends to modify the item.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Read)
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::Write => options.write(true).create(true).truncate(true),
            Self::Append => options.append(true).create(true),
            Self::ReadWrite => options.read(true).write(true).create(true).truncate(false),
        };

        options
    }
}

/// Local workspace mirroring one server path prefix.
pub struct Workspace {
    repository: Repository,
    workdir: PathBuf,
    mapping: WorkspaceMapping,
    credentials: Arc<Credentials>,
    pending: PendingDrafter,
}

impl Workspace {
    /// Open or create the workspace, map the prefix, and get latest.
    ///
    /// An existing workspace at the local path is reused as long as it
    /// points at the same server and carries the same workspace name.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::WorkspaceUnavailable`] if the workspace
    ///   cannot be created, mapped, or refreshed.
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials while getting latest.
    #[instrument(skip(credentials, mapping), level = "debug")]
    pub fn open(url: &str, credentials: Arc<Credentials>, mapping: &WorkspaceMapping) -> Result<Self> {
        Self::try_open(url, credentials, mapping).map_err(|err| match err {
            SessionError::Git2(source) => SessionError::WorkspaceUnavailable {
                path: mapping.local_path.clone(),
                reason: source.message().to_string(),
            },
            SessionError::Io(source) => SessionError::WorkspaceUnavailable {
                path: mapping.local_path.clone(),
                reason: source.to_string(),
            },
            SessionError::Pending(source) => SessionError::WorkspaceUnavailable {
                path: mapping.local_path.clone(),
                reason: source.to_string(),
            },
            other => other,
        })
    }

    fn try_open(url: &str, credentials: Arc<Credentials>, mapping: &WorkspaceMapping) -> Result<Self> {
        let repository = match Repository::open(&mapping.local_path) {
            Ok(repository) => {
                debug!("reuse workspace at {:?}", mapping.local_path.display());
                verify_origin(&repository, url, &mapping.local_path)?;
                repository
            }
            Err(err) if err.code() == ErrorCode::NotFound => create_repository(url, mapping)?,
            Err(err) => return Err(err.into()),
        };

        let workdir = repository
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| SessionError::WorkspaceUnavailable {
                path: mapping.local_path.clone(),
                reason: "workspace has no working tree".into(),
            })?;

        bind_mapping(&repository, mapping)?;
        let pending = PendingDrafter::new(repository.path())?;
        let mut workspace = Self {
            repository,
            workdir,
            mapping: mapping.clone(),
            credentials,
            pending,
        };
        workspace.refresh()?;

        Ok(workspace)
    }

    /// Name of the workspace.
    pub fn name(&self) -> &str {
        &self.mapping.name
    }

    /// Server path prefix mapped into the workspace.
    pub fn prefix(&self) -> &str {
        &self.mapping.prefix
    }

    /// Resolve the local mirror path of a server path.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Unmapped`] if the server path lies outside
    ///   the mapped prefix, or tries to escape it.
    pub fn local_path(&self, server_path: &str) -> Result<PathBuf> {
        let prefix = self.mapping.prefix.as_str();
        let inside = prefix.is_empty()
            || server_path == prefix
            || server_path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
        let escapes = Path::new(server_path)
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));

        if !inside || escapes || server_path.is_empty() {
            return Err(SessionError::Unmapped {
                path: server_path.to_string(),
                prefix: prefix.to_string(),
            });
        }

        Ok(self.workdir.join(server_path))
    }

    /// Get latest from the server.
    ///
    /// Fetches the server head and moves the local mirror onto it. Every
    /// file with a pending change keeps its local content, so local work
    /// survives even when the server changed the same file. The next
    /// check-in then lays the pending changes on top of the server head.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials.
    /// - Return [`SessionError::Git2`] if fetching or checkout fails.
    /// - Return [`SessionError::Pending`] if pending changes cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub fn refresh(&mut self) -> Result<()> {
        self.fetch()?;
        let Some(server_head) = self.server_head()? else {
            debug!("server has no branch {:?} yet", self.mapping.branch);
            return Ok(());
        };

        let local_tree = match self.local_head()? {
            Some(local) if local.id() == server_head.id() => {
                debug!("workspace {:?} is up to date", self.mapping.name);
                return Ok(());
            }
            Some(local) => Some(local.tree()?),
            None => None,
        };

        info!(
            "update workspace {:?} to {}",
            self.mapping.name,
            server_head.id()
        );
        let pending = self.pending.current()?;
        let incoming = changed_paths(
            &self.repository,
            local_tree.as_ref(),
            &server_head.tree()?,
        )?;
        let (kept, updated): (Vec<_>, Vec<_>) = incoming
            .into_iter()
            .partition(|path| pending.contains_key(path));
        for path in &kept {
            warn!("keep local change to {path:?} over server update");
        }

        // INVARIANT: Never check out with an empty path list.
        //   - An empty path list makes checkout touch every path.
        if !updated.is_empty() {
            let mut checkout = CheckoutBuilder::new();
            checkout.force().disable_pathspec_match(true);
            for path in &updated {
                checkout.path(path.as_str());
            }
            self.repository
                .checkout_tree(server_head.as_object(), Some(&mut checkout))?;
        }

        // INVARIANT: Mixed reset moves branch and index but leaves the
        // working tree, and with it every pending file, alone.
        self.repository
            .reset(server_head.as_object(), ResetType::Mixed, None)?;

        Ok(())
    }

    /// Update the server view without touching the local mirror.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials.
    /// - Return [`SessionError::Git2`] if fetching fails.
    pub fn fetch(&self) -> Result<()> {
        let config = Config::open_default()?;
        let mut remote = self.repository.find_remote("origin")?;
        let url = remote.url().unwrap_or_default().to_string();
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.credentials.remote_callbacks(&config));

        // INVARIANT: Use the configured refspec of origin, which maps every
        // server branch to its remote-tracking branch.
        let refspecs: [&str; 0] = [];
        remote
            .fetch(&refspecs, Some(&mut options), None)
            .map_err(|err| classify(&url, err))?;

        Ok(())
    }

    /// Query checked in items by path pattern.
    ///
    /// The pattern is a folder path followed by a glob over file names, e.g.,
    /// `demo/scripts/*.otter`. Items come back in server listing order,
    /// which is alphabetical per folder.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Pattern`] if the file name glob is invalid.
    /// - Return [`SessionError::Git2`] if the server view cannot be read.
    pub fn query_items(&self, pattern: &str, recursion: Recursion) -> Result<Vec<ServerItem>> {
        self.query_items_where(pattern, recursion, |_| true)
    }

    /// Query checked in items by path pattern, keeping only accepted paths.
    ///
    /// Rejected paths are dropped before history is searched for their
    /// last modification time.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Pattern`] if the file name glob is invalid.
    /// - Return [`SessionError::Git2`] if the server view cannot be read.
    #[instrument(skip(self, accept), level = "debug")]
    pub fn query_items_where(
        &self,
        pattern: &str,
        recursion: Recursion,
        accept: impl Fn(&str) -> bool,
    ) -> Result<Vec<ServerItem>> {
        let Some(head) = self.server_head()? else {
            return Ok(Vec::new());
        };

        let (folder, name_glob) = pattern.rsplit_once('/').unwrap_or(("", pattern));
        let matcher = glob::Pattern::new(name_glob).map_err(|err| SessionError::Pattern {
            pattern: pattern.to_string(),
            source: err,
        })?;

        let root = head.tree()?;
        let folder_tree = if folder.is_empty() {
            root
        } else {
            match root.get_path(Path::new(folder)) {
                Ok(entry) if entry.kind() == Some(ObjectType::Tree) => {
                    self.repository.find_tree(entry.id())?
                }
                Ok(_) => return Ok(Vec::new()),
                Err(err) if err.code() == ErrorCode::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            }
        };

        let mut paths = Vec::new();
        for entry in folder_tree.iter() {
            let Some(name) = entry.name() else {
                continue;
            };

            match entry.kind() {
                Some(ObjectType::Blob) if matcher.matches(name) => {
                    paths.push(join_path(folder, name));
                }
                // INVARIANT: Descend exactly one level and no further.
                Some(ObjectType::Tree) if recursion == Recursion::OneLevel => {
                    let subfolder = join_path(folder, name);
                    let subtree = self.repository.find_tree(entry.id())?;
                    paths.extend(matching_blobs(&subtree, &matcher, &subfolder));
                }
                _ => continue,
            }
        }

        paths.retain(|path| accept(path));
        let mut times = self.last_modified(&head, &paths)?;
        Ok(paths
            .into_iter()
            .map(|path| {
                let last_modified = times
                    .remove(&path)
                    .unwrap_or_else(|| to_system_time(head.time()));
                ServerItem {
                    path,
                    last_modified,
                }
            })
            .collect())
    }

    /// Open the local mirror of a server path for reading.
    ///
    /// Returns [`None`] if the local mirror does not have the file, either
    /// because it was never checked in or because it has a pending delete.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Unmapped`] if the path lies outside the
    ///   mapped prefix.
    /// - Return [`SessionError::Io`] if the file exists but cannot be opened.
    pub fn read_item(&self, server_path: &str) -> Result<Option<File>> {
        let local_path = self.local_path(server_path)?;
        match File::open(&local_path) {
            Ok(file) => Ok(Some(file)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Open the local mirror of a server path for writing.
    ///
    /// Pends an add if the local mirror does not have the file yet, or an
    /// edit if it does, then opens the file with the requested mode.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Unmapped`] if the path lies outside the
    ///   mapped prefix.
    /// - Return [`SessionError::Pending`] if the change cannot be recorded.
    /// - Return [`SessionError::Io`] if the file cannot be opened.
    #[instrument(skip(self), level = "debug")]
    pub fn write_item(&self, server_path: &str, mode: OpenMode) -> Result<File> {
        let local_path = self.local_path(server_path)?;
        if let Some(parent) = local_path.parent() {
            mkdirp::mkdirp(parent)?;
        }

        let exists = local_path.exists();
        self.pending.edit(|changes| {
            if exists {
                changes.pend_edit(server_path);
            } else {
                changes.pend_add(server_path);
            }
        })?;
        debug!("pend {} of {server_path:?}", if exists { "edit" } else { "add" });

        Ok(mode.options().open(&local_path)?)
    }

    /// Pend a delete of a server path.
    ///
    /// The local mirror file is removed right away, but the server copy stays
    /// until check-in. Deleting a path that neither the server nor the
    /// pending changes know about is a no-op, and returns `false`.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Unmapped`] if the path lies outside the
    ///   mapped prefix.
    /// - Return [`SessionError::Pending`] if the change cannot be recorded.
    #[instrument(skip(self), level = "debug")]
    pub fn delete_item(&self, server_path: &str) -> Result<bool> {
        let local_path = self.local_path(server_path)?;
        let tracked = self.is_tracked(server_path)?;
        let deleted = self
            .pending
            .edit(|changes| changes.pend_delete(server_path, tracked))?;

        if !deleted {
            debug!("nothing to delete at {server_path:?}");
            return Ok(false);
        }

        match remove_file(&local_path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        Ok(true)
    }

    /// List pending changes.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Pending`] if the pending file is unreadable.
    pub fn pending_changes(&self) -> Result<BTreeMap<String, ChangeKind>> {
        Ok(self.pending.current()?)
    }

    /// Check in every pending change as one revision.
    ///
    /// Returns the new revision, or [`None`] if there was nothing to check
    /// in. Pending changes are cleared only when the server accepted the
    /// revision. On rejection the local branch is rolled back, so the pending
    /// changes can be checked in again after a refresh.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::CheckInConflict`] if the server rejects the
    ///   revision.
    /// - Return [`SessionError::Git2`] if the revision cannot be built.
    #[instrument(skip(self, signature), level = "debug")]
    pub fn check_in(&self, signature: &Signature<'_>, message: &str) -> Result<Option<Oid>> {
        let pending = self.pending.current()?;
        if pending.is_empty() {
            info!("no pending changes in workspace {:?}", self.mapping.name);
            return Ok(None);
        }

        let mut index = self.repository.index()?;
        for (path, kind) in &pending {
            let relative = Path::new(path);
            match kind {
                ChangeKind::Add | ChangeKind::Edit if self.workdir.join(relative).exists() => {
                    index.add_path(relative)?;
                }
                _ => index.remove_path(relative)?,
            }
        }
        index.write()?;

        let tree = self.repository.find_tree(index.write_tree()?)?;
        let parent = self.local_head()?;
        if parent
            .as_ref()
            .is_some_and(|parent| parent.tree_id() == tree.id())
        {
            info!("pending changes match server state, nothing to check in");
            self.pending.edit(PendingEdit::clear)?;
            return Ok(None);
        }

        let parents = parent.iter().collect::<Vec<_>>();
        let oid = self.repository.commit(
            Some(&self.branch_ref()),
            signature,
            signature,
            message,
            &tree,
            &parents,
        )?;
        info!("check in {} pending changes as {oid}", pending.len());

        if let Err(err) = self.push() {
            warn!("check-in {oid} rejected, roll back workspace");
            self.roll_back(parent.as_ref())?;
            return Err(err);
        }

        self.repository
            .reference(&self.tracking_ref(), oid, true, "raft: check in")?;
        self.pending.edit(PendingEdit::clear)?;

        Ok(Some(oid))
    }

    fn push(&self) -> Result<()> {
        let config = Config::open_default()?;
        let mut remote = self.repository.find_remote("origin")?;
        let refspec = format!("{0}:{0}", self.branch_ref());

        let mut rejection: Option<String> = None;
        let mut callbacks = self.credentials.remote_callbacks(&config);
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejection = Some(format!("{refname}: {status}"));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        let result = remote.push(&[refspec.as_str()], Some(&mut options));
        drop(options);

        match (result, rejection) {
            (Err(err), _) => Err(SessionError::CheckInConflict {
                reason: err.message().to_string(),
            }),
            (Ok(()), Some(reason)) => Err(SessionError::CheckInConflict { reason }),
            (Ok(()), None) => Ok(()),
        }
    }

    fn roll_back(&self, parent: Option<&Commit<'_>>) -> Result<()> {
        match parent {
            Some(parent) => {
                self.repository
                    .reset(parent.as_object(), ResetType::Mixed, None)?;
            }
            None => {
                self.repository.find_reference(&self.branch_ref())?.delete()?;
                let mut index = self.repository.index()?;
                index.clear()?;
                index.write()?;
            }
        }

        Ok(())
    }

    fn is_tracked(&self, server_path: &str) -> Result<bool> {
        let Some(head) = self.local_head()? else {
            return Ok(false);
        };

        Ok(entry_id(&head.tree()?, server_path)?.is_some())
    }

    /// Resolve the time of the last check-in that changed each path.
    ///
    /// Walks history once for all paths, newest first, and stops as soon as
    /// every path is resolved.
    fn last_modified(
        &self,
        head: &Commit<'_>,
        server_paths: &[String],
    ) -> Result<BTreeMap<String, SystemTime>> {
        let mut times = BTreeMap::new();
        if server_paths.is_empty() {
            return Ok(times);
        }

        let mut walk = self.repository.revwalk()?;
        walk.push(head.id())?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        for oid in walk {
            let commit = self.repository.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree()?),
                Err(_) => None,
            };

            for path in server_paths {
                if times.contains_key(path) {
                    continue;
                }

                let current = entry_id(&tree, path)?;
                let previous = match &parent_tree {
                    Some(parent_tree) => entry_id(parent_tree, path)?,
                    None => None,
                };
                if current != previous {
                    times.insert(path.clone(), to_system_time(commit.time()));
                }
            }

            if times.len() == server_paths.len() {
                break;
            }
        }

        Ok(times)
    }

    fn local_head(&self) -> Result<Option<Commit<'_>>> {
        self.find_commit(&self.branch_ref())
    }

    fn server_head(&self) -> Result<Option<Commit<'_>>> {
        self.find_commit(&self.tracking_ref())
    }

    fn find_commit(&self, refname: &str) -> Result<Option<Commit<'_>>> {
        match self.repository.find_reference(refname) {
            Ok(reference) => Ok(Some(reference.peel_to_commit()?)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.mapping.branch)
    }

    fn tracking_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.mapping.branch)
    }
}

impl Debug for Workspace {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Workspace")
            .field("name", &self.mapping.name)
            .field("prefix", &self.mapping.prefix)
            .field("workdir", &self.workdir)
            .finish_non_exhaustive()
    }
}

/// Paths that differ between two trees, in either direction.
fn changed_paths(
    repository: &Repository,
    old: Option<&Tree<'_>>,
    new: &Tree<'_>,
) -> Result<Vec<String>> {
    let diff = repository.diff_tree_to_tree(old, Some(new), None)?;
    let mut paths = Vec::new();
    for delta in diff.deltas() {
        for file in [delta.old_file(), delta.new_file()] {
            let Some(path) = file.path().and_then(Path::to_str) else {
                continue;
            };
            if !paths.iter().any(|known| known == path) {
                paths.push(path.to_string());
            }
        }
    }

    Ok(paths)
}

fn create_repository(url: &str, mapping: &WorkspaceMapping) -> Result<Repository> {
    let path = &mapping.local_path;
    if path.exists() && path.read_dir()?.next().is_some() {
        return Err(SessionError::WorkspaceUnavailable {
            path: path.clone(),
            reason: "path is occupied by something other than a workspace".into(),
        });
    }

    info!("create workspace {:?} at {:?}", mapping.name, path.display());
    let mut options = RepositoryInitOptions::new();
    options.initial_head(&mapping.branch);
    let repository = Repository::init_opts(path, &options)?;
    repository.remote("origin", url)?;

    Ok(repository)
}

fn verify_origin(repository: &Repository, url: &str, path: &Path) -> Result<()> {
    let remote = repository.find_remote("origin")?;
    if remote.url() != Some(url) {
        return Err(SessionError::WorkspaceUnavailable {
            path: path.to_path_buf(),
            reason: format!("workspace is bound to server {:?}", remote.url().unwrap_or_default()),
        });
    }

    Ok(())
}

fn bind_mapping(repository: &Repository, mapping: &WorkspaceMapping) -> Result<()> {
    let mut config = repository.config()?;

    match config.get_string(CONFIG_WORKSPACE) {
        Ok(name) if name != mapping.name => {
            return Err(SessionError::WorkspaceUnavailable {
                path: mapping.local_path.clone(),
                reason: format!("local path is mapped by workspace {name:?}"),
            });
        }
        Ok(_) => {}
        Err(err) if err.code() == ErrorCode::NotFound => {
            config.set_str(CONFIG_WORKSPACE, &mapping.name)?;
        }
        Err(err) => return Err(err.into()),
    }

    match config.get_string(CONFIG_PREFIX) {
        Ok(prefix) if prefix == mapping.prefix => {}
        Ok(prefix) => {
            info!("remap workspace {:?} from {prefix:?} to {:?}", mapping.name, mapping.prefix);
            config.set_str(CONFIG_PREFIX, &mapping.prefix)?;
        }
        Err(err) if err.code() == ErrorCode::NotFound => {
            debug!("map {:?} into workspace {:?}", mapping.prefix, mapping.name);
            config.set_str(CONFIG_PREFIX, &mapping.prefix)?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

fn matching_blobs(tree: &Tree<'_>, matcher: &glob::Pattern, folder: &str) -> Vec<String> {
    tree.iter()
        .filter(|entry| entry.kind() == Some(ObjectType::Blob))
        .filter_map(|entry| entry.name().map(str::to_owned))
        .filter(|name| matcher.matches(name))
        .map(|name| join_path(folder, &name))
        .collect()
}

fn entry_id(tree: &Tree<'_>, server_path: &str) -> Result<Option<Oid>> {
    match tree.get_path(Path::new(server_path)) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn join_path(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

fn to_system_time(time: Time) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(time.seconds().max(0) as u64)
}
