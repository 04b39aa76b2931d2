// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::PathBuf;

/// Determine absolute path to the service temp directory.
///
/// Uses `$XDG_CACHE_HOME/gitraft` as the root for local workspaces. Does not
/// check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if cache directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn service_temp_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("gitraft"))
        .ok_or(NoWayHome)
}

/// Determine default local workspace path for a raft.
///
/// Workspaces live at `<service temp dir>/rafts/<raft name>`. The same path
/// is handed out across process restarts so an existing workspace gets
/// reused.
///
/// # Errors
///
/// - Return [`NoWayHome`] if cache directory path cannot be determined.
pub fn default_workspace_dir(raft_name: impl AsRef<str>) -> Result<PathBuf> {
    service_temp_dir().map(|path| path.join("rafts").join(raft_name.as_ref()))
}

/// Determine default directory holding raft definition files.
///
/// Uses `$XDG_CONFIG_HOME/gitraft`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if config directory path cannot be determined.
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("gitraft"))
        .ok_or(NoWayHome)
}

/// No way to determine the user's cache or config directory.
///
/// Usually means neither the XDG variables nor `$HOME` are set.
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine user's cache or config directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
