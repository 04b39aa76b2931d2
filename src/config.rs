// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for raft definition files to simplify the process of
//! serialization and deserialization. File I/O is left to the caller to
//! figure out.

use crate::{
    naming::{normalize_prefix, sanitize_workspace_name, workspace_name_for_path},
    path::{default_workspace_dir, NoWayHome},
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Raft definition layout.
///
/// A raft definition tells the raft store where the remote repository lives,
/// how to authenticate against it, and where the local workspace should be
/// placed. Only the remote URL and raft name are required. Everything else
/// is derived from them when left out.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RaftDefinition {
    /// Settings for the raft.
    pub settings: RaftSettings,
}

impl RaftDefinition {
    /// Construct new raft definition from the two required settings.
    pub fn new(base_url: impl Into<String>, raft_name: impl Into<String>) -> Self {
        Self {
            settings: RaftSettings {
                base_url: base_url.into(),
                raft_name: raft_name.into(),
                ..Default::default()
            },
        }
    }
}

impl FromStr for RaftDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: RaftDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on workspace path field.
        if let Some(path) = definition.settings.workspace_path.take() {
            let expanded = shellexpand::full(path.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned();
            definition.settings.workspace_path = Some(PathBuf::from(expanded));
        }

        if definition.settings.base_url.trim().is_empty() {
            return Err(ConfigError::MissingSetting("base_url"));
        }

        if definition.settings.raft_name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("raft_name"));
        }

        Ok(definition)
    }
}

impl Display for RaftDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Raft configuration settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RaftSettings {
    /// URL of the remote repository backing the raft.
    pub base_url: String,

    /// Name of the raft.
    pub raft_name: String,

    /// Username to authenticate with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password or access token paired with the username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Use ambient credentials (credential helpers, SSH agent, default keys).
    #[serde(default)]
    pub use_system_credentials: bool,

    /// Explicit workspace name instead of the one derived from the local path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,

    /// Explicit local disk path for the workspace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,

    /// Server path prefix holding the raft instead of the raft name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Branch acting as the server head.
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for RaftSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            raft_name: String::new(),
            username: None,
            password: None,
            use_system_credentials: false,
            workspace_name: None,
            workspace_path: None,
            path_prefix: None,
            branch: default_branch(),
        }
    }
}

impl RaftSettings {
    /// Server path prefix of the raft.
    pub fn resolved_prefix(&self) -> String {
        let prefix = self.path_prefix.as_deref().unwrap_or(&self.raft_name);
        normalize_prefix(prefix).to_string()
    }

    /// Local disk path of the workspace.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if no explicit path is set and the service temp
    ///   directory cannot be determined.
    pub fn resolved_workspace_path(&self) -> Result<PathBuf, NoWayHome> {
        match &self.workspace_path {
            Some(path) => Ok(path.clone()),
            None => default_workspace_dir(&self.raft_name),
        }
    }

    /// Workspace name, sanitized for the backing store.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if the name must be derived from a default
    ///   workspace path that cannot be determined.
    pub fn resolved_workspace_name(&self) -> Result<String, NoWayHome> {
        match &self.workspace_name {
            Some(name) => Ok(sanitize_workspace_name(name)),
            None => Ok(workspace_name_for_path(self.resolved_workspace_path()?)),
        }
    }
}

fn default_branch() -> String {
    "main".into()
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Required setting is empty or absent.
    #[error("raft definition is missing required setting {0:?}")]
    MissingSetting(&'static str),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
