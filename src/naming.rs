// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Naming translation.
//!
//! Deterministic mapping between the typed item model of a raft and the path
//! naming convention used on the server. Every raft lives under a single
//! __path prefix__ on the server. Below that prefix each item type gets its
//! own folder, and each item is a file in that folder carrying the
//! [`ITEM_EXTENSION`] suffix:
//!
//! ```text
//! <prefix>/
//! ├── scripts/
//! │   └── deploy.otter
//! ├── roles/
//! │   └── web.otter
//! └── variables
//! ```
//!
//! The variable table is the single flat resource named [`VARIABLES_FILE`]
//! at the top of the prefix.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
};

/// File extension given to every raft item on the server.
pub const ITEM_EXTENSION: &str = "otter";

/// Name of the variable table resource under the raft prefix.
pub const VARIABLES_FILE: &str = "variables";

/// Longest workspace name the backing store accepts.
pub const MAX_WORKSPACE_NAME_LEN: usize = 64;

const WORKSPACE_NAME_FORBIDDEN: &[char] = &['"', '/', ':', '<', '>', '\\', '|', '*', '?', ';'];

/// Category of a raft item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RaftItemType {
    /// Reusable configuration module.
    Module,

    /// Configuration script.
    Script,

    /// Deployment plan script.
    DeploymentScript,

    /// Server role definition.
    Role,

    /// Named credential set.
    Credentials,

    /// Bank of shared variables.
    VariableBank,

    /// Opaque asset file.
    Asset,
}

// INVARIANT: One row per variant, folder names are unique.
static STANDARD_TYPE_NAMES: [(RaftItemType, &str); 7] = [
    (RaftItemType::Module, "modules"),
    (RaftItemType::Script, "scripts"),
    (RaftItemType::DeploymentScript, "deployment-scripts"),
    (RaftItemType::Role, "roles"),
    (RaftItemType::Credentials, "credentials"),
    (RaftItemType::VariableBank, "variable-banks"),
    (RaftItemType::Asset, "assets"),
];

impl RaftItemType {
    /// Every item type in declaration order.
    pub fn all() -> impl Iterator<Item = RaftItemType> {
        STANDARD_TYPE_NAMES.iter().map(|(kind, _)| *kind)
    }
}

impl Display for RaftItemType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(standard_type_name(*self))
    }
}

/// Folder name used on the server for an item type.
pub fn standard_type_name(kind: RaftItemType) -> &'static str {
    STANDARD_TYPE_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, name)| *name)
        .unwrap_or_default()
}

/// Item type for a server folder name.
///
/// Returns [`None`] for folders that do not belong to the raft layout, so
/// listing code can skip foreign content.
pub fn parse_standard_type_name(folder: &str) -> Option<RaftItemType> {
    STANDARD_TYPE_NAMES
        .iter()
        .find(|(_, name)| *name == folder)
        .map(|(kind, _)| *kind)
}

/// Sanitize a candidate workspace name.
///
/// Workspace names cannot contain any of `" / : < > \ | * ? ;`, cannot end
/// with whitespace, and are limited to [`MAX_WORKSPACE_NAME_LEN`] characters.
/// Forbidden characters become `_`.
pub fn sanitize_workspace_name(candidate: &str) -> String {
    let replaced: String = candidate
        .chars()
        .map(|ch| {
            if WORKSPACE_NAME_FORBIDDEN.contains(&ch) {
                '_'
            } else {
                ch
            }
        })
        .collect();

    // INVARIANT: Trim again after truncation so the cut never leaves a
    // trailing space behind.
    let truncated: String = replaced
        .trim_end()
        .chars()
        .take(MAX_WORKSPACE_NAME_LEN)
        .collect();

    truncated.trim_end().to_string()
}

/// Default workspace name for a local disk path.
///
/// Built from the last component of the disk path.
pub fn workspace_name_for_path(disk_path: impl AsRef<Path>) -> String {
    let last = disk_path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    sanitize_workspace_name(&format!("raft-{last}"))
}

/// Server folder holding every item of a given type.
pub fn type_folder(prefix: &str, kind: RaftItemType) -> String {
    join_server_path(prefix, standard_type_name(kind))
}

/// Server path of a single raft item.
pub fn item_path(prefix: &str, kind: RaftItemType, name: &str) -> String {
    format!("{}/{name}.{ITEM_EXTENSION}", type_folder(prefix, kind))
}

/// Glob pattern matching every item file inside a type folder.
pub fn item_pattern(prefix: &str, kind: RaftItemType) -> String {
    format!("{}/*.{ITEM_EXTENSION}", type_folder(prefix, kind))
}

/// Server path of the variable table.
pub fn variables_path(prefix: &str) -> String {
    join_server_path(prefix, VARIABLES_FILE)
}

/// Split a server item path back into its type and item name.
///
/// Only `<prefix>/<type folder>/<name>.otter` paths map back to an item.
pub fn parse_item_path(prefix: &str, path: &str) -> Option<(RaftItemType, String)> {
    let relative = match normalize_prefix(prefix) {
        prefix if prefix.is_empty() => path,
        prefix => path.strip_prefix(prefix)?.strip_prefix('/')?,
    };
    let (folder, file) = relative.rsplit_once('/')?;
    let name = file.strip_suffix(ITEM_EXTENSION)?.strip_suffix('.')?;
    if folder.contains('/') {
        return None;
    }

    parse_standard_type_name(folder).map(|kind| (kind, name.to_string()))
}

/// Normalize a raft path prefix.
///
/// Strips surrounding slashes so prefixes compose with `/` separators.
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

fn join_server_path(prefix: &str, tail: &str) -> String {
    match normalize_prefix(prefix) {
        "" => tail.to_string(),
        prefix => format!("{prefix}/{tail}"),
    }
}
