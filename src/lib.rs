// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Typed configuration rafts backed by a remote Git repository.
//!
//! A __raft__ is a named bundle of typed configuration items (modules,
//! scripts, roles, credentials, and so on) plus a flat table of string
//! variables. Gitraft keeps each raft under one path prefix of a remote
//! repository, and edits it through a local workspace that mirrors that
//! prefix.
//!
//! # Working With Rafts
//!
//! Describe a raft with a [`RaftDefinition`], then hand it to a
//! [`RaftStore`]. The store connects and creates its workspace on first use,
//! not on construction:
//!
//! ```no_run
//! use gitraft::{OpenMode, RaftDefinition, RaftItemType, RaftStore};
//! use std::io::Write;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let definition = RaftDefinition::new("https://git.example.org/rafts.git", "web");
//! let mut store = RaftStore::new(definition)?;
//!
//! if let Some(mut file) = store.open_item(RaftItemType::Script, "deploy", OpenMode::Write)? {
//!     file.write_all(b"echo hello")?;
//! }
//! store.set_variable("region", "eu-west")?;
//! store.commit("alice")?;
//! # Ok(())
//! # }
//! ```
//!
//! Every mutation stays pending in the workspace until
//! [`RaftStore::commit`] checks all of them in as one revision.

pub mod config;
pub mod naming;
pub mod path;
pub mod session;
pub mod store;
pub mod variables;

pub use config::{ConfigError, RaftDefinition, RaftSettings};
pub use naming::{
    parse_standard_type_name, sanitize_workspace_name, standard_type_name,
    workspace_name_for_path, RaftItemType,
};
pub use path::{default_config_dir, default_workspace_dir, service_temp_dir, NoWayHome};
pub use session::{ChangeKind, Credentials, OpenMode, SessionError};
pub use store::{CommitAuthor, RaftError, RaftItem, RaftItems, RaftStore, User};
pub use variables::{VariableError, VariableTable};
