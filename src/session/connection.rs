// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Server connection and credentials.
//!
//! A connection is an authenticated handle on the remote repository that
//! backs a raft. Establishing it performs one round trip against the server
//! so that bad credentials are caught before any workspace gets touched.

use crate::{
    config::RaftSettings,
    session::{Result, SessionError},
};

use auth_git2::GitAuthenticator;
use git2::{Config, Cred, Direction, ErrorClass, ErrorCode, Remote, RemoteCallbacks};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};
use tracing::{debug, info, instrument};

/// Credentials used to talk to the server.
pub enum Credentials {
    /// No credentials at all.
    Anonymous,

    /// Explicit username with password or access token.
    UserPass { username: String, password: String },

    /// Ambient credentials of the running user.
    ///
    /// Resolved through credential helpers, the SSH agent, and default SSH
    /// keys.
    System(GitAuthenticator),
}

impl Credentials {
    /// Select credentials from raft settings.
    ///
    /// Ambient credentials win when enabled. Otherwise a configured username
    /// is paired with its password, or an empty one if none was given.
    pub fn from_settings(settings: &RaftSettings) -> Self {
        if settings.use_system_credentials {
            return Self::System(GitAuthenticator::default());
        }

        match &settings.username {
            Some(username) => Self::UserPass {
                username: username.clone(),
                password: settings.password.clone().unwrap_or_default(),
            },
            None => Self::Anonymous,
        }
    }

    /// Build remote callbacks that answer credential requests.
    pub(crate) fn remote_callbacks<'a>(&'a self, config: &'a Config) -> RemoteCallbacks<'a> {
        let mut callbacks = RemoteCallbacks::new();
        match self {
            Self::Anonymous => {}
            Self::UserPass { username, password } => {
                // INVARIANT: Offer explicit credentials once, libgit2 keeps
                // asking forever otherwise.
                let mut offered = false;
                callbacks.credentials(move |_url, _username_from_url, _allowed| {
                    if offered {
                        return Err(git2::Error::new(
                            ErrorCode::Auth,
                            ErrorClass::Net,
                            "credentials rejected",
                        ));
                    }
                    offered = true;
                    Cred::userpass_plaintext(username, password)
                });
            }
            Self::System(authenticator) => {
                callbacks.credentials(authenticator.credentials(config));
            }
        }

        callbacks
    }
}

impl Debug for Credentials {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Anonymous => fmt.write_str("Anonymous"),
            Self::UserPass { username, .. } => fmt
                .debug_struct("UserPass")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::System(_) => fmt.write_str("System"),
        }
    }
}

/// Authenticated connection to the server.
#[derive(Debug)]
pub struct Connection {
    url: String,
    credentials: Arc<Credentials>,
    default_branch: Option<String>,
    check_in_permission: Option<bool>,
}

impl Connection {
    /// Connect to the server.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Authentication`] if the server rejects the
    ///   credentials.
    /// - Return [`SessionError::Git2`] if the server cannot be reached.
    #[instrument(skip(credentials), level = "debug")]
    pub fn open(url: &str, credentials: Arc<Credentials>) -> Result<Self> {
        info!("connect to {url}");
        let config = Config::open_default()?;
        let mut remote = Remote::create_detached(url)?;
        let connection = remote
            .connect_auth(
                Direction::Fetch,
                Some(credentials.remote_callbacks(&config)),
                None,
            )
            .map_err(|err| classify(url, err))?;

        // INVARIANT: Empty servers have no default branch yet.
        let default_branch = connection
            .default_branch()
            .ok()
            .and_then(|name| name.as_str().map(str::to_owned))
            .map(|name| {
                name.strip_prefix("refs/heads/")
                    .map(str::to_owned)
                    .unwrap_or(name)
            });
        drop(connection);
        debug!("server default branch: {default_branch:?}");

        Ok(Self {
            url: url.to_string(),
            credentials,
            default_branch,
            check_in_permission: None,
        })
    }

    /// URL of the server.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Credentials the connection authenticated with.
    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::clone(&self.credentials)
    }

    /// Branch the server advertises as its head, if any.
    pub fn default_branch(&self) -> Option<&str> {
        self.default_branch.as_deref()
    }

    /// Check whether the authenticated identity may check in.
    ///
    /// Probes the server with a push handshake once, and caches the answer
    /// for the lifetime of the connection.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::Git2`] if the probe fails for any reason
    ///   other than rejected credentials.
    #[instrument(skip(self), level = "debug")]
    pub fn has_check_in_permission(&mut self) -> Result<bool> {
        if let Some(permission) = self.check_in_permission {
            return Ok(permission);
        }

        let config = Config::open_default()?;
        let mut remote = Remote::create_detached(self.url.as_str())?;
        let permission = match remote.connect_auth(
            Direction::Push,
            Some(self.credentials.remote_callbacks(&config)),
            None,
        ) {
            Ok(_) => true,
            Err(err) if is_auth_failure(&err) => false,
            Err(err) => return Err(err.into()),
        };
        debug!("check-in permission on {}: {permission}", self.url);
        self.check_in_permission = Some(permission);

        Ok(permission)
    }

    /// Release the connection.
    pub fn close(self) {
        debug!("release connection to {}", self.url);
    }
}

/// Check whether a libgit2 error stems from rejected credentials.
pub(crate) fn is_auth_failure(err: &git2::Error) -> bool {
    if err.code() == ErrorCode::Auth {
        return true;
    }

    let message = err.message().to_ascii_lowercase();
    matches!(err.class(), ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Net)
        && (message.contains("401")
            || message.contains("403")
            || message.contains("authentication")
            || message.contains("credentials"))
}

/// Turn credential rejections into [`SessionError::Authentication`].
pub(crate) fn classify(url: &str, err: git2::Error) -> SessionError {
    if is_auth_failure(&err) {
        SessionError::Authentication {
            url: url.to_string(),
            source: err,
        }
    } else {
        SessionError::Git2(err)
    }
}
