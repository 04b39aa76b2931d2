// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use gitraft::{
    default_config_dir, parse_standard_type_name, Credentials, OpenMode, RaftDefinition,
    RaftItem, RaftItemType, RaftStore, User,
};

use anyhow::{anyhow, bail, Context, Result};
use auth_git2::{GitAuthenticator, Prompter};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    fs::{read_to_string, File},
    io::{copy, stdin, stdout, Write},
    path::{Path, PathBuf},
    process::exit,
    time::{Duration, UNIX_EPOCH},
};
use tracing::{error, info, instrument};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  gitraft [options] --raft <raft_name> <command>\n  gitraft [options] --config <path> <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to raft definition file, takes precedence over --raft.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Name of raft definition in the default config directory.
    #[arg(short, long, global = true, value_name = "raft_name")]
    pub raft: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let definition = load_definition(self.config.as_deref(), self.raft.as_deref())?;
        let bar = ProgressBar::new_spinner();
        let mut store = open_store(definition, bar.clone())?;

        bar.set_style(ProgressStyle::with_template("{spinner:.yellow} {msg}")?);
        bar.set_message(format!("raft {}", store.raft_name()));
        bar.enable_steady_tick(Duration::from_millis(100));

        let outcome = match self.command {
            Command::List(opts) => run_list(&mut store, &bar, opts),
            Command::Show(opts) => run_show(&mut store, &bar, opts),
            Command::Put(opts) => run_put(&mut store, opts),
            Command::Rm(opts) => run_rm(&mut store, opts),
            Command::Vars => run_vars(&mut store, &bar),
            Command::Set(opts) => run_set(&mut store, opts),
            Command::Unset(opts) => run_unset(&mut store, opts),
            Command::Status => run_status(&mut store, &bar),
            Command::Commit(opts) => run_commit(&mut store, opts),
            Command::Refresh => run_refresh(&mut store),
        };
        bar.finish_and_clear();
        store.close();

        outcome
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List checked in items.
    #[command(override_usage = "gitraft list [options] [<item_type>]")]
    List(ListOptions),

    /// Print content of an item.
    #[command(override_usage = "gitraft show [options] <item_type> <name>")]
    Show(ItemOptions),

    /// Write an item from a file or standard input.
    #[command(override_usage = "gitraft put [options] <item_type> <name> [<file>]")]
    Put(PutOptions),

    /// Delete an item.
    #[command(override_usage = "gitraft rm [options] <item_type> <name>")]
    Rm(ItemOptions),

    /// Print variable table.
    #[command(override_usage = "gitraft vars [options]")]
    Vars,

    /// Set a variable.
    #[command(override_usage = "gitraft set [options] <name> <value>")]
    Set(SetOptions),

    /// Remove a variable.
    #[command(override_usage = "gitraft unset [options] <name>")]
    Unset(UnsetOptions),

    /// Show pending changes.
    #[command(override_usage = "gitraft status [options]")]
    Status,

    /// Check in all pending changes.
    #[command(override_usage = "gitraft commit [options]")]
    Commit(CommitOptions),

    /// Get latest from the server.
    #[command(override_usage = "gitraft refresh [options]")]
    Refresh,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Only list items of this type, e.g., "scripts".
    #[arg(value_name = "item_type", value_parser = parse_item_type)]
    pub item_type: Option<RaftItemType>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ItemOptions {
    /// Type of item, e.g., "scripts".
    #[arg(required = true, value_name = "item_type", value_parser = parse_item_type)]
    pub item_type: RaftItemType,

    /// Name of item.
    #[arg(required = true, value_name = "name")]
    pub name: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PutOptions {
    /// Type of item, e.g., "scripts".
    #[arg(required = true, value_name = "item_type", value_parser = parse_item_type)]
    pub item_type: RaftItemType,

    /// Name of item.
    #[arg(required = true, value_name = "name")]
    pub name: String,

    /// File to read item content from instead of standard input.
    #[arg(value_name = "file")]
    pub file: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetOptions {
    /// Name of variable.
    #[arg(required = true, value_name = "name")]
    pub name: String,

    /// Value of variable.
    #[arg(required = true, value_name = "value")]
    pub value: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UnsetOptions {
    /// Name of variable.
    #[arg(required = true, value_name = "name")]
    pub name: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    /// Author name instead of Git's "user.name".
    #[arg(short, long, value_name = "name")]
    pub author: Option<String>,

    /// Author email instead of Git's "user.email".
    #[arg(short, long, value_name = "email")]
    pub email: Option<String>,
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
struct IndicatifPrompter {
    bar: ProgressBar,
}

impl IndicatifPrompter {
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn parse_item_type(name: &str) -> Result<RaftItemType, String> {
    parse_standard_type_name(name).ok_or_else(|| {
        let known = RaftItemType::all()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown item type {name:?}, expected one of: {known}")
    })
}

fn load_definition(config: Option<&Path>, raft: Option<&str>) -> Result<RaftDefinition> {
    let path = match (config, raft) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(raft)) => default_config_dir()?.join(format!("{raft}.toml")),
        (None, None) => bail!("no raft selected, use --raft or --config"),
    };

    let content = read_to_string(&path)
        .with_context(|| format!("failed to read raft definition {:?}", path.display()))?;
    let definition = content
        .parse::<RaftDefinition>()
        .with_context(|| format!("invalid raft definition {:?}", path.display()))?;

    Ok(definition)
}

fn open_store(mut definition: RaftDefinition, bar: ProgressBar) -> Result<RaftStore> {
    let settings = &mut definition.settings;
    if settings.use_system_credentials {
        let authenticator = GitAuthenticator::default().set_prompter(IndicatifPrompter::new(bar));
        return Ok(RaftStore::with_credentials(
            definition,
            Credentials::System(authenticator),
        )?);
    }

    if let Some(username) = &settings.username {
        if settings.password.is_none() {
            let password = Password::new(&format!("password for {username}"))
                .without_confirmation()
                .prompt()?;
            settings.password = Some(password);
        }
    }

    Ok(RaftStore::new(definition)?)
}

fn run_list(store: &mut RaftStore, bar: &ProgressBar, opts: ListOptions) -> Result<()> {
    let items = match opts.item_type {
        Some(kind) => store.list_items(kind)?,
        None => store.list_all_items()?,
    };
    let items = items.collect::<Result<Vec<RaftItem>, _>>()?;

    bar.suspend(|| -> Result<()> {
        let mut out = stdout().lock();
        for item in &items {
            let seconds = item.last_modified().duration_since(UNIX_EPOCH)?.as_secs();
            writeln!(out, "{}/{}\t{seconds}", item.kind(), item.name())?;
        }
        Ok(())
    })
}

fn run_show(store: &mut RaftStore, bar: &ProgressBar, opts: ItemOptions) -> Result<()> {
    let mut file = store
        .open_item(opts.item_type, &opts.name, OpenMode::Read)?
        .ok_or_else(|| anyhow!("item {}/{} does not exist", opts.item_type, opts.name))?;

    bar.suspend(|| -> Result<()> {
        copy(&mut file, &mut stdout().lock())?;
        Ok(())
    })
}

fn run_put(store: &mut RaftStore, opts: PutOptions) -> Result<()> {
    let mut file = store
        .open_item(opts.item_type, &opts.name, OpenMode::Write)?
        .ok_or_else(|| anyhow!("item {}/{} cannot be written", opts.item_type, opts.name))?;

    match opts.file {
        Some(path) => copy(&mut File::open(path)?, &mut file)?,
        None => copy(&mut stdin().lock(), &mut file)?,
    };
    info!("pend write of {}/{}", opts.item_type, opts.name);

    Ok(())
}

fn run_rm(store: &mut RaftStore, opts: ItemOptions) -> Result<()> {
    store.delete_item(opts.item_type, &opts.name)?;
    Ok(())
}

fn run_vars(store: &mut RaftStore, bar: &ProgressBar) -> Result<()> {
    let variables = store.get_variables()?;

    bar.suspend(|| -> Result<()> {
        let mut out = stdout().lock();
        for (name, value) in &variables {
            writeln!(out, "{name}={value}")?;
        }
        Ok(())
    })
}

fn run_set(store: &mut RaftStore, opts: SetOptions) -> Result<()> {
    store.set_variable(&opts.name, &opts.value)?;
    Ok(())
}

fn run_unset(store: &mut RaftStore, opts: UnsetOptions) -> Result<()> {
    if !store.delete_variable(&opts.name)? {
        info!("variable {:?} is not set", opts.name);
    }

    Ok(())
}

fn run_status(store: &mut RaftStore, bar: &ProgressBar) -> Result<()> {
    let read_only = store.is_read_only()?;
    let pending = store.pending_changes()?;

    bar.suspend(|| -> Result<()> {
        let mut out = stdout().lock();
        if read_only {
            writeln!(out, "read-only: check-ins will be rejected")?;
        }
        for (path, kind) in &pending {
            writeln!(out, "{kind}\t{path}")?;
        }
        Ok(())
    })
}

fn run_commit(store: &mut RaftStore, opts: CommitOptions) -> Result<()> {
    let config = git2::Config::open_default()?;
    let display_name = match opts.author {
        Some(name) => name,
        None => config
            .get_string("user.name")
            .context("no author given, and Git has no \"user.name\"")?,
    };
    let email = opts.email.or_else(|| config.get_string("user.email").ok());

    let author = User {
        display_name,
        email,
    };
    match store.commit(&author)? {
        Some(revision) => info!("checked in {revision}"),
        None => info!("nothing to check in"),
    }

    Ok(())
}

fn run_refresh(store: &mut RaftStore) -> Result<()> {
    store.refresh()?;
    Ok(())
}
