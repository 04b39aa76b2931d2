// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{item_names, read_item, write_item, RaftFixture};

use anyhow::Result;
use git2::Repository;
use gitraft::{RaftError, RaftItemType, RaftStore, SessionError, User};
use pretty_assertions::assert_eq;

#[test]
fn construction_is_lazy_and_close_is_idempotent() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    assert!(!fixture.local_path().join("ws-demo").exists());

    store.close();
    store.close();
    assert!(!fixture.local_path().join("ws-demo").exists());

    store.get_variables()?;
    assert!(fixture.local_path().join("ws-demo").join(".git").exists());

    store.close();
    store.close();
    assert!(fixture.local_path().join("ws-demo").join(".git").exists());

    Ok(())
}

#[test]
fn commit_records_author() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    write_item(&mut store, RaftItemType::Credentials, "db", "user=app")?;

    let author = User {
        display_name: "Alice".into(),
        email: Some("alice@example.org".into()),
    };
    let oid = store
        .commit(&author)?
        .ok_or_else(|| anyhow::anyhow!("commit should produce a revision"))?;

    let server = Repository::open_bare(fixture.url())?;
    let commit = server.find_commit(oid)?;
    assert_eq!(commit.message(), Some("Updated by raft user Alice."));
    assert_eq!(commit.author().name(), Some("Alice"));
    assert_eq!(commit.author().email(), Some("alice@example.org"));
    assert_eq!(fixture.revision_count()?, 1);

    Ok(())
}

#[test]
fn stale_store_conflicts_then_recovers() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut first = fixture.store_at("demo", "first")?;
    let mut second = fixture.store_at("demo", "second")?;

    // Both workspaces exist before anybody checks in.
    first.get_variables()?;
    second.get_variables()?;

    write_item(&mut first, RaftItemType::Script, "one", "echo one")?;
    first.commit("alice")?;

    write_item(&mut second, RaftItemType::Script, "two", "echo two")?;
    let result = second.commit("bob");
    assert!(matches!(
        result,
        Err(RaftError::Session(SessionError::CheckInConflict { .. }))
    ));
    assert!(result.is_err_and(|err| err.is_check_in_conflict()));

    // Pending changes survive the rejection.
    assert_eq!(second.pending_changes()?.len(), 1);
    assert_eq!(
        read_item(&mut second, RaftItemType::Script, "two")?,
        Some("echo two".into())
    );

    second.refresh()?;
    assert_eq!(
        read_item(&mut second, RaftItemType::Script, "one")?,
        Some("echo one".into())
    );
    assert!(second.commit("bob")?.is_some());
    assert_eq!(
        item_names(&mut first, RaftItemType::Script)?,
        vec!["one", "two"]
    );
    assert_eq!(fixture.revision_count()?, 2);

    Ok(())
}

#[test]
fn same_item_conflict_keeps_local_edit() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/scripts/deploy.otter", "echo base")?;
    let mut first = fixture.store_at("demo", "first")?;
    let mut second = fixture.store_at("demo", "second")?;

    write_item(&mut first, RaftItemType::Script, "deploy", "echo first")?;
    write_item(&mut second, RaftItemType::Script, "deploy", "echo second")?;
    assert!(first.commit("alice")?.is_some());
    assert!(second
        .commit("bob")
        .is_err_and(|err| err.is_check_in_conflict()));

    // Refresh lands on the server head without dropping the local edit.
    second.refresh()?;
    assert_eq!(
        read_item(&mut second, RaftItemType::Script, "deploy")?,
        Some("echo second".into())
    );
    assert!(second
        .pending_changes()?
        .contains_key("demo/scripts/deploy.otter"));

    // Last check-in wins.
    assert!(second.commit("bob")?.is_some());
    assert_eq!(
        fixture.server_file("demo/scripts/deploy.otter")?,
        Some("echo second".into())
    );
    assert_eq!(fixture.revision_count()?, 3);

    // The workspace on disk stays usable for a fresh store.
    drop(second);
    let mut reopened = fixture.store_at("demo", "second")?;
    assert!(reopened.get_variables()?.is_empty());
    assert!(reopened.pending_changes()?.is_empty());
    assert_eq!(
        read_item(&mut reopened, RaftItemType::Script, "deploy")?,
        Some("echo second".into())
    );

    Ok(())
}

#[test]
fn workspace_picks_up_server_changes_on_reopen() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    store.get_variables()?;
    store.close();

    fixture.stage_and_commit("demo/variables", "region=eu\n")?;
    assert_eq!(store.get_variables()?.get("region"), Some(&"eu".to_string()));

    Ok(())
}

#[test]
fn foreign_workspace_rejected() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store_at("demo", "shared")?;
    store.get_variables()?;
    drop(store);

    let mut definition = fixture.definition("demo", "shared");
    definition.settings.workspace_name = Some("someone-else".into());
    let mut intruder = RaftStore::new(definition)?;
    assert!(matches!(
        intruder.get_variables(),
        Err(RaftError::Session(SessionError::WorkspaceUnavailable { .. }))
    ));

    Ok(())
}

#[test]
fn occupied_workspace_path_rejected() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let occupied = fixture.local_path().join("occupied");
    std::fs::create_dir_all(&occupied)?;
    std::fs::write(occupied.join("notes.txt"), "mine")?;

    let mut store = fixture.store_at("demo", "occupied")?;
    assert!(matches!(
        store.get_variables(),
        Err(RaftError::Session(SessionError::WorkspaceUnavailable { .. }))
    ));

    Ok(())
}

#[test]
fn unreachable_server_fails_on_first_use() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut definition = fixture.definition("demo", "ws-demo");
    definition.settings.base_url = fixture
        .local_path()
        .join("no-such-server")
        .to_string_lossy()
        .into_owned();

    let mut store = RaftStore::new(definition)?;
    assert!(matches!(store.get_variables(), Err(RaftError::Session(_))));
    assert!(!fixture.local_path().join("ws-demo").exists());

    Ok(())
}

#[test]
fn writable_server_is_not_read_only() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    assert!(!store.is_read_only()?);

    Ok(())
}
