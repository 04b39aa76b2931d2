// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{item_names, now_in_seconds, read_item, write_item, RaftFixture};

use anyhow::Result;
use gitraft::{ChangeKind, RaftError, RaftItemType};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

#[test]
fn write_commit_then_get_item() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    for kind in RaftItemType::all() {
        let before = now_in_seconds()?;
        write_item(&mut store, kind, "sample", &format!("{kind} body"))?;
        assert!(store.commit("alice")?.is_some());

        let item = store.get_item(kind, "sample")?;
        let item = item.ok_or_else(|| anyhow::anyhow!("{kind} item should exist"))?;
        assert_eq!(item.kind(), kind);
        assert_eq!(item.name(), "sample");
        assert!(item.last_modified() >= before);
    }

    Ok(())
}

#[test]
fn fresh_store_sees_checked_in_item() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    write_item(&mut store, RaftItemType::Script, "deploy", "echo hi")?;
    store.commit("alice")?;
    drop(store);

    assert_eq!(
        fixture.server_file("demo/scripts/deploy.otter")?,
        Some("echo hi".into())
    );

    // Same workspace on disk.
    let mut same = fixture.store("demo")?;
    assert!(same.get_item(RaftItemType::Script, "deploy")?.is_some());
    assert_eq!(
        read_item(&mut same, RaftItemType::Script, "deploy")?,
        Some("echo hi".into())
    );

    // Brand new workspace somewhere else.
    let mut elsewhere = fixture.store_at("demo", "elsewhere")?;
    assert!(elsewhere.get_item(RaftItemType::Script, "deploy")?.is_some());
    assert_eq!(
        read_item(&mut elsewhere, RaftItemType::Script, "deploy")?,
        Some("echo hi".into())
    );

    Ok(())
}

#[test]
fn pending_writes_are_local_only() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    write_item(&mut store, RaftItemType::Role, "web", "listen 80")?;

    assert_eq!(
        read_item(&mut store, RaftItemType::Role, "web")?,
        Some("listen 80".into())
    );
    assert!(item_names(&mut store, RaftItemType::Role)?.is_empty());
    assert!(store.get_item(RaftItemType::Role, "web")?.is_none());
    assert_eq!(
        store.pending_changes()?,
        BTreeMap::from([("demo/roles/web.otter".to_string(), ChangeKind::Add)])
    );
    assert_eq!(fixture.revision_count()?, 0);

    Ok(())
}

#[test]
fn missing_item_is_absent() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    assert!(store.get_item(RaftItemType::Asset, "logo")?.is_none());
    assert_eq!(read_item(&mut store, RaftItemType::Asset, "logo")?, None);

    Ok(())
}

#[test]
fn delete_absent_item_is_noop() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/scripts/keep.otter", "echo keep")?;
    let mut store = fixture.store("demo")?;

    store.delete_item(RaftItemType::Script, "ghost")?;
    assert_eq!(item_names(&mut store, RaftItemType::Script)?, vec!["keep"]);
    assert!(store.pending_changes()?.is_empty());
    assert_eq!(store.commit("alice")?, None);

    Ok(())
}

#[test]
fn delete_checked_in_item() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/scripts/keep.otter", "echo keep")?;
    fixture.stage_and_commit("demo/scripts/drop.otter", "echo drop")?;
    let mut store = fixture.store("demo")?;

    store.delete_item(RaftItemType::Script, "drop")?;
    assert_eq!(read_item(&mut store, RaftItemType::Script, "drop")?, None);
    assert_eq!(
        store.pending_changes()?,
        BTreeMap::from([("demo/scripts/drop.otter".to_string(), ChangeKind::Delete)])
    );

    // Still on the server until checked in.
    assert_eq!(
        item_names(&mut store, RaftItemType::Script)?,
        vec!["drop", "keep"]
    );

    assert!(store.commit("alice")?.is_some());
    assert_eq!(item_names(&mut store, RaftItemType::Script)?, vec!["keep"]);
    assert_eq!(fixture.server_file("demo/scripts/drop.otter")?, None);

    Ok(())
}

#[test]
fn delete_pending_add_forgets_it() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    write_item(&mut store, RaftItemType::Module, "draft", "nope")?;
    store.delete_item(RaftItemType::Module, "draft")?;
    assert!(store.pending_changes()?.is_empty());
    assert_eq!(read_item(&mut store, RaftItemType::Module, "draft")?, None);
    assert_eq!(store.commit("alice")?, None);

    Ok(())
}

#[test]
fn list_all_items_by_type_order() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/roles/web.otter", "listen 80")?;
    fixture.stage_and_commit("demo/scripts/b.otter", "echo b")?;
    fixture.stage_and_commit("demo/scripts/a.otter", "echo a")?;
    fixture.stage_and_commit("demo/scripts/nested/deep.otter", "echo deep")?;
    fixture.stage_and_commit("demo/scripts/readme.txt", "not an item")?;
    fixture.stage_and_commit("demo/misc/stray.otter", "unknown folder")?;
    fixture.stage_and_commit("demo/variables", "x=1\n")?;
    fixture.stage_and_commit("other/scripts/c.otter", "another raft")?;
    let mut store = fixture.store("demo")?;

    let mut result = Vec::new();
    for item in store.list_all_items()? {
        let item = item?;
        result.push((item.kind(), item.name().to_string()));
    }
    let expect = vec![
        (RaftItemType::Script, "a".to_string()),
        (RaftItemType::Script, "b".to_string()),
        (RaftItemType::Role, "web".to_string()),
    ];
    assert_eq!(result, expect);

    Ok(())
}

#[test]
fn custom_path_prefix() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("teams/ops/demo/modules/base.otter", "base")?;
    let mut definition = fixture.definition("demo", "ws-prefixed");
    definition.settings.path_prefix = Some("/teams/ops/demo/".into());
    let mut store = gitraft::RaftStore::new(definition)?;

    assert_eq!(store.prefix(), "teams/ops/demo");
    assert_eq!(item_names(&mut store, RaftItemType::Module)?, vec!["base"]);
    write_item(&mut store, RaftItemType::Module, "extra", "extra")?;
    store.commit("alice")?;
    assert_eq!(
        fixture.server_file("teams/ops/demo/modules/extra.otter")?,
        Some("extra".into())
    );

    Ok(())
}

#[test]
fn glob_characters_in_item_names() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/scripts/web-a.otter", "a")?;
    let mut store = fixture.store("demo")?;

    assert!(store.get_item(RaftItemType::Script, "web-*")?.is_none());
    assert!(store.get_item(RaftItemType::Script, "web-[ab]")?.is_none());
    assert!(store.get_item(RaftItemType::Script, "web-a")?.is_some());

    Ok(())
}

#[test]
fn invalid_item_names_rejected() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    for name in ["", "..", "../escape", "a/b"] {
        assert!(matches!(
            store.get_item(RaftItemType::Script, name),
            Err(RaftError::InvalidItemName { .. })
        ));
        assert!(matches!(
            store.delete_item(RaftItemType::Script, name),
            Err(RaftError::InvalidItemName { .. })
        ));
    }

    Ok(())
}

#[test]
fn control_characters_in_item_names_rejected() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    for name in ["a\nb", "a\rb", "bell\u{7}"] {
        assert!(matches!(
            store.open_item(RaftItemType::Script, name, gitraft::OpenMode::Write),
            Err(RaftError::InvalidItemName { .. })
        ));
    }

    // Pending changes stay readable, and the workspace keeps working.
    assert!(store.pending_changes()?.is_empty());
    write_item(&mut store, RaftItemType::Script, "deploy", "echo hi")?;
    assert_eq!(store.pending_changes()?.len(), 1);
    assert!(store.commit("alice")?.is_some());

    Ok(())
}
