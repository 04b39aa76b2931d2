// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RaftFixture;

use anyhow::Result;
use gitraft::{RaftError, VariableError};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

#[test]
fn missing_table_is_empty() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;
    assert!(store.get_variables()?.is_empty());

    Ok(())
}

#[test]
fn read_your_writes_before_commit() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    store.set_variable("region", "eu-west")?;
    assert_eq!(
        store.get_variables()?.get("region").map(String::as_str),
        Some("eu-west")
    );
    assert_eq!(fixture.server_file("demo/variables")?, None);

    Ok(())
}

#[test]
fn last_local_write_wins() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    store.set_variable("x", "1")?;
    store.set_variable("x", "2")?;
    assert_eq!(
        store.get_variables()?,
        BTreeMap::from([("x".to_string(), "2".to_string())])
    );

    store.commit("alice")?;
    assert_eq!(fixture.server_file("demo/variables")?, Some("x=2\n".into()));

    Ok(())
}

#[test]
fn delete_absent_variable() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/variables", "a=1\nb=2\n")?;
    let mut store = fixture.store("demo")?;
    let before = store.get_variables()?;

    assert!(!store.delete_variable("ghost")?);
    assert_eq!(store.get_variables()?, before);
    assert!(store.pending_changes()?.is_empty());

    Ok(())
}

#[test]
fn mutate_every_key_round_trip() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/variables", "keep=1\ndrop=2\nchange=3\n")?;
    let mut store = fixture.store("demo")?;

    let mut expect = store.get_variables()?;
    expect.remove("drop");
    expect.insert("change".into(), "three".into());
    expect.insert("added".into(), "multi\nline = \\ value".into());

    let current = store.get_variables()?;
    for name in current.keys() {
        if !expect.contains_key(name) {
            assert!(store.delete_variable(name)?);
        }
    }
    for (name, value) in &expect {
        store.set_variable(name, value)?;
    }
    assert_eq!(store.get_variables()?, expect);

    store.commit("alice")?;
    drop(store);
    let mut fresh = fixture.store_at("demo", "fresh")?;
    assert_eq!(fresh.get_variables()?, expect);

    Ok(())
}

#[test]
fn invalid_variable_name_rejected() -> Result<()> {
    let fixture = RaftFixture::new()?;
    let mut store = fixture.store("demo")?;

    for name in ["", "has space", "a=b", "line\nbreak"] {
        assert!(matches!(
            store.set_variable(name, "value"),
            Err(RaftError::InvalidVariableName { .. })
        ));
    }
    assert!(store.pending_changes()?.is_empty());

    Ok(())
}

#[test]
fn malformed_table_reported() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/variables", "ok=1\nthis line has no separator\n")?;
    let mut store = fixture.store("demo")?;

    assert!(matches!(
        store.get_variables(),
        Err(RaftError::MalformedStoredData { .. })
    ));
    assert!(matches!(
        store.set_variable("ok", "2"),
        Err(RaftError::MalformedStoredData { .. })
    ));

    Ok(())
}

#[test]
fn non_utf8_table_reported_as_malformed() -> Result<()> {
    let fixture = RaftFixture::new()?;
    fixture.stage_and_commit("demo/variables", b"a=\xff\n")?;
    let mut store = fixture.store("demo")?;

    assert!(matches!(
        store.get_variables(),
        Err(RaftError::MalformedStoredData {
            source: VariableError::Encoding(_),
            ..
        })
    ));
    assert!(matches!(
        store.delete_variable("a"),
        Err(RaftError::MalformedStoredData { .. })
    ));

    Ok(())
}
