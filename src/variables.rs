// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variable table encoding.
//!
//! A raft keeps its variables in one flat text resource. Each entry sits on
//! its own line as `name=value`, sorted by name:
//!
//! ```text
//! environment=production
//! motd=hello\nworld
//! ```
//!
//! Values escape backslashes as `\\`, line feeds as `\n`, and carriage
//! returns as `\r` so that every entry stays on one line. Names are limited
//! to ASCII alphanumerics, `_`, `-`, and `.`.
//!
//! The table is always rewritten wholesale. Two writers that load, modify,
//! and save the table at the same time will lose one of their updates.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Parsed variable table.
///
/// # Invariant
///
/// - Every key is a valid variable name.
/// - No duplicate keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VariableTable {
    entries: BTreeMap<String, String>,
}

impl VariableTable {
    /// Construct new empty variable table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable.
    ///
    /// # Errors
    ///
    /// - Return [`VariableError::InvalidName`] if name is not a valid
    ///   variable name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        self.entries.insert(name, value.into());

        Ok(())
    }

    /// Remove a variable, returning whether it was present.
    pub fn remove(&mut self, name: impl AsRef<str>) -> bool {
        self.entries.remove(name.as_ref()).is_some()
    }

    /// Borrow the underlying mapping.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Take the underlying mapping.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Parse a stored table straight from its raw bytes.
    ///
    /// # Errors
    ///
    /// - Return [`VariableError::Encoding`] if the bytes are not UTF-8.
    /// - Return [`VariableError::Malformed`] if a line cannot be parsed.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        std::str::from_utf8(data)?.parse()
    }
}

impl FromStr for VariableTable {
    type Err = VariableError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        for (index, line) in data.lines().enumerate() {
            let line_number = index + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }

            let (name, raw) = line.split_once('=').ok_or(VariableError::Malformed {
                line: line_number,
                reason: "missing '=' separator".into(),
            })?;

            validate_name(name).map_err(|_| VariableError::Malformed {
                line: line_number,
                reason: format!("invalid variable name {name:?}"),
            })?;

            let value = unescape(raw).ok_or(VariableError::Malformed {
                line: line_number,
                reason: "invalid escape sequence".into(),
            })?;

            // INVARIANT: A stored table never repeats a name.
            if entries.insert(name.to_string(), value).is_some() {
                return Err(VariableError::Malformed {
                    line: line_number,
                    reason: format!("duplicate variable {name:?}"),
                });
            }
        }

        Ok(Self { entries })
    }
}

impl Display for VariableTable {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for (name, value) in &self.entries {
            writeln!(fmt, "{name}={}", escape(value))?;
        }

        Ok(())
    }
}

impl From<VariableTable> for BTreeMap<String, String> {
    fn from(table: VariableTable) -> Self {
        table.entries
    }
}

/// Check that a variable name can be stored in the table.
///
/// # Errors
///
/// - Return [`VariableError::InvalidName`] for empty names, or names with
///   characters outside ASCII alphanumerics, `_`, `-`, and `.`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));

    if !valid {
        return Err(VariableError::InvalidName { name: name.into() });
    }

    Ok(())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            ch => out.push(ch),
        }
    }

    out
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next()? {
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }

    Some(out)
}

/// Variable table error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariableError {
    /// Stored table does not follow the line format.
    #[error("malformed variable table at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Stored table is not UTF-8 text.
    #[error("variable table is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// Variable name cannot be stored.
    #[error("invalid variable name {name:?}")]
    InvalidName { name: String },
}

/// Friendly result alias :3
pub type Result<T, E = VariableError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    #[test]
    fn parse_variable_table() -> anyhow::Result<()> {
        let result: VariableTable = indoc! {r#"
            environment=production

            motd=hello\nworld
            path=C:\\tools
            empty=
            equation=a=b
        "#}
        .parse()?;

        let mut expect = VariableTable::new();
        expect.insert("environment", "production")?;
        expect.insert("motd", "hello\nworld")?;
        expect.insert("path", r"C:\tools")?;
        expect.insert("empty", "")?;
        expect.insert("equation", "a=b")?;
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_variable_table_sorted() -> anyhow::Result<()> {
        let mut table = VariableTable::new();
        table.insert("zeta", "last")?;
        table.insert("alpha", "line one\r\nline two")?;
        table.insert("mid.dle", r"back\slash")?;

        let expect = indoc! {r#"
            alpha=line one\r\nline two
            mid.dle=back\\slash
            zeta=last
        "#};
        assert_eq!(table.to_string(), expect);

        let reparsed: VariableTable = table.to_string().parse()?;
        assert_eq!(reparsed, table);

        Ok(())
    }

    #[test]
    fn parse_accepts_crlf_line_endings() -> anyhow::Result<()> {
        let result: VariableTable = "a=1\r\nb=2\r\n".parse()?;
        assert_eq!(result.as_map().get("a").map(String::as_str), Some("1"));
        assert_eq!(result.as_map().get("b").map(String::as_str), Some("2"));

        Ok(())
    }

    #[test_case("no separator here", 1; "missing_separator")]
    #[test_case("ok=1\nbad name=2", 2; "invalid_name")]
    #[test_case("ok=1\n\n=2", 3; "empty_name")]
    #[test_case(r"ok=trailing\", 1; "dangling_escape")]
    #[test_case(r"ok=\t", 1; "unknown_escape")]
    #[test_case("a=1\nb=2\na=3", 3; "duplicate_name")]
    #[test]
    fn parse_rejects_malformed_lines(data: &str, line: usize) {
        let result = data.parse::<VariableTable>();
        assert!(matches!(
            result,
            Err(VariableError::Malformed { line: found, .. }) if found == line
        ));
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() -> anyhow::Result<()> {
        let result = VariableTable::from_bytes(b"a=\xff\n");
        assert!(matches!(result, Err(VariableError::Encoding(_))));

        let result = VariableTable::from_bytes(b"a=1\n")?;
        assert_eq!(result.as_map().get("a").map(String::as_str), Some("1"));

        Ok(())
    }

    #[test]
    fn insert_overwrites_and_rejects_bad_names() -> anyhow::Result<()> {
        let mut table = VariableTable::new();
        table.insert("x", "1")?;
        table.insert("x", "2")?;
        assert_eq!(table.to_string(), "x=2\n");

        assert_eq!(
            table.insert("has space", "v"),
            Err(VariableError::InvalidName { name: "has space".into() })
        );
        assert_eq!(table.to_string(), "x=2\n");

        Ok(())
    }

    #[test]
    fn remove_reports_presence() -> anyhow::Result<()> {
        let mut table = VariableTable::new();
        table.insert("x", "1")?;

        assert!(!table.remove("y"));
        assert!(table.remove("x"));
        assert!(!table.remove("x"));
        assert_eq!(table, VariableTable::new());

        Ok(())
    }
}
