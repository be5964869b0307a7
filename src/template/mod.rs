//! Script Template Resolution
//!
//! Scripts may contain `$(name)` and `$(name:default)` placeholders. Names are
//! letters and underscores only. A default is any run of non-whitespace
//! characters; parentheses inside it must balance, nested at most two deep,
//! so `$(since:GETDATE())` declares the default `GETDATE()`.
//!
//! # Resolution Rules
//! - An override for the name wins over the declared default
//! - Otherwise the declared default of the first occurrence is used
//! - Otherwise the placeholder becomes the empty string
//! - Every occurrence of a name resolves to the same value
//! - Text that looks like `$(...)` but does not fit the grammar is left alone
//! - Override keys that never occur in the template are accepted and ignored
//!
//! Substitution is a single pass over the template: a substituted value is
//! never scanned for placeholders again.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{CheckError, Result};

/// Separator between override entries on the command line
pub const OVERRIDE_SEPARATOR: char = ',';

/// Separator between key and value inside one override entry
pub const KEY_VALUE_SEPARATOR: char = ':';

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\(([A-Za-z_]+)(?::((?:[^\s()]|\((?:[^\s()]|\([^\s()]*\))*\))*))?\)")
            .expect("placeholder pattern is valid")
    })
}

/// A named slot found in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub default: Option<String>,
}

/// A caller-supplied replacement value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub key: String,
    pub value: String,
}

impl Override {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl FromStr for Override {
    type Err = CheckError;

    /// Parse one `key:value` entry; exactly one separator is required
    fn from_str(entry: &str) -> Result<Self> {
        let mut parts = entry.split(KEY_VALUE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => Ok(Self::new(key, value)),
            _ => Err(CheckError::argument_format(format!(
                "Key:Value pair not found in '{entry}'"
            ))),
        }
    }
}

/// Parse a comma-separated `key:value` list
///
/// An empty list yields no overrides. Any malformed entry fails the whole list.
pub fn parse_overrides(arguments: &str) -> Result<Vec<Override>> {
    if arguments.is_empty() {
        return Ok(Vec::new());
    }

    arguments.split(OVERRIDE_SEPARATOR).map(str::parse).collect()
}

/// Scan a template for placeholders
///
/// Returns one entry per distinct name, in order of first appearance. When a
/// name appears with different defaults, the first one wins.
#[must_use]
pub fn scan_placeholders(template: &str) -> Vec<Placeholder> {
    let mut placeholders: Vec<Placeholder> = Vec::new();

    for caps in placeholder_pattern().captures_iter(template) {
        let name = &caps[1];
        if placeholders.iter().any(|p| p.name == name) {
            continue;
        }
        placeholders.push(Placeholder {
            name: name.to_string(),
            default: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    placeholders
}

/// Substitute every placeholder in `template`
#[must_use]
pub fn resolve(template: &str, overrides: &[Override]) -> String {
    let mut values: HashMap<&str, &str> = HashMap::new();

    let placeholders = scan_placeholders(template);
    for placeholder in &placeholders {
        values.insert(&placeholder.name, placeholder.default.as_deref().unwrap_or(""));
    }

    for entry in overrides {
        if !values.contains_key(entry.key.as_str()) {
            tracing::debug!(key = %entry.key, "override has no placeholder in script");
        }
        values.insert(&entry.key, &entry.value);
    }

    tracing::debug!(placeholders = placeholders.len(), overrides = overrides.len(), "resolving script template");

    placeholder_pattern()
        .replace_all(template, |caps: &Captures| values.get(&caps[1]).copied().unwrap_or("").to_string())
        .into_owned()
}

/// Parse the raw override list and resolve the template in one step
///
/// Nothing is substituted when the override list is malformed.
pub fn resolve_with_arguments(template: &str, arguments: &str) -> Result<String> {
    let overrides = parse_overrides(arguments)?;
    Ok(resolve(template, &overrides))
}
