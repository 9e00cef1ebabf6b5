//! Formula descriptor extraction.
//!
//! Pulls a handful of fields out of a Homebrew formula (`.rb`) file by
//! matching line prefixes. This is not a Ruby parser: values that span lines,
//! are built from interpolation, or sit in nested blocks come back empty or
//! truncated.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

// Homebrew writes `desc`; `description` is accepted as well.
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("desc(?:ription)?"));
static HOMEPAGE_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("homepage"));
static LICENSE_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("license"));
static HEAD_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("head"));

fn field_pattern(key: &str) -> Regex {
    Regex::new(&format!(r"^\s*{key}\b\s*(.*)$")).expect("field pattern is a valid regex")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaDescriptor {
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub git_repository: String,
}

impl FormulaDescriptor {
    /// Read and parse the formula at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read formula {}", path.display()))?;
        Ok(Self::parse(&formula_name(path), &source))
    }

    /// Parse formula `source` text for the formula called `name`.
    pub fn parse(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            description: extract_field(source, &DESCRIPTION_RE),
            homepage: extract_field(source, &HOMEPAGE_RE),
            license: extract_field(source, &LICENSE_RE),
            git_repository: extract_field(source, &HEAD_RE),
        }
    }
}

impl std::fmt::Display for FormulaDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}\n- License: {} Link(s): {} {}",
            self.name, self.description, self.license, self.homepage, self.git_repository
        )
    }
}

/// File name without its `.rb` extension.
pub fn formula_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file.strip_suffix(".rb") {
        Some(stem) => stem.to_string(),
        None => file,
    }
}

/// Value of the first line starting (after indentation) with `key` as a
/// whole word.
pub fn extract_key(source: &str, key: &str) -> String {
    match Regex::new(&format!(r"^\s*{}\b\s*(.*)$", regex::escape(key))) {
        Ok(pattern) => extract_field(source, &pattern),
        Err(_) => String::new(),
    }
}

/// Value captured by `pattern` on the first matching line.
///
/// The capture is trimmed and a single pair of surrounding quotes removed.
/// A bare `do` opens a block rather than giving a value, so such lines are
/// skipped. Returns an empty string when no line matches.
fn extract_field(source: &str, pattern: &Regex) -> String {
    source
        .lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|value| *value != "do")
        .map(|value| strip_quotes(value).to_string())
        .unwrap_or_default()
}

fn strip_quotes(value: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let value = match value.chars().next() {
        Some(c) if is_quote(c) => &value[c.len_utf8()..],
        _ => value,
    };
    match value.chars().last() {
        Some(c) if is_quote(c) => &value[..value.len() - c.len_utf8()],
        _ => value,
    }
}
