//! Multi-part object name resolution

use std::fmt;

use crate::parser::identifier_utils::{quote_if_needed, split_multipart_name};

/// A `server.database.schema.object` name with its parts right-aligned.
///
/// Parts are stored unquoted. Empty parts (`db..t`) are kept so that the
/// part count, which decides cross-database and remote classification,
/// reflects what was written.
#[derive(Debug, Clone)]
pub struct ResolvedName {
    parts: Vec<String>,
    leading_dot: bool,
}

impl ResolvedName {
    pub fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        let leading_dot = trimmed.starts_with('.');
        let mut parts = split_multipart_name(trimmed);
        // Only the last four parts are meaningful.
        if parts.len() > 4 {
            parts.drain(..parts.len() - 4);
        }
        Self { parts, leading_dot }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// `.t` or `..t`: a separator with no preceding part.
    pub fn has_leading_dot(&self) -> bool {
        self.leading_dot
    }

    /// Exactly three parts.
    pub fn is_cross_database(&self) -> bool {
        self.parts.len() == 3
    }

    /// Exactly four parts.
    pub fn is_remote(&self) -> bool {
        self.parts.len() == 4
    }

    pub fn object(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    fn part_from_right(&self, offset: usize) -> Option<&str> {
        let len = self.parts.len();
        if offset >= len {
            return None;
        }
        let part = self.parts[len - 1 - offset].as_str();
        (!part.is_empty()).then_some(part)
    }

    pub fn schema(&self) -> Option<&str> {
        self.part_from_right(1)
    }

    pub fn database(&self) -> Option<&str> {
        self.part_from_right(2)
    }

    pub fn server(&self) -> Option<&str> {
        self.part_from_right(3)
    }

    /// Local (`#t`) or global (`##t`) temporary object.
    pub fn is_temporary(&self) -> bool {
        self.object().starts_with('#')
    }

    pub fn is_global_temporary(&self) -> bool {
        self.object().starts_with("##")
    }

    /// Whether the name refers to the current database (fewer than three
    /// parts, or a database part equal to `current_database`).
    pub fn is_in_database(&self, current_database: &str) -> bool {
        match self.database() {
            Some(db) => db.eq_ignore_ascii_case(current_database) && self.server().is_none(),
            None => self.server().is_none(),
        }
    }

    /// Upper-cased `SCHEMA.OBJECT` key, filling in `default_schema`.
    ///
    /// Temporary objects have no schema and key on the object alone.
    pub fn symbol_key(&self, default_schema: &str) -> String {
        if self.is_temporary() {
            return self.object().to_ascii_uppercase();
        }
        let schema = self.schema().unwrap_or(default_schema);
        format!("{}.{}", schema, self.object()).to_ascii_uppercase()
    }
}

impl PartialEq for ResolvedName {
    fn eq(&self, other: &Self) -> bool {
        self.leading_dot == other.leading_dot
            && self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(&other.parts)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for ResolvedName {}

impl fmt::Display for ResolvedName {
    /// Normalized form: parts bracketed only where needed. Resolving the
    /// output again yields an equal name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            if !part.is_empty() {
                f.write_str(&quote_if_needed(part))?;
            }
        }
        Ok(())
    }
}
