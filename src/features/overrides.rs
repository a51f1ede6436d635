//! User reclassification of matrix results
//!
//! ```text
//! [Error handling]
//! RAISERROR = ignored
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::error::CompassError;
use crate::report::Status;

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `(SECTION, ITEM)` upper-cased.
    entries: HashMap<(String, String), Status>,
}

impl Overrides {
    pub fn load(path: &Path) -> Result<Self, CompassError> {
        let text = std::fs::read_to_string(path).map_err(|e| CompassError::MatrixReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(origin: &str, text: &str) -> Result<Self, CompassError> {
        let mut entries = HashMap::new();
        let mut section: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
                section = Some(header.trim().to_ascii_uppercase());
                continue;
            }
            let error = |message: String| CompassError::MatrixParse {
                origin: origin.to_string(),
                line: index + 1,
                message,
            };
            let current = section
                .clone()
                .ok_or_else(|| error("override outside of a section".to_string()))?;
            let (item, status) = line
                .rsplit_once('=')
                .ok_or_else(|| error(format!("expected ITEM = status: '{}'", line)))?;
            let status = status.parse::<Status>().map_err(error)?;
            entries.insert((current, item.trim().to_ascii_uppercase()), status);
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replacement status for a construct the matrix did not mark supported.
    pub fn apply(&self, section: &str, item: &str, status: Status) -> Option<Status> {
        if status == Status::Supported || self.entries.is_empty() {
            return None;
        }
        self.entries
            .get(&(section.to_ascii_uppercase(), item.to_ascii_uppercase()))
            .copied()
            .filter(|replacement| *replacement != status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# local decisions
[Error handling]
RAISERROR = ignored
[Datatypes]
sql_variant = Rewritten
";

    #[test]
    fn test_override_applies_to_unsupported_only() {
        let overrides = Overrides::parse("o", SAMPLE).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(
            overrides.apply("error handling", "RAISERROR", Status::NotSupported),
            Some(Status::Ignored)
        );
        assert_eq!(
            overrides.apply("Datatypes", "SQL_VARIANT", Status::ReviewManually),
            Some(Status::Rewritten)
        );
        assert_eq!(overrides.apply("Error handling", "RAISERROR", Status::Supported), None);
        assert_eq!(overrides.apply("Error handling", "THROW", Status::NotSupported), None);
    }

    #[test]
    fn test_bad_status_is_parse_error() {
        let err = Overrides::parse("o", "[A]\nX = sometimes\n").unwrap_err();
        assert!(matches!(err, CompassError::MatrixParse { line: 2, .. }));
    }
}
