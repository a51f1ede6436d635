//! Source discovery
//!
//! Turns command-line inputs (files, directories, glob patterns and
//! `.sqlproj` files) into an ordered list of source units.

mod sqlproj;

pub use sqlproj::{parse_sqlproj, parse_sqlproj_str, SqlProject};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::{debug, warn};

use crate::error::CompassError;

/// Session defaults a project imposes on its scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDefaults {
    pub project: String,
    pub default_schema: String,
    pub quoted_identifier: bool,
}

/// One source file to analyse.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub path: PathBuf,
    /// Set when the file was found through a `.sqlproj`.
    pub project: Option<ProjectDefaults>,
}

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Expands `inputs` into source files, in input order.
///
/// Directories are walked recursively in file-name order. A file reached
/// twice is analysed once, at its first position.
pub fn discover(inputs: &[String]) -> Result<Vec<SourceInput>, CompassError> {
    let mut found = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut push = |input: SourceInput, found: &mut Vec<SourceInput>| {
        if seen.insert(input.path.clone()) {
            found.push(input);
        }
    };

    for input in inputs {
        let paths: Vec<PathBuf> = if is_glob(input) {
            match glob::glob(input) {
                Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
                Err(e) => {
                    warn!(pattern = %input, error = %e, "invalid glob pattern");
                    Vec::new()
                }
            }
        } else {
            vec![PathBuf::from(input)]
        };

        for path in paths {
            if path.is_dir() {
                for file in sql_files_under(&path) {
                    push(SourceInput { path: file, project: None }, &mut found);
                }
            } else if has_extension(&path, "sqlproj") {
                let project = parse_sqlproj(&path)?;
                debug!(
                    project = %project.name,
                    files = project.sql_files.len(),
                    "project inputs"
                );
                let defaults = ProjectDefaults {
                    project: project.name.clone(),
                    default_schema: project.default_schema.clone(),
                    quoted_identifier: project.quoted_identifier,
                };
                for file in project.scripts() {
                    push(
                        SourceInput {
                            path: file,
                            project: Some(defaults.clone()),
                        },
                        &mut found,
                    );
                }
            } else if path.is_file() {
                push(SourceInput { path, project: None }, &mut found);
            } else {
                return Err(CompassError::SourceReadError {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
                    path,
                });
            }
        }
    }

    Ok(found)
}

fn sql_files_under(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, "sql"))
        .collect()
}

/// Reads a source file as text.
///
/// A byte-order mark selects the encoding; otherwise UTF-8 is tried first
/// and Windows-1252 is the fallback.
pub fn read_source(path: &Path) -> Result<String, CompassError> {
    let bytes = std::fs::read(path).map_err(|e| CompassError::SourceReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(decode_source(&bytes))
}

pub fn decode_source(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_decode_utf8_with_bom() {
        assert_eq!(decode_source(b"\xEF\xBB\xBFSELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_decode_utf16_le() {
        let bytes = [0xFF, 0xFE, b'G', 0, b'O', 0];
        assert_eq!(decode_source(&bytes), "GO");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        assert_eq!(decode_source(b"PRINT 'caf\xE9'"), "PRINT 'café'");
    }

    #[test]
    fn test_discover_directory_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.sql"), "").unwrap();
        fs::write(dir.path().join("a.sql"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let inputs = vec![dir.path().display().to_string()];
        let found = discover(&inputs).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.sql", "b.sql"]);
    }

    #[test]
    fn test_discover_deduplicates_and_reports_missing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.sql");
        fs::write(&file, "").unwrap();
        let inputs = vec![file.display().to_string(), file.display().to_string()];
        assert_eq!(discover(&inputs).unwrap().len(), 1);

        let missing = vec![dir.path().join("nope.sql").display().to_string()];
        assert!(matches!(
            discover(&missing).unwrap_err(),
            CompassError::SourceReadError { .. }
        ));
    }

    #[test]
    fn test_discover_project_carries_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("t.sql"), "").unwrap();
        let project = dir.path().join("Db.sqlproj");
        fs::write(
            &project,
            "<Project><PropertyGroup><DefaultSchema>app</DefaultSchema></PropertyGroup></Project>",
        )
        .unwrap();
        let found = discover(&[project.display().to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        let defaults = found[0].project.as_ref().unwrap();
        assert_eq!(defaults.default_schema, "app");
        assert!(defaults.quoted_identifier);
    }
}
