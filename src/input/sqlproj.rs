//! Reader for .sqlproj files
//!
//! Only what the assessment needs: the SQL files of the project, the
//! pre/post deployment scripts, and the session defaults the project declares.

use std::path::{Path, PathBuf};

use roxmltree::Document;
use tracing::warn;

use crate::error::CompassError;

/// Parsed SQL project
#[derive(Debug, Clone)]
pub struct SqlProject {
    pub name: String,
    pub project_dir: PathBuf,
    /// Default schema (`dbo` unless the project says otherwise)
    pub default_schema: String,
    /// QUOTED_IDENTIFIER project default (default: true)
    pub quoted_identifier: bool,
    /// SQL files in build order
    pub sql_files: Vec<PathBuf>,
    pub pre_deploy_script: Option<PathBuf>,
    pub post_deploy_script: Option<PathBuf>,
}

impl SqlProject {
    /// Every script of the project: pre-deploy, build items, post-deploy.
    pub fn scripts(&self) -> Vec<PathBuf> {
        let mut scripts = Vec::with_capacity(self.sql_files.len() + 2);
        scripts.extend(self.pre_deploy_script.clone());
        scripts.extend(self.sql_files.iter().cloned());
        scripts.extend(self.post_deploy_script.clone());
        scripts
    }
}

/// Parse a .sqlproj file
pub fn parse_sqlproj(path: &Path) -> Result<SqlProject, CompassError> {
    let content = std::fs::read_to_string(path).map_err(|e| CompassError::ProjectReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_sqlproj_str(path, &content)
}

/// Parse project XML that was read from `path`.
pub fn parse_sqlproj_str(path: &Path, content: &str) -> Result<SqlProject, CompassError> {
    let doc = Document::parse(content).map_err(|e| CompassError::ProjectParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let project_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Database")
        .to_string();

    let root = doc.root_element();

    let default_schema =
        find_property_value(&root, "DefaultSchema").unwrap_or_else(|| "dbo".to_string());
    let quoted_identifier = find_property_value(&root, "QuotedIdentifier")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    let sql_files = find_sql_files(&root, &project_dir);
    let (pre_deploy_script, post_deploy_script) = find_deployment_scripts(&root, &project_dir);

    Ok(SqlProject {
        name,
        project_dir,
        default_schema,
        quoted_identifier,
        sql_files,
        pre_deploy_script,
        post_deploy_script,
    })
}

fn find_property_value(root: &roxmltree::Node, property_name: &str) -> Option<String> {
    root.descendants()
        .find(|node| node.tag_name().name() == property_name)
        .and_then(|node| node.text())
        .map(|s| s.trim().to_string())
}

fn has_sql_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

fn find_sql_files(root: &roxmltree::Node, project_dir: &Path) -> Vec<PathBuf> {
    let mut sql_files = Vec::new();
    let mut include_patterns: Vec<String> = Vec::new();
    let mut exclude_patterns: Vec<String> = Vec::new();

    for node in root.descendants() {
        if node.tag_name().name() == "Build" {
            if let Some(include) = node.attribute("Include") {
                include_patterns.push(include.replace('\\', "/"));
            }
            if let Some(remove) = node.attribute("Remove") {
                exclude_patterns.push(remove.replace('\\', "/"));
            }
        }
    }

    for pattern in &include_patterns {
        if pattern.contains('*') {
            let glob_pattern = project_dir.join(pattern);
            let glob_str = glob_pattern.to_string_lossy();
            if let Ok(paths) = glob::glob(&glob_str) {
                sql_files.extend(paths.filter_map(|p| p.ok()).filter(|p| has_sql_extension(p)));
            }
        } else if pattern.to_ascii_lowercase().ends_with(".sql") {
            let sql_path = project_dir.join(pattern);
            if sql_path.exists() {
                sql_files.push(sql_path);
            } else {
                warn!(path = %sql_path.display(), "build item not found");
            }
        }
    }

    if !exclude_patterns.is_empty() {
        sql_files.retain(|file| !is_excluded(file, &exclude_patterns, project_dir));
    }

    // SDK-style projects include every .sql file below the project directory.
    if sql_files.is_empty() && include_patterns.is_empty() {
        sql_files = walkdir::WalkDir::new(project_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir() && (name == "bin" || name == "obj"))
            })
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| has_sql_extension(p))
            .filter(|p| !is_excluded(p, &exclude_patterns, project_dir))
            .collect();
    }

    sql_files
}

fn is_excluded(file: &Path, patterns: &[String], project_dir: &Path) -> bool {
    patterns.iter().any(|pattern| {
        let full = project_dir.join(pattern);
        if pattern.contains('*') {
            glob::Pattern::new(&full.to_string_lossy()).is_ok_and(|m| m.matches_path(file))
        } else {
            file == full
        }
    })
}

fn find_deployment_scripts(
    root: &roxmltree::Node,
    project_dir: &Path,
) -> (Option<PathBuf>, Option<PathBuf>) {
    let mut pre_deploy: Option<PathBuf> = None;
    let mut post_deploy: Option<PathBuf> = None;

    for node in root.descendants() {
        let slot = match node.tag_name().name() {
            "PreDeploy" => &mut pre_deploy,
            "PostDeploy" => &mut post_deploy,
            _ => continue,
        };
        let Some(include) = node.attribute("Include") else {
            continue;
        };
        let script_path = project_dir.join(include.replace('\\', "/"));
        if !script_path.exists() {
            continue;
        }
        if slot.is_some() {
            warn!(
                kind = node.tag_name().name(),
                path = %script_path.display(),
                "multiple deployment scripts specified, using the first one"
            );
        } else {
            *slot = Some(script_path);
        }
    }

    (pre_deploy, post_deploy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(dir: &TempDir, xml: &str) -> PathBuf {
        let path = dir.path().join("Db.sqlproj");
        fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn test_project_properties() {
        let dir = TempDir::new().unwrap();
        let path = write_project(
            &dir,
            r#"<Project><PropertyGroup><DefaultSchema>sales</DefaultSchema>
               <QuotedIdentifier>False</QuotedIdentifier></PropertyGroup></Project>"#,
        );
        let project = parse_sqlproj(&path).unwrap();
        assert_eq!(project.name, "Db");
        assert_eq!(project.default_schema, "sales");
        assert!(!project.quoted_identifier);
    }

    #[test]
    fn test_build_items_and_deployment_scripts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Tables")).unwrap();
        fs::write(dir.path().join("Tables/a.sql"), "SELECT 1").unwrap();
        fs::write(dir.path().join("Tables/b.sql"), "SELECT 2").unwrap();
        fs::write(dir.path().join("post.sql"), "PRINT 1").unwrap();
        let path = write_project(
            &dir,
            r#"<Project><ItemGroup>
                 <Build Include="Tables\*.sql" />
                 <Build Remove="Tables\b.sql" />
                 <PostDeploy Include="post.sql" />
               </ItemGroup></Project>"#,
        );
        let project = parse_sqlproj(&path).unwrap();
        assert_eq!(project.sql_files.len(), 1);
        assert!(project.sql_files[0].ends_with("a.sql"));
        let scripts = project.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[1].ends_with("post.sql"));
    }

    #[test]
    fn test_sdk_style_project_skips_build_output() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/old.sql"), "SELECT 1").unwrap();
        fs::write(dir.path().join("t.sql"), "SELECT 1").unwrap();
        let path = write_project(&dir, "<Project Sdk=\"Microsoft.Build.Sql\" />");
        let project = parse_sqlproj(&path).unwrap();
        assert_eq!(project.sql_files.len(), 1);
        assert!(project.sql_files[0].ends_with("t.sql"));
    }

    #[test]
    fn test_malformed_project_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_project(&dir, "<Project>");
        let err = parse_sqlproj(&path).unwrap_err();
        assert!(matches!(err, CompassError::ProjectParseError { .. }));
    }
}
