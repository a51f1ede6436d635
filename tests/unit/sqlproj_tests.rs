//! Unit tests for .sqlproj reading
//!
//! These tests verify which scripts a project contributes and the session
//! defaults it declares.

use std::path::Path;

use rust_sqlcompass::input::{parse_sqlproj, parse_sqlproj_str};
use tempfile::TempDir;

/// Helper to create a test project directory with sqlproj and SQL files
fn create_test_project(sqlproj_content: &str, sql_files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    let sqlproj_path = temp_dir.path().join("project.sqlproj");
    std::fs::write(&sqlproj_path, sqlproj_content).unwrap();

    for (name, content) in sql_files {
        let sql_path = temp_dir.path().join(name);
        if let Some(parent) = sql_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&sql_path, content).unwrap();
    }

    temp_dir
}

fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

#[test]
fn test_defaults_when_properties_absent() {
    let project = parse_sqlproj_str(Path::new("/tmp/Sales.sqlproj"), "<Project />").unwrap();
    assert_eq!(project.name, "Sales");
    assert_eq!(project.default_schema, "dbo");
    assert!(project.quoted_identifier);
}

#[test]
fn test_properties_with_msbuild_namespace() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <DefaultSchema>app</DefaultSchema>
    <QuotedIdentifier>false</QuotedIdentifier>
  </PropertyGroup>
</Project>"#;
    let project = parse_sqlproj_str(Path::new("Db.sqlproj"), xml).unwrap();
    assert_eq!(project.default_schema, "app");
    assert!(!project.quoted_identifier);
}

// ============================================================================
// Build Item Tests
// ============================================================================

#[test]
fn test_build_items_keep_declaration_order() {
    let dir = create_test_project(
        r#"<Project><ItemGroup>
             <Build Include="Views\v.sql" />
             <Build Include="Tables\t.sql" />
             <Build Include="Missing\gone.sql" />
             <None Include="readme.txt" />
           </ItemGroup></Project>"#,
        &[("Views/v.sql", "SELECT 1"), ("Tables/t.sql", "SELECT 2")],
    );
    let project = parse_sqlproj(&dir.path().join("project.sqlproj")).unwrap();
    assert_eq!(file_names(&project.sql_files), vec!["v.sql", "t.sql"]);
}

#[test]
fn test_scripts_wrap_build_items_with_deployment_scripts() {
    let dir = create_test_project(
        r#"<Project><ItemGroup>
             <PostDeploy Include="Scripts\post.sql" />
             <PreDeploy Include="Scripts\pre.sql" />
             <Build Include="t.sql" />
           </ItemGroup></Project>"#,
        &[
            ("t.sql", "SELECT 1"),
            ("Scripts/pre.sql", "PRINT 'pre'"),
            ("Scripts/post.sql", "PRINT 'post'"),
        ],
    );
    let project = parse_sqlproj(&dir.path().join("project.sqlproj")).unwrap();
    assert_eq!(file_names(&project.scripts()), vec!["pre.sql", "t.sql", "post.sql"]);
}

#[test]
fn test_missing_project_is_read_error() {
    let err = parse_sqlproj(Path::new("/nonexistent/project.sqlproj")).unwrap_err();
    assert!(matches!(
        err,
        rust_sqlcompass::CompassError::ProjectReadError { .. }
    ));
}
