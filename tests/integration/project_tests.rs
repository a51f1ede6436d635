//! Assessment runs driven by .sqlproj files

use pretty_assertions::assert_eq;

use crate::common::{Record, TestContext};

const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Name>Inventory</Name>
    <DefaultSchema>stock</DefaultSchema>
    <QuotedIdentifier>False</QuotedIdentifier>
  </PropertyGroup>
  <ItemGroup>
    <Build Include="Queries\items.sql" />
  </ItemGroup>
  <ItemGroup>
    <PostDeploy Include="Scripts\seed.sql" />
  </ItemGroup>
</Project>"#;

#[test]
fn test_project_scripts_are_analysed_in_order() {
    let ctx = TestContext::new();
    ctx.write("db/Queries/items.sql", "SELECT sku FROM items ORDER BY sku");
    ctx.write("db/Scripts/seed.sql", "TRUNCATE TABLE items");
    let project = ctx.write("db/Inventory.sqlproj", PROJECT);

    let (summary, records) = ctx.analyze(ctx.options(&[&project]));

    assert_eq!(summary.units.len(), 2);
    let files: Vec<String> = records.iter().map(Record::file_name).collect();
    assert_eq!(files.first().map(String::as_str), Some("items.sql"));
    assert_eq!(files.last().map(String::as_str), Some("seed.sql"));
}

#[test]
fn test_project_quoted_identifier_default_applies() {
    let ctx = TestContext::new();
    ctx.write(
        "db/Queries/items.sql",
        "SELECT sku FROM items WHERE kind = \"boxed\" ORDER BY sku",
    );
    ctx.write("db/Scripts/seed.sql", "TRUNCATE TABLE items");
    let project = ctx.write("db/Inventory.sqlproj", PROJECT);

    let (_, records) = ctx.analyze(ctx.options(&[&project]));

    assert!(records
        .iter()
        .any(|r| r.item == "Double-quoted string literal" && r.file_name() == "items.sql"));
}

#[test]
fn test_same_script_from_project_and_path_is_analysed_once() {
    let ctx = TestContext::new();
    let script = ctx.write("db/Queries/items.sql", "SELECT sku FROM items ORDER BY sku");
    ctx.write("db/Scripts/seed.sql", "TRUNCATE TABLE items");
    let project = ctx.write("db/Inventory.sqlproj", PROJECT);

    let (summary, _) = ctx.analyze(ctx.options(&[&project, &script]));

    assert_eq!(summary.units.len(), 2);
}

#[test]
fn test_malformed_project_aborts_run() {
    let ctx = TestContext::new();
    let project = ctx.write("Broken.sqlproj", "<Project><ItemGroup></Project>");
    let err = rust_sqlcompass::run_analysis(ctx.options(&[&project])).unwrap_err();
    assert!(err.to_string().contains("Failed to parse project file"));
}
