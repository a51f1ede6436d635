//! Object definitions: tables, columns, constraints, routines, triggers,
//! indexes and types

use super::{node_text, Handled, Walk};
use crate::analyzer::context::AnalysisContext;
use crate::analyzer::datatype::base_type_name;
use crate::analyzer::names::ResolvedName;
use crate::analyzer::object_context::ObjectAttribute;
use crate::error::CompassError;
use crate::features::sections;
use crate::parser::{FunctionKind, NodeId, NodeKind, RoutineVerb, SyntaxTree, TriggerScope};

fn report_options(
    ctx: &mut AnalysisContext<'_>,
    section: &str,
    options: &[String],
    line: usize,
) -> Result<(), CompassError> {
    for option in options {
        ctx.report(section, option, "", line)?;
    }
    Ok(())
}

/// `ALTER` and `CREATE OR ALTER` forms of a definition.
fn report_verb(
    ctx: &mut AnalysisContext<'_>,
    verb: RoutineVerb,
    object: &str,
    name: &str,
    line: usize,
) -> Result<(), CompassError> {
    if verb != RoutineVerb::Create {
        let item = format!("{} {}", verb.as_str(), object);
        ctx.report(sections::OBJECT_DEFINITIONS, &item, name, line)?;
    }
    Ok(())
}

pub(super) fn create_table(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "TABLE", name);
    let resolved = ctx.check_object_name(name, line)?;
    let item = if resolved.is_global_temporary() {
        "CREATE TABLE ##tmp"
    } else if resolved.is_temporary() {
        "CREATE TABLE #tmp"
    } else {
        "CREATE TABLE"
    };
    ctx.report(sections::CREATE_TABLE, item, name, line)?;
    Ok(Walk::Continue)
}

pub(super) fn alter_table(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, table: &str) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "TABLE", table);
    ctx.check_object_name(table, line)?;

    let elements: usize = tree
        .children(id)
        .iter()
        .map(|action| tree.children(*action).len().max(1))
        .sum();
    if elements > 1 {
        ctx.report_as(
            sections::ALTER_TABLE,
            Some("Multiple actions"),
            &format!("{} actions combined", elements),
            table,
            line,
        )?;
    }
    Ok(Walk::Continue)
}

pub(super) fn alter_table_action(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    action: &str,
) -> Handled {
    let line = tree.line(id);
    let (check, action) = if let Some(rest) = action.strip_prefix("WITH CHECK ") {
        (Some("WITH CHECK"), rest)
    } else if let Some(rest) = action.strip_prefix("WITH NOCHECK ") {
        (Some("WITH NOCHECK"), rest)
    } else {
        (None, action)
    };
    if !action.is_empty() {
        ctx.report(sections::ALTER_TABLE, action, "", line)?;
    }
    if let Some(check) = check {
        ctx.report(sections::ALTER_TABLE, check, action, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn column_def(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_sub_object(id, format!("COLUMN {}", name));
    let column = ResolvedName::resolve(name);
    ctx.check_identifier_length(column.object(), line)?;
    if ctx.is_special_column(column.object()) {
        ctx.report(sections::IDENTIFIERS, "Special column name", name, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn data_type(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    args: Option<&str>,
) -> Handled {
    let line = tree.line(id);
    let detail = node_text(tree, id);
    let key = ctx.object_key(name);

    if let Some(base) = ctx.symbols.type_base(&key) {
        let item = if base == "TABLE" { "Table type" } else { "Alias type" };
        ctx.report(sections::USER_DEFINED_DATATYPES, item, &detail, line)?;
        return Ok(Walk::Continue);
    }

    let resolved = ResolvedName::resolve(name);
    let system_schema = resolved
        .schema()
        .map_or(true, |s| s.eq_ignore_ascii_case("sys"));
    let base = base_type_name(name);
    let max_item = format!("{}(MAX)", base);
    if system_schema && args == Some("MAX") && ctx.matrix.exists(sections::DATATYPES, Some(&max_item)) {
        ctx.report(sections::DATATYPES, &max_item, &detail, line)?;
    } else if system_schema && ctx.matrix.exists(sections::DATATYPES, Some(&base)) {
        ctx.report(sections::DATATYPES, &base, &detail, line)?;
    } else {
        ctx.check_object_name(name, line)?;
        ctx.report(sections::USER_DEFINED_DATATYPES, "Alias type", &detail, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn column_attribute(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    attribute: &str,
) -> Handled {
    if !matches!(attribute, "NULL" | "NOT NULL") {
        ctx.report(sections::COLUMN_ATTRIBUTES, attribute, "", tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn computed_column(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    persisted: bool,
) -> Handled {
    let item = if persisted {
        "Persisted computed column"
    } else {
        "Computed column"
    };
    ctx.report(sections::COMPUTED_COLUMNS, item, &node_text(tree, id), tree.line(id))?;
    Ok(Walk::Continue)
}

/// What a constraint is declared on.
fn constraint_container(tree: &SyntaxTree, id: NodeId) -> &'static str {
    let container = tree.enclosing(id, |k| {
        matches!(
            k,
            NodeKind::TableVariableDecl { .. }
                | NodeKind::CreateType { .. }
                | NodeKind::AlterTable { .. }
                | NodeKind::ReturnTable { .. }
                | NodeKind::CreateTable { .. }
        )
    });
    match container.map(|c| tree.kind(c)) {
        Some(NodeKind::TableVariableDecl { .. }) => "table variable",
        Some(NodeKind::CreateType { .. }) => "table type",
        Some(NodeKind::AlterTable { .. }) => "ALTER TABLE",
        Some(NodeKind::ReturnTable { .. }) => "table-valued function",
        _ => "CREATE TABLE",
    }
}

pub(super) fn constraint(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: Option<&str>,
    kind: &str,
    clustered: Option<bool>,
    options: &[String],
) -> Handled {
    let line = tree.line(id);
    if let Some(name) = name {
        ctx.objects.enter_sub_object(id, format!("CONSTRAINT {}", name));
        ctx.check_identifier_length(name, line)?;
    }
    let item = format!("{} in {}", kind, constraint_container(tree, id));
    ctx.report(sections::CONSTRAINTS, &item, name.unwrap_or(""), line)?;

    match clustered {
        Some(true) => ctx.report(sections::CONSTRAINT_OPTIONS, "CLUSTERED", kind, line)?,
        Some(false) => ctx.report(sections::CONSTRAINT_OPTIONS, "NONCLUSTERED", kind, line)?,
        None => {}
    }
    for option in options {
        ctx.report(sections::CONSTRAINT_OPTIONS, option, kind, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn table_option(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, option: &str) -> Handled {
    ctx.report(sections::TABLE_OPTIONS, option, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn create_view(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    verb: RoutineVerb,
    options: &[String],
    check_option: bool,
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "VIEW", name);
    ctx.check_object_name(name, line)?;
    ctx.report(sections::VIEWS, "CREATE VIEW", name, line)?;
    report_verb(ctx, verb, "VIEW", name, line)?;
    report_options(ctx, sections::VIEW_OPTIONS, options, line)?;
    if check_option {
        ctx.report(sections::VIEWS, "WITH CHECK OPTION", name, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn create_procedure(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    verb: RoutineVerb,
    options: &[String],
    number: Option<u32>,
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "PROCEDURE", name);
    ctx.check_object_name(name, line)?;
    ctx.report(sections::PROCEDURES, "CREATE PROCEDURE", name, line)?;
    if let Some(number) = number {
        ctx.report(sections::PROCEDURES, "Numbered procedure", &format!("{};{}", name, number), line)?;
    }
    report_verb(ctx, verb, "PROCEDURE", name, line)?;
    report_options(ctx, sections::PROCEDURE_OPTIONS, options, line)?;
    Ok(Walk::Continue)
}

pub(super) fn parameter(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    output: bool,
    readonly: bool,
    has_default: bool,
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_sub_object(id, format!("PARAMETER {}", name));
    ctx.check_identifier_length(name, line)?;

    let table_type = tree
        .find_child(id, |k| matches!(k, NodeKind::DataType { .. }))
        .and_then(|t| match tree.kind(t) {
            NodeKind::DataType { name, .. } => Some(ctx.object_key(name)),
            _ => None,
        })
        .is_some_and(|key| ctx.symbols.type_base(&key) == Some("TABLE"));

    if output {
        ctx.report(sections::PARAMETERS, "OUTPUT parameter", name, line)?;
    }
    if readonly || table_type {
        ctx.report(sections::PARAMETERS, "Table-valued parameter", name, line)?;
    }
    if has_default {
        ctx.report(sections::PARAMETERS, "Parameter default", name, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn create_function(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    verb: RoutineVerb,
    kind: FunctionKind,
    options: &[String],
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "FUNCTION", name);
    ctx.check_object_name(name, line)?;
    let item = match kind {
        FunctionKind::Scalar => "Scalar function",
        FunctionKind::InlineTable => "Inline table-valued function",
        FunctionKind::MultiStatementTable => "Multi-statement table-valued function",
        FunctionKind::Clr => "CLR function",
    };
    ctx.report(sections::FUNCTIONS, item, name, line)?;
    report_verb(ctx, verb, "FUNCTION", name, line)?;
    report_options(ctx, sections::FUNCTION_OPTIONS, options, line)?;
    Ok(Walk::Continue)
}

pub(super) fn create_trigger(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let NodeKind::CreateTrigger {
        verb,
        target,
        scope,
        timing,
        events,
        options,
        ..
    } = tree.kind(id)
    else {
        return Ok(Walk::Continue);
    };
    let line = tree.line(id);
    ctx.objects.enter_object(id, "TRIGGER", name);
    ctx.check_object_name(name, line)?;

    let detail = format!("{} ON {}", name, target);
    match scope {
        TriggerScope::Table => {
            ctx.check_object_name(target, line)?;
            let item = if timing.eq_ignore_ascii_case("INSTEAD OF") {
                "INSTEAD OF trigger"
            } else {
                "AFTER trigger"
            };
            ctx.report(sections::TRIGGERS, item, &detail, line)?;
            if events.len() > 1 {
                ctx.objects.set_attribute(ObjectAttribute::MultiEventTrigger);
                ctx.report(sections::TRIGGERS, "Multi-event trigger", &events.join(", "), line)?;
            }
        }
        TriggerScope::Database => {
            ctx.objects.set_attribute(ObjectAttribute::ServerLevelTrigger);
            ctx.report(sections::TRIGGERS, "DDL trigger (database)", &detail, line)?;
        }
        TriggerScope::AllServer => {
            ctx.objects.set_attribute(ObjectAttribute::ServerLevelTrigger);
            let logon = events.iter().any(|e| e.eq_ignore_ascii_case("LOGON"));
            let item = if logon {
                "Logon trigger"
            } else {
                "DDL trigger (server)"
            };
            ctx.report(sections::TRIGGERS, item, &detail, line)?;
        }
    }
    report_verb(ctx, *verb, "TRIGGER", name, line)?;
    report_options(ctx, sections::TRIGGER_OPTIONS, options, line)?;
    Ok(Walk::Continue)
}

pub(super) fn create_index(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let NodeKind::CreateIndex {
        table,
        unique,
        clustered,
        kind,
        included,
        filtered,
        options,
        ..
    } = tree.kind(id)
    else {
        return Ok(Walk::Continue);
    };
    let line = tree.line(id);
    ctx.objects.enter_object(id, "INDEX", name);
    ctx.check_identifier_length(name, line)?;
    ctx.check_object_name(table, line)?;

    let detail = format!("{} ON {}", name, table);
    let columnstore = kind.as_deref() == Some("COLUMNSTORE");
    let item = match (columnstore, clustered) {
        (true, Some(true)) => "Clustered columnstore index",
        (true, _) => "Nonclustered columnstore index",
        (false, Some(true)) => "Clustered index",
        (false, _) => "Index",
    };
    ctx.report(sections::INDEXES, item, &detail, line)?;
    if *unique {
        ctx.report(sections::INDEXES, "Unique index", &detail, line)?;
    }
    if *included {
        ctx.report(sections::INDEXES, "Included columns", &detail, line)?;
    }
    if *filtered {
        ctx.report(sections::INDEXES, "Filtered index", &detail, line)?;
    }
    report_options(ctx, sections::INDEX_OPTIONS, options, line)?;
    Ok(Walk::Continue)
}

pub(super) fn create_type(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
    base: Option<&str>,
    table: bool,
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "TYPE", name);
    ctx.check_object_name(name, line)?;
    let item = if table {
        "CREATE TYPE table"
    } else {
        "CREATE TYPE alias"
    };
    let detail = match base {
        Some(base) => format!("{} FROM {}", name, base),
        None => name.to_string(),
    };
    ctx.report(sections::USER_DEFINED_DATATYPES, item, &detail, line)?;
    Ok(Walk::Continue)
}

pub(super) fn create_other(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    object_kind: &str,
    name: &str,
) -> Handled {
    let line = tree.line(id);
    if !name.is_empty() {
        ctx.check_object_name(name, line)?;
    }
    ctx.report(sections::CREATE_OTHER, object_kind, name, line)?;
    Ok(Walk::SkipChildren)
}

pub(super) fn drop(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    object_kind: &str,
    names: &[String],
    if_exists: bool,
) -> Handled {
    let line = tree.line(id);
    let detail = names.join(", ");
    ctx.report(sections::DROP, object_kind, &detail, line)?;
    if if_exists {
        ctx.report(sections::DROP, "IF EXISTS", &detail, line)?;
    }
    for name in names {
        ctx.check_object_name(name, line)?;
    }
    Ok(Walk::SkipChildren)
}
