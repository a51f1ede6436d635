//! Data modification statements and assignments

use regex::Regex;

use super::{node_text, Handled, Walk};
use crate::analyzer::context::AnalysisContext;
use crate::analyzer::datatype::{classify_expr, classify_text, DataCategory};
use crate::analyzer::names::ResolvedName;
use crate::analyzer::query_context::QueryAttribute;
use crate::analyzer::symbols::ObjectKind;
use crate::error::CompassError;
use crate::features::sections;
use crate::parser::{NodeId, NodeKind, SyntaxTree};

/// Reports DML through a view and checks the target name.
fn check_target(
    ctx: &mut AnalysisContext<'_>,
    target: &str,
    statement: &str,
    line: usize,
) -> Result<(), CompassError> {
    if target.is_empty() || target.starts_with('@') || target.contains('(') {
        return Ok(());
    }
    ctx.check_object_name(target, line)?;
    let key = ctx.object_key(target);
    if ctx.symbols.object_kind(&key) == Some(ObjectKind::View) {
        ctx.report(sections::DML_ON_VIEWS, &format!("{} on view", statement), target, line)?;
    }
    Ok(())
}

pub(super) fn insert(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, target: &str) -> Handled {
    let line = tree.line(id);
    let source = tree.children(id).iter().find_map(|c| match tree.kind(*c) {
        NodeKind::Values { .. } => Some("INSERT..VALUES"),
        NodeKind::Query => Some("INSERT..SELECT"),
        NodeKind::Execute { .. } => Some("INSERT..EXECUTE"),
        NodeKind::DefaultValues => Some("INSERT..DEFAULT VALUES"),
        _ => None,
    });
    let item = source.unwrap_or("INSERT..VALUES");
    ctx.report(sections::INSERT, item, target, line)?;
    check_target(ctx, target, "INSERT", line)?;
    Ok(Walk::Continue)
}

pub(super) fn values(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, rows: usize) -> Handled {
    let line = tree.line(id);
    let in_derived_table = tree
        .parent(id)
        .is_some_and(|p| matches!(tree.kind(p), NodeKind::DerivedTable { .. }));
    if in_derived_table {
        ctx.report(sections::QUERY_CLAUSES, "Table value constructor", "", line)?;
    } else if rows > 1 {
        ctx.report(sections::INSERT, "Multi-row VALUES", &format!("{} rows", rows), line)?;
    }
    Ok(Walk::Continue)
}

fn has_from(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.find_child(id, |k| matches!(k, NodeKind::From)).is_some()
}

pub(super) fn update(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, target: &str) -> Handled {
    let line = tree.line(id);
    let item = if has_from(tree, id) { "UPDATE..FROM" } else { "UPDATE" };
    ctx.report(sections::UPDATE, item, target, line)?;
    check_target(ctx, target, "UPDATE", line)?;
    check_assignment_dependency(ctx, tree, id)?;
    Ok(Walk::Continue)
}

pub(super) fn delete(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, target: &str) -> Handled {
    let line = tree.line(id);
    let item = if has_from(tree, id) { "DELETE..FROM" } else { "DELETE" };
    ctx.report(sections::DELETE, item, target, line)?;
    check_target(ctx, target, "DELETE", line)?;
    Ok(Walk::Continue)
}

pub(super) fn merge(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, target: &str) -> Handled {
    let line = tree.line(id);
    ctx.report(sections::MERGE, "MERGE", target, line)?;
    check_target(ctx, target, "MERGE", line)?;
    Ok(Walk::Continue)
}

pub(super) fn merge_action(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, action: &str) -> Handled {
    ctx.report(sections::MERGE, action, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn output(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, into: Option<&str>) -> Handled {
    let line = tree.line(id);
    match into {
        Some(target) => {
            ctx.report(sections::OUTPUT_CLAUSE, "OUTPUT INTO", target, line)?;
            if !target.starts_with('@') {
                ctx.check_object_name(target, line)?;
            }
        }
        None => ctx.report(sections::OUTPUT_CLAUSE, "OUTPUT", "", line)?,
    }
    Ok(Walk::Continue)
}

pub(super) fn truncate(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, table: &str) -> Handled {
    let line = tree.line(id);
    ctx.report_as(sections::TRUNCATE_TABLE, None, "TRUNCATE TABLE", table, line)?;
    check_target(ctx, table, "TRUNCATE", line)?;
    Ok(Walk::Continue)
}

pub(super) fn column_assignment(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    column: &str,
    operator: &str,
) -> Handled {
    let line = tree.line(id);
    match operator {
        "=" => {}
        "METHOD" => {
            let method = tree.child(id, 0).and_then(|c| match tree.kind(c) {
                NodeKind::FunctionCall { name } => Some(ResolvedName::resolve(name).object().to_string()),
                _ => None,
            });
            let item = match method {
                Some(m) if m.eq_ignore_ascii_case("WRITE") => "UPDATE .WRITE",
                _ => "UPDATE column method",
            };
            ctx.report(sections::UPDATE, item, &node_text(tree, id), line)?;
        }
        compound => ctx.report(sections::COMPOUND_ASSIGNMENT, compound, column, line)?,
    }
    Ok(Walk::Continue)
}

pub(super) fn variable_assignment(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    variable: &str,
    operator: &str,
) -> Handled {
    let line = tree.line(id);
    let item = match tree.parent(id).map(|p| tree.kind(p)) {
        Some(NodeKind::QuerySpec { .. }) => {
            ctx.queries.attribute(QueryAttribute::VariableAssignment);
            "SELECT @var ="
        }
        Some(NodeKind::Update { .. }) | Some(NodeKind::MergeAction { .. }) => "UPDATE SET @var =",
        _ => "SET @var =",
    };
    ctx.report(sections::VARIABLE_ASSIGNMENT, item, variable, line)?;

    let value = tree.child(id, 0);
    if operator == "=" {
        if let Some(value) = value {
            ctx.error_codes.note_assignment(tree, variable, value);
            check_datetime_assignment(ctx, tree, variable, value, line)?;
        }
    } else {
        ctx.error_codes.forget(variable);
        ctx.report(sections::COMPOUND_ASSIGNMENT, operator, variable, line)?;
    }
    Ok(Walk::Continue)
}

/// Reports a numeric value stored into a datetime variable.
pub(super) fn check_datetime_assignment(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    variable: &str,
    value: NodeId,
    line: usize,
) -> Result<(), CompassError> {
    let Some(declared) = ctx.symbols.variable_type(variable) else {
        return Ok(());
    };
    let target = classify_text(declared, &ctx.symbols, &ctx.default_schema);
    if target != DataCategory::DateTime {
        return Ok(());
    }
    if classify_expr(tree, value, &ctx.type_env()) == DataCategory::Numeric {
        let detail = format!("{} = {}", variable, node_text(tree, value));
        ctx.report(
            sections::IMPLICIT_CONVERSION,
            "Numeric to datetime assignment",
            &detail,
            line,
        )?;
    }
    Ok(())
}

/// Within one statement, assignments that read another variable assigned
/// by the same statement depend on an evaluation order that is not defined.
pub(super) fn check_assignment_dependency(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
) -> Result<(), CompassError> {
    let assignments: Vec<(NodeId, &str)> = tree
        .children(id)
        .iter()
        .filter_map(|c| match tree.kind(*c) {
            NodeKind::VariableAssignment { variable, .. } => Some((*c, variable.as_str())),
            _ => None,
        })
        .collect();
    if assignments.len() < 2 {
        return Ok(());
    }

    let mut patterns = Vec::with_capacity(assignments.len());
    for (_, variable) in &assignments {
        // Plain substring: `@a` also matches inside `@ab`.
        let pattern = format!("(?i){}", regex::escape(variable));
        if let Ok(re) = Regex::new(&pattern) {
            patterns.push((*variable, re));
        }
    }

    for (node, variable) in &assignments {
        let Some(value) = tree.child(*node, 0) else {
            continue;
        };
        let text = tree.text(value);
        let depends = patterns
            .iter()
            .any(|(other, re)| !other.eq_ignore_ascii_case(variable) && re.is_match(&text));
        if depends {
            ctx.report_as(
                sections::VARIABLE_ASSIGNMENT_DEPENDENCY,
                None,
                "Order of assignment not guaranteed",
                variable,
                tree.line(*node),
            )?;
        }
    }
    Ok(())
}
