//! SELECT structure, table sources and query-level clauses

use super::{node_text, Handled, Walk};
use crate::analyzer::context::AnalysisContext;
use crate::analyzer::names::ResolvedName;
use crate::analyzer::object_context::ObjectAttribute;
use crate::analyzer::query_context::{structural_attributes, QueryAttribute};
use crate::error::CompassError;
use crate::features::sections;
use crate::parser::{LiteralKind, NodeId, NodeKind, SyntaxTree};

const CATALOG_SCHEMAS: &[&str] = &["SYS", "INFORMATION_SCHEMA"];

/// Whether `id` is a direct child of the query specification on top of the
/// query context stack.
fn belongs_to_current_query(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.parent(id)
        .is_some_and(|p| matches!(tree.kind(p), NodeKind::QuerySpec { .. }))
}

pub(super) fn cte(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let recursive = tree.descendants(id).into_iter().skip(1).any(|d| {
        matches!(tree.kind(d), NodeKind::TableRef { name: table, .. }
            if ResolvedName::resolve(table).object().eq_ignore_ascii_case(name))
    });
    let item = if recursive { "Recursive CTE" } else { "CTE" };
    ctx.report(sections::COMMON_TABLE_EXPRESSIONS, item, name, tree.line(id))?;
    ctx.check_identifier_length(name, tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn set_operation(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    operator: &str,
) -> Handled {
    ctx.report(sections::SET_OPERATORS, operator, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn query_spec(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, distinct: bool) -> Handled {
    let line = tree.line(id);
    ctx.queries.push(id, line, structural_attributes(tree, id));
    if distinct {
        ctx.report(sections::QUERY_CLAUSES, "DISTINCT", "", line)?;
    }
    super::dml::check_assignment_dependency(ctx, tree, id)?;
    Ok(Walk::Continue)
}

/// Pops the query node of `id` and queues its findings.
pub(super) fn finalize_query(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Result<(), CompassError> {
    let Some(node) = ctx.queries.pop(id) else {
        return Ok(());
    };
    let detail = node_text(tree, id);
    let shape = node.shape();
    ctx.queue_as(sections::SELECT, Some(shape), shape, &detail, node.line)?;
    if node.is_top_without_order_by() {
        ctx.queue_as(
            sections::SELECT_TOP_WO_ORDER_BY,
            None,
            "TOP without ORDER BY",
            &detail,
            node.line,
        )?;
    }
    if node.is_unordered_result_set() {
        ctx.queue_as(
            sections::SELECT_RESULT_WO_ORDER_BY,
            None,
            "Result set without ORDER BY",
            &detail,
            node.line,
        )?;
    }
    Ok(())
}

pub(super) fn top(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    percent: bool,
    with_ties: bool,
) -> Handled {
    let line = tree.line(id);
    let detail = node_text(tree, id);
    let owner = tree.parent(id).map(|p| tree.kind(p));
    match owner {
        Some(NodeKind::QuerySpec { .. }) => ctx.queries.attribute(QueryAttribute::HasTop),
        Some(NodeKind::Insert { .. }) => ctx.report(sections::SELECT_TOP, "TOP in INSERT", &detail, line)?,
        Some(NodeKind::Update { .. }) => ctx.report(sections::SELECT_TOP, "TOP in UPDATE", &detail, line)?,
        Some(NodeKind::Delete { .. }) => ctx.report(sections::SELECT_TOP, "TOP in DELETE", &detail, line)?,
        Some(NodeKind::Merge { .. }) => ctx.report(sections::SELECT_TOP, "TOP in MERGE", &detail, line)?,
        _ => {}
    }
    if percent {
        ctx.report(sections::SELECT_TOP, "TOP PERCENT", &detail, line)?;
    }
    if with_ties {
        ctx.report(sections::SELECT_TOP, "TOP WITH TIES", &detail, line)?;
    }
    let constant = tree.child(id, 0).is_some_and(|c| {
        matches!(
            tree.kind(c),
            NodeKind::Literal {
                kind: LiteralKind::Number
            }
        )
    });
    if !constant {
        ctx.report(sections::SELECT_TOP, "TOP (expression)", &detail, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn into(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, target: &str) -> Handled {
    let name = ctx.check_object_name(target, tree.line(id))?;
    if belongs_to_current_query(tree, id) {
        let attribute = if name.is_global_temporary() {
            QueryAttribute::IntoGlobalTemp
        } else if name.is_temporary() {
            QueryAttribute::IntoTemp
        } else {
            QueryAttribute::IntoTable
        };
        ctx.queries.attribute(attribute);
    }
    Ok(Walk::Continue)
}

pub(super) fn from(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Handled {
    if belongs_to_current_query(tree, id) {
        ctx.queries.attribute(QueryAttribute::HasFrom);
    }
    Ok(Walk::Continue)
}

pub(super) fn table_ref(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, raw: &str) -> Handled {
    let line = tree.line(id);
    let name = ctx.check_object_name(raw, line)?;

    if let Some(schema) = name.schema() {
        if CATALOG_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(schema)) {
            let view = format!("{}.{}", schema, name.object()).to_ascii_uppercase();
            ctx.report(sections::CATALOG_VIEWS, &view, raw, line)?;
        }
    }

    let pseudo_table = name.part_count() == 1
        && (name.object().eq_ignore_ascii_case("inserted") || name.object().eq_ignore_ascii_case("deleted"));
    if pseudo_table
        && tree.is_inside(id, |k| matches!(k, NodeKind::CreateTrigger { .. }))
        && ctx.objects.has_attribute(ObjectAttribute::MultiEventTrigger)
    {
        ctx.report(
            sections::TRIGGERS,
            "inserted/deleted in multi-event trigger",
            raw,
            line,
        )?;
    }
    Ok(Walk::Continue)
}

pub(super) fn table_function(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, raw: &str) -> Handled {
    let line = tree.line(id);
    let name = ResolvedName::resolve(raw);
    let upper = name.object().to_ascii_uppercase();
    let key = ctx.object_key(raw);
    let built_in = name.part_count() == 1
        && !ctx.symbols.is_table_function(&key)
        && ctx.matrix.exists(sections::TABLE_FUNCTIONS, Some(&upper));
    if built_in {
        ctx.report(sections::TABLE_FUNCTIONS, &upper, &node_text(tree, id), line)?;
    } else {
        ctx.check_object_name(raw, line)?;
        ctx.report(sections::USER_DEFINED_FUNCTIONS, "Table UDF call", raw, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn join(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    kind: &str,
    hint: Option<&str>,
) -> Handled {
    let line = tree.line(id);
    ctx.report(sections::JOINS, kind, "", line)?;
    if let Some(hint) = hint {
        ctx.report(sections::JOIN_HINTS, hint, kind, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn pivot(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, unpivot: bool) -> Handled {
    let item = if unpivot { "UNPIVOT" } else { "PIVOT" };
    ctx.report(sections::QUERY_CLAUSES, item, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn table_hint(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, hint: &str) -> Handled {
    let table = tree
        .parent(id)
        .map(|p| match tree.kind(p) {
            NodeKind::TableRef { name, .. } => name.clone(),
            _ => String::new(),
        })
        .unwrap_or_default();
    ctx.report(sections::TABLE_HINTS, hint, &table, tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn group_by(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    modifier: Option<&str>,
) -> Handled {
    if let Some(modifier) = modifier {
        let item = format!("GROUP BY {}", modifier);
        ctx.report(sections::QUERY_CLAUSES, &item, "", tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn order_by(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, offset_fetch: bool) -> Handled {
    if offset_fetch {
        ctx.report(sections::QUERY_CLAUSES, "OFFSET FETCH", "", tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn for_clause(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, mode: &str) -> Handled {
    ctx.report(sections::FOR_CLAUSE, &format!("FOR {}", mode), "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn query_hint(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, hint: &str) -> Handled {
    ctx.report(sections::QUERY_HINTS, hint, "", tree.line(id))?;
    Ok(Walk::Continue)
}
