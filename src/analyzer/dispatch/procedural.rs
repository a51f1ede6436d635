//! Declarations, session options, control flow, error handling,
//! transactions and procedure calls

use super::dml::check_datetime_assignment;
use super::{node_text, Handled, Walk};
use crate::analyzer::context::AnalysisContext;
use crate::analyzer::names::ResolvedName;
use crate::analyzer::quoted_identifier::{applies_within_batch, is_in_routine, quoted_identifier_value};
use crate::features::sections;
use crate::parser::{BlockKind, NodeId, NodeKind, SyntaxTree};
use crate::util::starts_with_ci;

pub(super) fn block(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, kind: BlockKind) -> Handled {
    if kind == BlockKind::Try {
        ctx.report(sections::ERROR_HANDLING, "TRY..CATCH", "", tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn variable_decl(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let line = tree.line(id);
    ctx.check_identifier_length(name, line)?;
    // children: [DataType, initializer?]
    if let Some(value) = tree.child(id, 1) {
        ctx.report(sections::VARIABLES, "DECLARE with initializer", name, line)?;
        ctx.error_codes.note_assignment(tree, name, value);
        check_datetime_assignment(ctx, tree, name, value, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn table_variable_decl(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    name: &str,
) -> Handled {
    let line = tree.line(id);
    ctx.objects.enter_object(id, "TABLE VARIABLE", name);
    ctx.check_identifier_length(name, line)?;
    ctx.report(sections::VARIABLES, "Table variable", name, line)?;
    Ok(Walk::Continue)
}

pub(super) fn cursor_decl(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, options: &[String]) -> Handled {
    let line = tree.line(id);
    let assigned = tree
        .parent(id)
        .is_some_and(|p| matches!(tree.kind(p), NodeKind::VariableAssignment { .. }));
    let item = if assigned { "Cursor variable" } else { "DECLARE CURSOR" };
    ctx.report(sections::CURSORS, item, "", line)?;
    for option in options {
        ctx.report(sections::CURSOR_OPTIONS, option, "", line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn set_option(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    options: &[String],
    value: &str,
) -> Handled {
    let line = tree.line(id);
    for option in options {
        if ctx.matrix.has_argument_rule(sections::SET_OPTIONS, option, 1) {
            // A variable or an empty value cannot be judged statically.
            let literal = (!value.is_empty() && !value.starts_with('@')).then_some(value);
            let status = ctx
                .matrix
                .argument_status(&ctx.version, sections::SET_OPTIONS, option, 1, literal)?;
            let display = match literal {
                Some(v) => format!("{} {}", option, v),
                None => option.clone(),
            };
            ctx.report_with_status(
                sections::SET_OPTIONS,
                Some(option.as_str()),
                &display,
                value,
                line,
                status,
            )?;
        } else {
            ctx.report(sections::SET_OPTIONS, option, value, line)?;
        }
    }
    if options.len() > 1 {
        ctx.report_as(
            sections::SET_OPTIONS,
            Some("Multiple options"),
            &format!("{} options combined", options.len()),
            &options.join(", "),
            line,
        )?;
    }

    // The value recorded by the first pass is what later batches see; the
    // second pass only reports where the setting takes effect. Inside a
    // routine body it has no effect at all.
    if quoted_identifier_value(tree.kind(id)).is_some()
        && !is_in_routine(tree, id)
        && !applies_within_batch(tree, id)
    {
        ctx.report(sections::QUOTED_IDENTIFIER, "Effective next batch", value, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn control_flow(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    item: &str,
    detail: &str,
) -> Handled {
    ctx.report(sections::CONTROL_FLOW, item, detail, tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn return_statement(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Handled {
    if tree.is_inside(id, |k| matches!(k, NodeKind::CreateFunction { .. })) {
        return Ok(Walk::Continue);
    }
    let line = tree.line(id);
    match tree.child(id, 0) {
        Some(value) => ctx.report(sections::CONTROL_FLOW, "RETURN value", &node_text(tree, value), line)?,
        None => ctx.report(sections::CONTROL_FLOW, "RETURN", "", line)?,
    }
    Ok(Walk::Continue)
}

pub(super) fn wait_for(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, kind: &str) -> Handled {
    ctx.report(sections::WAITFOR, kind, &node_text(tree, id), tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn transaction(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, action: &str) -> Handled {
    ctx.report(sections::TRANSACTIONS, action, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn execute(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    procedure: Option<&str>,
    options: &[String],
) -> Handled {
    let line = tree.line(id);
    for option in options {
        ctx.report(sections::EXECUTE_OPTIONS, option, "", line)?;
    }

    let Some(procedure) = procedure else {
        ctx.report(sections::DYNAMIC_SQL, "EXECUTE string", &node_text(tree, id), line)?;
        return Ok(Walk::Continue);
    };
    if procedure.starts_with('@') {
        ctx.report(sections::DYNAMIC_SQL, "EXECUTE @procedure variable", procedure, line)?;
        return Ok(Walk::Continue);
    }

    let name = ResolvedName::resolve(procedure);
    let object = name.object();
    if object.eq_ignore_ascii_case("sp_executesql") {
        ctx.report(sections::DYNAMIC_SQL, "sp_executesql", &node_text(tree, id), line)?;
    } else if starts_with_ci(object, "sp_") || starts_with_ci(object, "xp_") {
        let upper = object.to_ascii_uppercase();
        ctx.report(sections::SYSTEM_STORED_PROCEDURES, &upper, procedure, line)?;
    } else {
        ctx.check_object_name(procedure, line)?;
        ctx.report(sections::PROCEDURE_CALLS, "EXECUTE procedure", procedure, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn exec_arg(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, output: bool) -> Handled {
    if output {
        ctx.report(sections::PROCEDURE_CALLS, "OUTPUT argument", &node_text(tree, id), tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn misc_statement(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, keywords: &str) -> Handled {
    ctx.report(sections::MISC_STATEMENTS, keywords, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn raiserror(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, options: &[String]) -> Handled {
    let line = tree.line(id);
    let detail = node_text(tree, id);
    let mut legacy = false;
    for option in options {
        if option == "LEGACY SYNTAX" {
            legacy = true;
        } else {
            ctx.report(sections::RAISERROR_OPTIONS, option, "", line)?;
        }
    }
    let item = if legacy {
        "RAISERROR legacy syntax"
    } else {
        "RAISERROR"
    };
    ctx.report(sections::ERROR_HANDLING, item, &detail, line)?;
    Ok(Walk::Continue)
}

pub(super) fn throw(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Handled {
    let item = if tree.children(id).is_empty() {
        "THROW re-raise"
    } else {
        "THROW"
    };
    ctx.report(sections::ERROR_HANDLING, item, &node_text(tree, id), tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn cursor_op(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    op: &str,
    orientation: Option<&str>,
) -> Handled {
    let line = tree.line(id);
    let cursor = match tree.kind(id) {
        NodeKind::CursorOp { cursor, .. } => cursor.as_str(),
        _ => "",
    };
    ctx.report(sections::CURSORS, op, cursor, line)?;
    if let Some(orientation) = orientation {
        ctx.report(sections::FETCH_ORIENTATION, orientation, cursor, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn use_database(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, database: &str) -> Handled {
    ctx.report(sections::MISC_STATEMENTS, "USE", database, tree.line(id))?;
    ctx.current_database = ResolvedName::resolve(database).object().to_string();
    Ok(Walk::Continue)
}

pub(super) fn permission(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, action: &str) -> Handled {
    ctx.report(sections::PERMISSIONS, action, &node_text(tree, id), tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn unparsed(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, message: &str) -> Handled {
    ctx.report(sections::PARSE_ERRORS, "Unparsed statement", message, tree.line(id))?;
    Ok(Walk::SkipChildren)
}
