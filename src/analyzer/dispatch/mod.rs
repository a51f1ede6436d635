//! Classification dispatcher
//!
//! One handler per node kind. [`visit`] walks the tree depth-first: the
//! handler runs when a node is entered, then its children are visited
//! (unless the handler consumed them), then [`exit`] closes whatever the
//! node opened (query nodes, object frames).
//!
//! The match in [`enter`] is exhaustive: a new [`NodeKind`] variant does not
//! compile until it is routed somewhere.

mod ddl;
mod dml;
mod expressions;
mod procedural;
mod queries;

use super::context::AnalysisContext;
use crate::error::CompassError;
use crate::parser::{NodeId, NodeKind, SyntaxTree};
use crate::util::collapse_whitespace;

/// Whether the walk descends into a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Walk {
    Continue,
    SkipChildren,
}

pub(crate) type Handled = Result<Walk, CompassError>;

pub(crate) fn visit(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Result<(), CompassError> {
    if enter(ctx, tree, id)? == Walk::Continue {
        for child in tree.children(id) {
            visit(ctx, tree, *child)?;
        }
    }
    exit(ctx, tree, id)
}

fn enter(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Handled {
    use NodeKind::*;
    match tree.kind(id) {
        Batch | Declare | Where | Having | OptionClause | DefaultValues | ReturnTable { .. }
        | Logical { .. } | Not | InSubquery { .. } | Like { .. } | IsNull { .. } | Exists | Case
        | Literal { .. } | Variable { .. } | SelectItem { .. } | Star | Query | WithClause
        | DerivedTable { .. } => Ok(Walk::Continue),

        // Queries
        Cte { name } => queries::cte(ctx, tree, id, name),
        SetOperation { operator } => queries::set_operation(ctx, tree, id, operator.as_str()),
        QuerySpec { distinct } => queries::query_spec(ctx, tree, id, *distinct),
        Top { percent, with_ties } => queries::top(ctx, tree, id, *percent, *with_ties),
        Into { target } => queries::into(ctx, tree, id, target),
        From => queries::from(ctx, tree, id),
        TableRef { name, .. } => queries::table_ref(ctx, tree, id, name),
        TableFunction { name, .. } => queries::table_function(ctx, tree, id, name),
        Join { kind, hint } => queries::join(ctx, tree, id, kind.as_str(), hint.as_deref()),
        Pivot { unpivot } => queries::pivot(ctx, tree, id, *unpivot),
        TableHint { hint } => queries::table_hint(ctx, tree, id, hint),
        GroupBy { modifier } => queries::group_by(ctx, tree, id, modifier.as_deref()),
        OrderBy { offset_fetch } => queries::order_by(ctx, tree, id, *offset_fetch),
        ForClause { mode } => queries::for_clause(ctx, tree, id, mode),
        QueryHint { hint } => queries::query_hint(ctx, tree, id, hint),

        // DML
        Insert { target } => dml::insert(ctx, tree, id, target),
        Values { rows } => dml::values(ctx, tree, id, *rows),
        Update { target } => dml::update(ctx, tree, id, target),
        Delete { target } => dml::delete(ctx, tree, id, target),
        Merge { target } => dml::merge(ctx, tree, id, target),
        MergeAction { action } => dml::merge_action(ctx, tree, id, action),
        Output { into } => dml::output(ctx, tree, id, into.as_deref()),
        Truncate { table } => dml::truncate(ctx, tree, id, table),
        ColumnAssignment { column, operator } => dml::column_assignment(ctx, tree, id, column, operator),
        VariableAssignment { variable, operator } => {
            dml::variable_assignment(ctx, tree, id, variable, operator)
        }

        // DDL
        CreateTable { name } => ddl::create_table(ctx, tree, id, name),
        AlterTable { table } => ddl::alter_table(ctx, tree, id, table),
        AlterTableAction { action } => ddl::alter_table_action(ctx, tree, id, action),
        ColumnDef { name } => ddl::column_def(ctx, tree, id, name),
        DataType { name, args } => ddl::data_type(ctx, tree, id, name, args.as_deref()),
        ColumnAttribute { attribute } => ddl::column_attribute(ctx, tree, id, attribute),
        ComputedColumn { persisted } => ddl::computed_column(ctx, tree, id, *persisted),
        Constraint {
            name,
            kind,
            clustered,
            options,
        } => ddl::constraint(ctx, tree, id, name.as_deref(), kind.as_str(), *clustered, options),
        TableOption { option } => ddl::table_option(ctx, tree, id, option),
        CreateView {
            name,
            verb,
            options,
            check_option,
        } => ddl::create_view(ctx, tree, id, name, *verb, options, *check_option),
        CreateProcedure {
            name,
            verb,
            options,
            number,
        } => ddl::create_procedure(ctx, tree, id, name, *verb, options, *number),
        Parameter {
            name,
            output,
            readonly,
            has_default,
        } => ddl::parameter(ctx, tree, id, name, *output, *readonly, *has_default),
        CreateFunction {
            name,
            verb,
            kind,
            options,
        } => ddl::create_function(ctx, tree, id, name, *verb, *kind, options),
        CreateTrigger { name, .. } => ddl::create_trigger(ctx, tree, id, name),
        CreateIndex { name, .. } => ddl::create_index(ctx, tree, id, name),
        CreateType { name, base, table } => ddl::create_type(ctx, tree, id, name, base.as_deref(), *table),
        CreateOther { object_kind, name } => ddl::create_other(ctx, tree, id, object_kind, name),
        Drop {
            object_kind,
            names,
            if_exists,
        } => ddl::drop(ctx, tree, id, object_kind, names, *if_exists),

        // Procedural
        Block { kind } => procedural::block(ctx, tree, id, *kind),
        VariableDecl { name } => procedural::variable_decl(ctx, tree, id, name),
        TableVariableDecl { name } => procedural::table_variable_decl(ctx, tree, id, name),
        CursorDecl { options, .. } => procedural::cursor_decl(ctx, tree, id, options),
        SetOption { options, value } => procedural::set_option(ctx, tree, id, options, value),
        If => procedural::control_flow(ctx, tree, id, "IF", ""),
        While => procedural::control_flow(ctx, tree, id, "WHILE", ""),
        Break => procedural::control_flow(ctx, tree, id, "BREAK", ""),
        Continue => procedural::control_flow(ctx, tree, id, "CONTINUE", ""),
        Goto { label } => procedural::control_flow(ctx, tree, id, "GOTO", label),
        Label { name } => procedural::control_flow(ctx, tree, id, "Label", name),
        Return => procedural::return_statement(ctx, tree, id),
        WaitFor { kind } => procedural::wait_for(ctx, tree, id, kind),
        Transaction { action, .. } => procedural::transaction(ctx, tree, id, action),
        Execute { procedure, options } => procedural::execute(ctx, tree, id, procedure.as_deref(), options),
        ExecArg { output, .. } => procedural::exec_arg(ctx, tree, id, *output),
        Print => procedural::misc_statement(ctx, tree, id, "PRINT"),
        Raiserror { options } => procedural::raiserror(ctx, tree, id, options),
        Throw => procedural::throw(ctx, tree, id),
        CursorOp { op, orientation, .. } => procedural::cursor_op(ctx, tree, id, op, orientation.as_deref()),
        Use { database } => procedural::use_database(ctx, tree, id, database),
        Permission { action } => procedural::permission(ctx, tree, id, action),
        OtherStatement { keywords } => procedural::misc_statement(ctx, tree, id, keywords),
        Unparsed { message } => procedural::unparsed(ctx, tree, id, message),

        // Expressions
        Identifier { quote, .. } => expressions::identifier(ctx, tree, id, *quote),
        SystemVariable { name } => expressions::system_variable(ctx, tree, id, name),
        FunctionCall { name } => expressions::function_call(ctx, tree, id, name),
        Over { ordered, frame } => expressions::over(ctx, tree, id, *ordered, frame.as_deref()),
        BinaryOp { op } => expressions::binary_op(ctx, tree, id, op),
        UnaryOp { op } => expressions::unary_op(ctx, tree, id, op),
        Comparison { op } => expressions::comparison(ctx, tree, id, op),
        InList { .. } | Between { .. } => expressions::error_code_predicate(ctx, tree, id),
        Collate { collation } => expressions::collate(ctx, tree, id, collation),
        NextValueFor { sequence } => expressions::next_value_for(ctx, tree, id, sequence),
    }
}

/// Closes the query node and object frames opened for `id`.
fn exit(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Result<(), CompassError> {
    if matches!(tree.kind(id), NodeKind::QuerySpec { .. }) {
        queries::finalize_query(ctx, tree, id)?;
    }
    ctx.objects.leave(id);
    Ok(())
}

/// Node text on one line.
pub(crate) fn node_text(tree: &SyntaxTree, id: NodeId) -> String {
    collapse_whitespace(&tree.text(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze_unit, AnalyzerConfig};
    use crate::features::ConfigMatrix;
    use crate::report::Finding;

    pub(super) fn findings(sql: &str) -> Vec<Finding> {
        let matrix = ConfigMatrix::embedded().unwrap();
        analyze_unit(sql, &AnalyzerConfig::default(), &matrix)
            .unwrap()
            .findings
    }

    pub(super) fn items(sql: &str) -> Vec<String> {
        findings(sql).into_iter().map(|f| f.item).collect()
    }

    #[test]
    fn test_plain_top_select() {
        assert_eq!(items("SELECT TOP 10 * FROM t"), vec!["SELECT", "TOP without ORDER BY"]);
    }

    #[test]
    fn test_query_findings_follow_statement_findings() {
        assert_eq!(
            items("SELECT a FROM t UNION ALL SELECT b FROM u"),
            vec!["UNION ALL", "SELECT", "Result set without ORDER BY", "SELECT"]
        );
    }
}
