//! Identifiers, function calls, operators and predicates

use super::{node_text, Handled, Walk};
use crate::analyzer::context::AnalysisContext;
use crate::analyzer::datatype::{classify_expr, DataCategory};
use crate::analyzer::error_codes::{ErrorCodeCheck, HandledErrorCode};
use crate::analyzer::names::ResolvedName;
use crate::error::CompassError;
use crate::features::sections;
use crate::parser::{LiteralKind, NodeId, NodeKind, SyntaxTree};
use crate::report::Status;

/// Methods of the `xml` type, also reachable as `column.method(...)`.
const XML_METHOD_NAMES: &[&str] = &["VALUE", "QUERY", "EXIST", "NODES", "MODIFY"];

/// Date functions and the 1-based positions of their date arguments.
const DATE_ARGUMENTS: &[(&str, &[usize])] = &[
    ("DATEADD", &[3]),
    ("DATEDIFF", &[2, 3]),
    ("DATEDIFF_BIG", &[2, 3]),
    ("DATEPART", &[2]),
    ("DATENAME", &[2]),
    ("DATETRUNC", &[2]),
    ("YEAR", &[1]),
    ("MONTH", &[1]),
    ("DAY", &[1]),
    ("EOMONTH", &[1]),
];

pub(super) fn identifier(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    quote: Option<char>,
) -> Handled {
    if quote == Some('"') && !ctx.quoted.is_on() {
        ctx.report(
            sections::QUOTED_IDENTIFIER,
            "Double-quoted string literal",
            &node_text(tree, id),
            tree.line(id),
        )?;
        return Ok(Walk::Continue);
    }
    if let NodeKind::Identifier { name, .. } = tree.kind(id) {
        ctx.check_identifier_length(ResolvedName::resolve(name).object(), tree.line(id))?;
    }
    Ok(Walk::Continue)
}

pub(super) fn system_variable(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    ctx.report(sections::SYSTEM_VARIABLES, name, "", tree.line(id))?;
    Ok(Walk::Continue)
}

/// Call arguments, without a trailing `OVER` clause.
fn arguments(tree: &SyntaxTree, id: NodeId) -> &[NodeId] {
    let children = tree.children(id);
    match children.split_last() {
        Some((last, rest)) if matches!(tree.kind(*last), NodeKind::Over { .. }) => rest,
        _ => children,
    }
}

/// Literal value of an argument, as an argument rule compares it.
fn argument_value(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    match tree.kind(id) {
        NodeKind::Literal {
            kind: LiteralKind::String | LiteralKind::NationalString,
        } => {
            let text = tree.text(id);
            let text = text.trim();
            let text = text.strip_prefix(['N', 'n']).unwrap_or(text);
            let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
            Some(inner.replace("''", "'").to_ascii_uppercase())
        }
        NodeKind::Literal {
            kind: LiteralKind::Number,
        } => Some(tree.text(id).trim().to_string()),
        NodeKind::Identifier { name, quote: None } => Some(name.to_ascii_uppercase()),
        _ => None,
    }
}

pub(super) fn function_call(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, name: &str) -> Handled {
    let line = tree.line(id);

    // Reported by the assignment itself.
    let assigned_method = tree.parent(id).is_some_and(|p| {
        matches!(tree.kind(p), NodeKind::ColumnAssignment { operator, .. } if operator == "METHOD")
    });
    if assigned_method {
        return Ok(Walk::Continue);
    }

    if let Some(method) = name.strip_prefix('.') {
        let upper = method.to_ascii_uppercase();
        ctx.report(sections::XML_METHODS, &upper, &node_text(tree, id), line)?;
        return Ok(Walk::Continue);
    }
    if name == "{ODBC}" {
        ctx.report(sections::BUILT_IN_FUNCTIONS, "ODBC escape", &node_text(tree, id), line)?;
        return Ok(Walk::Continue);
    }

    let resolved = ResolvedName::resolve(name);
    let upper = resolved.object().to_ascii_uppercase();
    let key = ctx.object_key(name);
    let user_defined = ctx.symbols.scalar_function_type(&key).is_some();

    if !user_defined
        && resolved.part_count() >= 2
        && XML_METHOD_NAMES.contains(&upper.as_str())
    {
        ctx.report(sections::XML_METHODS, &upper, &node_text(tree, id), line)?;
        return Ok(Walk::Continue);
    }

    let built_in = !user_defined
        && resolved.part_count() == 1
        && ctx.matrix.exists(sections::BUILT_IN_FUNCTIONS, Some(&upper));
    if built_in {
        built_in_call(ctx, tree, id, &upper)?;
    } else {
        ctx.check_object_name(name, line)?;
        ctx.report(sections::USER_DEFINED_FUNCTIONS, "Scalar UDF call", name, line)?;
    }
    Ok(Walk::Continue)
}

fn built_in_call(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    function: &str,
) -> Result<(), CompassError> {
    let line = tree.line(id);
    let detail = node_text(tree, id);
    let args = arguments(tree, id);

    let mut status = ctx.status(sections::BUILT_IN_FUNCTIONS, Some(function))?;
    let mut argument_detail = None;
    for (index, arg) in args.iter().enumerate() {
        let position = index + 1;
        if !ctx.matrix.has_argument_rule(sections::BUILT_IN_FUNCTIONS, function, position) {
            continue;
        }
        let value = argument_value(tree, *arg);
        status = ctx.matrix.argument_status(
            &ctx.version,
            sections::BUILT_IN_FUNCTIONS,
            function,
            position,
            value.as_deref(),
        )?;
        argument_detail = Some(format!(
            "arg{} = {}",
            position,
            value.unwrap_or_else(|| node_text(tree, *arg))
        ));
        break;
    }

    let in_computed_column = tree.is_inside(id, |k| matches!(k, NodeKind::ComputedColumn { .. }));
    if in_computed_column && status == Status::Supported {
        let lookup = ctx
            .matrix
            .exists(sections::FUNCTIONS_IN_COMPUTED_COLUMN, Some(function))
            .then_some(function);
        ctx.report_as(sections::FUNCTIONS_IN_COMPUTED_COLUMN, lookup, function, &detail, line)?;
    } else {
        let detail = argument_detail.unwrap_or(detail);
        ctx.report_with_status(
            sections::BUILT_IN_FUNCTIONS,
            Some(function),
            function,
            &detail,
            line,
            status,
        )?;
    }

    if let Some((_, positions)) = DATE_ARGUMENTS.iter().find(|(f, _)| *f == function) {
        let env = ctx.type_env();
        let numeric: Vec<NodeId> = positions
            .iter()
            .filter_map(|p| args.get(p - 1).copied())
            .filter(|a| classify_expr(tree, *a, &env) == DataCategory::Numeric)
            .collect();
        for arg in numeric {
            let detail = format!("{}: {}", function, node_text(tree, arg));
            ctx.report(
                sections::IMPLICIT_CONVERSION,
                "Numeric to datetime argument",
                &detail,
                line,
            )?;
        }
    }
    Ok(())
}

pub(super) fn over(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    ordered: bool,
    frame: Option<&str>,
) -> Handled {
    let line = tree.line(id);
    let item = if ordered { "OVER with ORDER BY" } else { "OVER" };
    ctx.report(sections::WINDOW_FUNCTIONS, item, "", line)?;
    if let Some(frame) = frame {
        let item = if frame.starts_with("ROWS") {
            "ROWS frame"
        } else {
            "RANGE frame"
        };
        ctx.report(sections::WINDOW_FUNCTIONS, item, frame, line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn binary_op(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, op: &str) -> Handled {
    let line = tree.line(id);
    let item = match op {
        "&" => Some("Bitwise &"),
        "|" => Some("Bitwise |"),
        "^" => Some("Bitwise ^"),
        "+" | "-" => {
            let env = ctx.type_env();
            let operands: Vec<DataCategory> = tree
                .children(id)
                .iter()
                .map(|c| classify_expr(tree, *c, &env))
                .collect();
            if operands.contains(&DataCategory::DateTime) {
                Some("Date arithmetic")
            } else if op == "+" && classify_expr(tree, id, &env) == DataCategory::String {
                Some("String concatenation")
            } else {
                None
            }
        }
        _ => None,
    };
    if let Some(item) = item {
        ctx.report(sections::OPERATORS, item, &node_text(tree, id), line)?;
    }
    Ok(Walk::Continue)
}

pub(super) fn unary_op(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, op: &str) -> Handled {
    if op == "~" {
        ctx.report(sections::OPERATORS, "Bitwise ~", &node_text(tree, id), tree.line(id))?;
    }
    Ok(Walk::Continue)
}

fn is_null_literal(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(
        tree.kind(id),
        NodeKind::Literal {
            kind: LiteralKind::Null
        }
    )
}

pub(super) fn comparison(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, op: &str) -> Handled {
    let line = tree.line(id);
    let detail = node_text(tree, id);
    match op {
        "*=" | "=*" => ctx.report(sections::JOINS, "Old-style outer join", &detail, line)?,
        "!<" | "!>" => ctx.report(sections::OPERATORS, op, &detail, line)?,
        _ => {}
    }
    if op == "!=" {
        ctx.report(sections::OPERATORS, op, &detail, line)?;
    }
    if matches!(op, "=" | "<>" | "!=") && tree.children(id).iter().any(|c| is_null_literal(tree, *c)) {
        ctx.report(sections::OPERATORS, "= NULL comparison", &detail, line)?;
    }
    error_code_checks(ctx, tree, id)?;
    Ok(Walk::Continue)
}

pub(super) fn error_code_predicate(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Handled {
    error_code_checks(ctx, tree, id)?;
    Ok(Walk::Continue)
}

fn error_code_checks(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId) -> Result<(), CompassError> {
    let line = tree.line(id);
    for check in ctx.error_codes.examine(tree, id) {
        match check {
            ErrorCodeCheck::Code { code, via } => {
                let lookup = code.to_string();
                let display = format!("Error code {}", code);
                let detail = format!("via {}", via);
                if ctx.matrix.exists(sections::ERROR_CODES, Some(&lookup)) {
                    ctx.report_as(sections::ERROR_CODES, Some(&lookup), &display, &detail, line)?;
                } else {
                    ctx.report_as(sections::ERROR_CODES, None, &display, &detail, line)?;
                }
                ctx.handled_codes.push(HandledErrorCode { code, via, line });
            }
            ErrorCodeCheck::Indeterminate { text, via } => {
                let detail = format!("{} via {}", text, via);
                ctx.report_with_status(
                    sections::ERROR_CODES,
                    None,
                    "Error code",
                    &detail,
                    line,
                    Status::ReviewManually,
                )?;
            }
        }
    }
    Ok(())
}

pub(super) fn collate(ctx: &mut AnalysisContext<'_>, tree: &SyntaxTree, id: NodeId, collation: &str) -> Handled {
    ctx.report(sections::COLLATIONS, collation, "", tree.line(id))?;
    Ok(Walk::Continue)
}

pub(super) fn next_value_for(
    ctx: &mut AnalysisContext<'_>,
    tree: &SyntaxTree,
    id: NodeId,
    sequence: &str,
) -> Handled {
    let line = tree.line(id);
    ctx.check_object_name(sequence, line)?;
    ctx.report(sections::SEQUENCES, "NEXT VALUE FOR", sequence, line)?;
    Ok(Walk::Continue)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{findings, items};
    use crate::report::Status;

    #[test]
    fn test_argument_rule_replaces_function_status() {
        let found = findings("SELECT DATEPART(nanosecond, d) FROM t ORDER BY 1");
        let call = found.iter().find(|f| f.item == "DATEPART").unwrap();
        assert_eq!(call.status, Status::NotSupported);
        assert_eq!(call.detail, "arg1 = NANOSECOND");

        let found = findings("SELECT DATEPART(year, d) FROM t ORDER BY 1");
        let call = found.iter().find(|f| f.item == "DATEPART").unwrap();
        assert_eq!(call.status, Status::Supported);
    }

    #[test]
    fn test_non_literal_argument_needs_review() {
        let found = findings("DECLARE @s INT\nSELECT CONVERT(VARCHAR(10), d, @s) FROM t ORDER BY 1");
        let call = found.iter().find(|f| f.item == "CONVERT").unwrap();
        assert_eq!(call.status, Status::ReviewManually);
    }

    #[test]
    fn test_udf_and_xml_methods() {
        let found = items("SELECT dbo.f(a), t.doc.value('(/a)[1]', 'INT') FROM t ORDER BY 1");
        assert!(found.contains(&"Scalar UDF call".to_string()));
        assert!(found.contains(&"VALUE".to_string()));
    }

    #[test]
    fn test_operators() {
        let found = items(
            "DECLARE @s VARCHAR(10), @d DATETIME\nSELECT @s + 'x', @d + 1, a & 4, ~a FROM t WHERE a != 1 AND b = NULL ORDER BY 1",
        );
        for expected in [
            "String concatenation",
            "Date arithmetic",
            "Bitwise &",
            "Bitwise ~",
            "!=",
            "= NULL comparison",
        ] {
            assert!(found.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_window_functions() {
        let found = items(
            "SELECT ROW_NUMBER() OVER (PARTITION BY a ORDER BY b ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) FROM t ORDER BY 1",
        );
        assert!(found.contains(&"OVER with ORDER BY".to_string()));
        assert!(found.contains(&"ROWS frame".to_string()));
    }

    #[test]
    fn test_handled_error_codes() {
        let found = findings(
            "DECLARE @e INT\nINSERT INTO t VALUES (1)\nSET @e = @@ERROR\nIF @e = 2627 PRINT 'dup'\nIF @e IN (0, 547, @e) PRINT 'x'",
        );
        let codes: Vec<_> = found
            .iter()
            .filter(|f| f.item.starts_with("Error code"))
            .map(|f| f.item.as_str())
            .collect();
        assert_eq!(codes, vec!["Error code 2627", "Error code 547", "Error code"]);
        let indeterminate = found.iter().find(|f| f.item == "Error code").unwrap();
        assert_eq!(indeterminate.status, Status::ReviewManually);
    }

    #[test]
    fn test_double_quoted_literal_with_quoted_identifier_off() {
        let found = items("SET QUOTED_IDENTIFIER OFF\nGO\nSELECT \"abc\" FROM t ORDER BY 1");
        assert!(found.contains(&"Double-quoted string literal".to_string()));
        let found = items("SELECT \"abc\" FROM t ORDER BY 1");
        assert!(!found.contains(&"Double-quoted string literal".to_string()));
    }
}
