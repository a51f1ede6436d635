//! First pass: declarations visible to the whole unit
//!
//! Runs over every batch before any classification happens, so a statement
//! may use a table, view, function or type declared further down the unit.

use tracing::trace;

use super::context::AnalysisContext;
use super::datatype::base_type_name;
use super::quoted_identifier::{is_in_routine, quoted_identifier_value};
use super::symbols::{ObjectKind, Symbol};
use crate::parser::{FunctionKind, NodeId, NodeKind, SyntaxTree};

/// Collects the declarations of batch `index`.
pub fn collect(ctx: &mut AnalysisContext<'_>, index: usize, tree: &SyntaxTree) {
    ctx.symbols.enter_batch(index);
    ctx.quoted.record_batch_start(index);

    let mut declared = 0usize;
    for id in tree.descendants(tree.root()) {
        let kind = tree.kind(id);
        match kind {
            NodeKind::VariableDecl { name } | NodeKind::Parameter { name, .. } => {
                let base_type = declared_type(tree, id).unwrap_or_default();
                ctx.symbols.declare(name, Symbol::Variable { base_type });
            }
            NodeKind::TableVariableDecl { name } | NodeKind::ReturnTable { variable: name } => {
                ctx.symbols.declare(
                    name,
                    Symbol::Variable {
                        base_type: "TABLE".to_string(),
                    },
                );
            }
            NodeKind::CreateTable { name } => {
                let key = ctx.object_key(name);
                ctx.symbols.declare(&key, Symbol::Object(ObjectKind::Table));
            }
            NodeKind::Into { target } => {
                let key = ctx.object_key(target);
                ctx.symbols.declare(&key, Symbol::Object(ObjectKind::Table));
            }
            NodeKind::CreateView { name, .. } => {
                let key = ctx.object_key(name);
                ctx.symbols.declare(&key, Symbol::Object(ObjectKind::View));
            }
            NodeKind::CreateFunction { name, kind, .. } => {
                let key = ctx.object_key(name);
                let return_type = declared_type(tree, id);
                let symbol = match (*kind, return_type) {
                    (FunctionKind::Scalar, return_type) | (FunctionKind::Clr, return_type @ Some(_)) => {
                        Symbol::ScalarFunction {
                            return_type: return_type.unwrap_or_default(),
                        }
                    }
                    _ => Symbol::TableFunction,
                };
                ctx.symbols.declare(&key, symbol);
            }
            NodeKind::CreateType { name, base, table } => {
                let key = ctx.object_key(name);
                let base = match (table, base) {
                    (true, _) | (false, None) => "TABLE".to_string(),
                    (false, Some(base)) => base_type_name(base),
                };
                ctx.symbols.declare(&key, Symbol::UserDefinedType { base });
            }
            _ => {
                if let Some(on) = quoted_identifier_value(kind) {
                    if !is_in_routine(tree, id) {
                        ctx.quoted.set(on);
                    }
                }
                continue;
            }
        }
        declared += 1;
    }
    trace!(batch = index + 1, declared, "first pass complete");
}

/// Base name of the direct `DataType` child of `id`.
fn declared_type(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    let type_node = tree.find_child(id, |k| matches!(k, NodeKind::DataType { .. }))?;
    match tree.kind(type_node) {
        NodeKind::DataType { name, .. } => Some(base_type_name(name)),
        _ => None,
    }
}
