//! T-SQL parsing
//!
//! Turns a source unit into batches and each batch into a [`SyntaxTree`].
//! The analyzer only relies on node kinds, children, lines, parent links and
//! node text.

mod batch;
pub mod identifier_utils;
mod syntax;
mod token_parser_base;
mod tree_builder;

pub use batch::{split_batches, Batch, SqlcmdDirective};
pub use syntax::{
    Ancestors, BlockKind, ConstraintKind, FunctionKind, JoinKind, LiteralKind, NodeId, NodeKind,
    RoutineVerb, SetOperator, SyntaxNode, SyntaxTree, TriggerScope,
};
pub use tree_builder::parse_batch;
