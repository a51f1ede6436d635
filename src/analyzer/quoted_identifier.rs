//! `QUOTED_IDENTIFIER` state across batches
//!
//! The setting decides whether `"x"` is an identifier or a string literal.
//! The server parses a whole batch before running it, so a `SET` inside a
//! batch only changes how the *next* batch is read. Inside procedures,
//! functions and triggers the statement has no effect at all.

use crate::parser::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone)]
pub struct QuotedIdentifierTracker {
    default: bool,
    /// Setting in effect at the start of each batch, filled by the first pass.
    batch_starts: Vec<bool>,
    current: bool,
}

impl QuotedIdentifierTracker {
    pub fn new(default: bool) -> Self {
        Self {
            default,
            batch_starts: Vec::new(),
            current: default,
        }
    }

    /// Remembers the carried-over setting as the start state of batch `index`.
    pub fn record_batch_start(&mut self, index: usize) {
        if self.batch_starts.len() <= index {
            self.batch_starts.resize(index + 1, self.default);
        }
        self.batch_starts[index] = self.current;
    }

    /// Restores the start state of batch `index` for the second pass.
    pub fn begin_batch(&mut self, index: usize) {
        self.current = self.batch_starts.get(index).copied().unwrap_or(self.default);
    }

    pub fn set(&mut self, on: bool) {
        self.current = on;
    }

    pub fn is_on(&self) -> bool {
        self.current
    }
}

/// Whether the `SET` statement `id` sits inside a procedure, function or
/// trigger body.
pub fn is_in_routine(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.is_inside(id, NodeKind::is_routine)
}

/// Whether a top-level `SET QUOTED_IDENTIFIER` changes nothing for the rest
/// of its own batch: it is the last statement, or only further `SET` options
/// follow it.
pub fn applies_within_batch(tree: &SyntaxTree, id: NodeId) -> bool {
    let Some(statement) = tree.top_level_statement(id) else {
        return true;
    };
    let siblings = tree.children(tree.root());
    let Some(position) = siblings.iter().position(|s| *s == statement) else {
        return true;
    };
    siblings[position + 1..]
        .iter()
        .all(|s| matches!(tree.kind(*s), NodeKind::SetOption { .. }))
}

/// `ON` / `OFF` value of a `SET QUOTED_IDENTIFIER` statement.
pub fn quoted_identifier_value(kind: &NodeKind) -> Option<bool> {
    match kind {
        NodeKind::SetOption { options, value }
            if options.iter().any(|o| o.eq_ignore_ascii_case("QUOTED_IDENTIFIER")) =>
        {
            match value.as_str() {
                "ON" => Some(true),
                "OFF" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_batch;

    fn set_statement(tree: &SyntaxTree) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|id| quoted_identifier_value(tree.kind(*id)).is_some())
            .unwrap()
    }

    #[test]
    fn test_last_statement_applies_within_batch() {
        let tree = parse_batch("SELECT 1\nSET QUOTED_IDENTIFIER ON");
        assert!(applies_within_batch(&tree, set_statement(&tree)));
    }

    #[test]
    fn test_trailing_set_options_only() {
        let tree = parse_batch("SET QUOTED_IDENTIFIER OFF\nSET ANSI_NULLS ON\nSET NOCOUNT ON");
        assert!(applies_within_batch(&tree, set_statement(&tree)));
    }

    #[test]
    fn test_followed_by_other_statements() {
        let tree = parse_batch("SET QUOTED_IDENTIFIER ON\nSELECT \"a\" FROM t");
        assert!(!applies_within_batch(&tree, set_statement(&tree)));
    }

    #[test]
    fn test_inside_procedure() {
        let tree = parse_batch("CREATE PROCEDURE p AS SET QUOTED_IDENTIFIER OFF SELECT 1");
        assert!(is_in_routine(&tree, set_statement(&tree)));

        let tree = parse_batch("SET QUOTED_IDENTIFIER OFF");
        assert!(!is_in_routine(&tree, set_statement(&tree)));
    }

    #[test]
    fn test_batch_start_states() {
        let mut tracker = QuotedIdentifierTracker::new(true);
        tracker.record_batch_start(0);
        tracker.set(false);
        tracker.record_batch_start(1);
        tracker.begin_batch(0);
        assert!(tracker.is_on());
        tracker.begin_batch(1);
        assert!(!tracker.is_on());
        tracker.begin_batch(7);
        assert!(tracker.is_on());
    }
}
