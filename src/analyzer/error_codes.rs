//! Error codes an application branches on
//!
//! Follows one narrow idiom: a variable assigned from `@@ERROR` (or
//! `ERROR_NUMBER()`, or a direct copy of such a variable) and later compared
//! with literals by `=`, `<>`, `IN` or `BETWEEN`. One assignment hop only;
//! anything beyond that is left for manual review.

use std::collections::HashSet;

use crate::parser::{LiteralKind, NodeId, NodeKind, SyntaxTree};

/// A literal error code found in a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledErrorCode {
    pub code: i64,
    /// The variable or pseudo-value compared against the code.
    pub via: String,
    pub line: usize,
}

/// Outcome of examining one operand of an error-code comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCodeCheck {
    Code { code: i64, via: String },
    /// The compared value is not an integer literal.
    Indeterminate { text: String, via: String },
}

#[derive(Debug, Default)]
pub struct ErrorCodeTracker {
    /// Upper-cased variable names holding an error code.
    tracked: HashSet<String>,
}

impl ErrorCodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables do not outlive their batch.
    pub fn begin_batch(&mut self) {
        self.tracked.clear();
    }

    pub fn is_tracked(&self, variable: &str) -> bool {
        self.tracked.contains(&variable.to_ascii_uppercase())
    }

    /// Records `variable = value`. Any other assignment stops tracking it.
    pub fn note_assignment(&mut self, tree: &SyntaxTree, variable: &str, value: NodeId) {
        let key = variable.to_ascii_uppercase();
        let from_error = is_error_source(tree, value)
            || matches!(tree.kind(value), NodeKind::Variable { name } if self.is_tracked(name));
        if from_error {
            self.tracked.insert(key);
        } else {
            self.tracked.remove(&key);
        }
    }

    /// Compound assignments (`+=` and friends) stop tracking the variable.
    pub fn forget(&mut self, variable: &str) {
        self.tracked.remove(&variable.to_ascii_uppercase());
    }

    /// Name of the error-code value `id` stands for, if any.
    fn subject(&self, tree: &SyntaxTree, id: NodeId) -> Option<String> {
        match tree.kind(id) {
            NodeKind::Variable { name } if self.is_tracked(name) => Some(name.clone()),
            _ if is_error_source(tree, id) => Some(crate::util::collapse_whitespace(&tree.text(id))),
            _ => None,
        }
    }

    /// Examines a predicate node. Returns nothing when the predicate does not
    /// test an error code.
    pub fn examine(&self, tree: &SyntaxTree, id: NodeId) -> Vec<ErrorCodeCheck> {
        let children = tree.children(id);
        match tree.kind(id) {
            NodeKind::Comparison { op } if matches!(op.as_str(), "=" | "<>" | "!=") => {
                let (Some(left), Some(right)) = (children.first(), children.get(1)) else {
                    return Vec::new();
                };
                if let Some(via) = self.subject(tree, *left) {
                    self.check_values(tree, &[*right], &via)
                } else if let Some(via) = self.subject(tree, *right) {
                    self.check_values(tree, &[*left], &via)
                } else {
                    Vec::new()
                }
            }
            NodeKind::InList { .. } | NodeKind::Between { .. } => match children.split_first() {
                Some((first, values)) => match self.subject(tree, *first) {
                    Some(via) => self.check_values(tree, values, &via),
                    None => Vec::new(),
                },
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn check_values(&self, tree: &SyntaxTree, values: &[NodeId], via: &str) -> Vec<ErrorCodeCheck> {
        let mut checks = Vec::new();
        for value in values {
            match integer_literal(tree, *value) {
                // 0 means "no error", not a handled code.
                Some(0) => {}
                Some(code) => checks.push(ErrorCodeCheck::Code {
                    code,
                    via: via.to_string(),
                }),
                None => checks.push(ErrorCodeCheck::Indeterminate {
                    text: crate::util::collapse_whitespace(&tree.text(*value)),
                    via: via.to_string(),
                }),
            }
        }
        checks
    }
}

/// `@@ERROR` or `ERROR_NUMBER()`.
pub fn is_error_source(tree: &SyntaxTree, id: NodeId) -> bool {
    match tree.kind(id) {
        NodeKind::SystemVariable { name } => name.eq_ignore_ascii_case("@@ERROR"),
        NodeKind::FunctionCall { name } => name.eq_ignore_ascii_case("ERROR_NUMBER"),
        _ => false,
    }
}

/// Integer value of a (possibly negated) numeric literal.
fn integer_literal(tree: &SyntaxTree, id: NodeId) -> Option<i64> {
    match tree.kind(id) {
        NodeKind::Literal {
            kind: LiteralKind::Number,
        } => tree.text(id).trim().parse().ok(),
        NodeKind::UnaryOp { op } if op == "-" || op == "+" => {
            let value = integer_literal(tree, tree.child(id, 0)?)?;
            Some(if op == "-" { -value } else { value })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_batch;

    /// Runs the tracker over a batch in document order.
    fn checks(sql: &str) -> Vec<ErrorCodeCheck> {
        let tree = parse_batch(sql);
        let mut tracker = ErrorCodeTracker::new();
        let mut out = Vec::new();
        for id in tree.descendants(tree.root()) {
            match tree.kind(id) {
                NodeKind::VariableAssignment { variable, operator } => match tree.child(id, 0) {
                    Some(value) if operator == "=" => tracker.note_assignment(&tree, variable, value),
                    _ => tracker.forget(variable),
                },
                _ => out.extend(tracker.examine(&tree, id)),
            }
        }
        out
    }

    fn code(code: i64, via: &str) -> ErrorCodeCheck {
        ErrorCodeCheck::Code {
            code,
            via: via.to_string(),
        }
    }

    #[test]
    fn test_variable_assigned_from_error() {
        let found = checks("DECLARE @x INT; SET @x = @@ERROR; IF @x = 2627 PRINT 'dup'");
        assert_eq!(found, vec![code(2627, "@x")]);
    }

    #[test]
    fn test_in_list_between_and_zero() {
        let found = checks("SET @e = @@ERROR IF @e IN (0, 547, -1) OR @e BETWEEN 2601 AND 2627 RETURN");
        assert_eq!(
            found,
            vec![
                code(547, "@e"),
                code(-1, "@e"),
                code(2601, "@e"),
                code(2627, "@e")
            ]
        );
    }

    #[test]
    fn test_direct_pseudo_value_and_copy() {
        let found = checks("IF ERROR_NUMBER() <> 1205 SET @a = @@ERROR SET @b = @a IF 50000 = @b RETURN");
        assert_eq!(found, vec![code(1205, "ERROR_NUMBER()"), code(50000, "@b")]);
    }

    #[test]
    fn test_non_literal_is_indeterminate() {
        let found = checks("SET @x = @@ERROR IF @x = @expected RETURN");
        assert_eq!(
            found,
            vec![ErrorCodeCheck::Indeterminate {
                text: "@expected".to_string(),
                via: "@x".to_string()
            }]
        );
    }

    #[test]
    fn test_reassignment_stops_tracking() {
        let found = checks("SET @x = @@ERROR SET @x = 5 IF @x = 2627 RETURN");
        assert!(found.is_empty());
    }

    #[test]
    fn test_compound_assignment_stops_tracking() {
        let found = checks("DECLARE @x INT; SET @x = @@ERROR; SET @x += 1; IF @x = 2627 PRINT 'dup'");
        assert!(found.is_empty());
    }
}
